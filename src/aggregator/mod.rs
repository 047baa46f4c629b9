pub mod error;
pub mod models;

pub use error::AggregateError;
pub use models::{HolderKind, ReportOutcome, TokenBalance, TokenReport, ValueLink};

use crate::chain::{ChainReader, PairTokens};
use crate::holders::TokenHolder;
use crate::network::NetworkConstants;
use crate::nicknames::NicknameBook;
use crate::pricing::{price_ratio, to_decimal, total_value_locked};
use alloy_primitives::Address;
use anyhow::Result;
use futures::future::join_all;
use std::time::Instant;
use tracing::{debug, error, info, warn};

enum Classification {
    Wallet {
        nickname: Option<String>,
    },
    Pair {
        other_token: Address,
        other_name: String,
        link: ValueLink,
    },
    Unknown,
}

struct ClassifiedHolder {
    balance: TokenBalance,
    link: Option<ValueLink>,
    failed: bool,
}

pub struct TokenAggregator<C> {
    chain: C,
    constants: NetworkConstants,
    nicknames: NicknameBook,
}

impl<C: ChainReader> TokenAggregator<C> {
    pub fn new(chain: C, constants: NetworkConstants, nicknames: NicknameBook) -> Self {
        Self {
            chain,
            constants,
            nicknames,
        }
    }

    /// Never fails: any error is logged and reported as an empty outcome
    pub async fn fetch_token_report(&self, token: Address) -> ReportOutcome {
        match self.aggregate(token).await {
            Ok(report) => ReportOutcome::Report(Box::new(report)),
            Err(e) => {
                error!("Error fetching blockchain data for {:?}: {}", token, e);
                ReportOutcome::Empty {}
            }
        }
    }

    pub async fn aggregate(&self, token: Address) -> Result<TokenReport, AggregateError> {
        let start = Instant::now();
        info!("Aggregating token {:?}", token);

        let (holders, pair_address, content, creator_address) = tokio::try_join!(
            self.holders(token),
            self.weth_pair(token),
            self.token_name(token),
            self.creator_address(token),
        )?;

        let pool = self.chain.pair_reserves(pair_address).await?;
        let (weth_reserve, token_reserve) = pool.oriented_to(self.constants.weth);
        let reserve0 = to_decimal(weth_reserve);
        let reserve1 = to_decimal(token_reserve);
        let current_price = price_ratio(reserve0, reserve1);

        debug!(
            "Pool {:?}: reserve0={} reserve1={} price={:?}",
            pair_address, reserve0, reserve1, current_price
        );

        let holders: Vec<TokenHolder> = holders
            .into_iter()
            .filter(|holder| holder.address != pair_address)
            .collect();

        let classified = join_all(
            holders
                .iter()
                .map(|holder| self.classify_holder(token, current_price, holder)),
        )
        .await;

        let mut balances = Vec::with_capacity(classified.len());
        let mut valuelinks = Vec::new();
        let mut failed_holders = Vec::new();

        for holder in classified {
            if holder.failed {
                failed_holders.push(holder.balance.owner_address);
            }
            if let Some(link) = holder.link {
                valuelinks.push(link);
            }
            balances.push(holder.balance);
        }

        balances.sort_by(|a, b| b.balance.total_cmp(&a.balance));

        info!(
            "Token {:?} ({}): {} holders, {} value links, {} failed, took {:?}",
            token,
            content,
            balances.len(),
            valuelinks.len(),
            failed_holders.len(),
            start.elapsed()
        );

        Ok(TokenReport {
            token_address: token,
            balances,
            reserve0,
            reserve1,
            current_price,
            valuelinks,
            content,
            creator_address,
            failed_holders,
        })
    }

    async fn weth_pair(&self, token: Address) -> Result<Address, AggregateError> {
        self.chain
            .pair_address(self.constants.uniswap_factory, token, self.constants.weth)
            .await?
            .ok_or(AggregateError::PairNotFound(token))
    }

    async fn holders(&self, token: Address) -> Result<Vec<TokenHolder>, AggregateError> {
        Ok(self.chain.token_holders(token).await?)
    }

    async fn token_name(&self, token: Address) -> Result<String, AggregateError> {
        Ok(self.chain.token_name(token).await?)
    }

    /// Never an error: a failed lookup only leaves the creator empty
    async fn creator_address(&self, token: Address) -> Result<Option<Address>, AggregateError> {
        match self.chain.creator_address(token).await {
            Ok(creator) => Ok(creator),
            Err(e) => {
                warn!("Error fetching creator address for {:?}: {:#}", token, e);
                Ok(None)
            }
        }
    }

    /// WETH price of `token` from its own WETH pool, if it has one
    async fn weth_price(&self, token: Address) -> Result<Option<f64>> {
        if token == self.constants.weth {
            return Ok(Some(1.0));
        }

        let Some(pair) = self
            .chain
            .pair_address(self.constants.uniswap_factory, token, self.constants.weth)
            .await?
        else {
            debug!("Token {:?} has no WETH pool, price unknown", token);
            return Ok(None);
        };

        let reserves = self.chain.pair_reserves(pair).await?;
        let (weth_reserve, token_reserve) = reserves.oriented_to(self.constants.weth);
        Ok(price_ratio(to_decimal(weth_reserve), to_decimal(token_reserve)))
    }

    /// Price of one side of a held pair: our token reuses the report price,
    /// anything else goes through its own WETH pool
    async fn side_price(
        &self,
        side: Address,
        token: Address,
        token_price: Option<f64>,
    ) -> Result<Option<f64>> {
        if side == token {
            Ok(token_price)
        } else {
            self.weth_price(side).await
        }
    }

    async fn classify_holder(
        &self,
        token: Address,
        token_price: Option<f64>,
        holder: &TokenHolder,
    ) -> ClassifiedHolder {
        let mut balance = TokenBalance {
            owner_address: holder.address,
            balance: to_decimal(holder.balance),
            kind: HolderKind::Wallet,
            nickname: None,
            additional_token_name: None,
            additional_token_address: None,
        };

        match self.classify(token, token_price, holder.address).await {
            Ok(Classification::Wallet { nickname }) => {
                balance.nickname = nickname;
                ClassifiedHolder {
                    balance,
                    link: None,
                    failed: false,
                }
            }
            Ok(Classification::Pair {
                other_token,
                other_name,
                link,
            }) => {
                balance.kind = HolderKind::Pair;
                balance.additional_token_name = Some(other_name);
                balance.additional_token_address = Some(other_token);
                ClassifiedHolder {
                    balance,
                    link: Some(link),
                    failed: false,
                }
            }
            Ok(Classification::Unknown) => {
                balance.kind = HolderKind::Unknown;
                ClassifiedHolder {
                    balance,
                    link: None,
                    failed: false,
                }
            }
            Err(e) => {
                warn!("Failed to classify holder {:?}: {:#}", holder.address, e);
                balance.kind = HolderKind::Unknown;
                ClassifiedHolder {
                    balance,
                    link: None,
                    failed: true,
                }
            }
        }
    }

    async fn classify(
        &self,
        token: Address,
        token_price: Option<f64>,
        holder: Address,
    ) -> Result<Classification> {
        if !self.chain.is_contract(holder).await? {
            let nickname = self.nicknames.lookup(&holder).map(str::to_string);
            return Ok(Classification::Wallet { nickname });
        }

        let Some(pair_tokens) = self.chain.read_pair_tokens(holder).await? else {
            return Ok(Classification::Unknown);
        };

        let PairTokens { token0, token1 } = pair_tokens;
        let (token0_content, token1_content, reserves) = tokio::try_join!(
            self.chain.token_name(token0),
            self.chain.token_name(token1),
            self.chain.pair_reserves(holder),
        )?;

        let (current_price_token0, current_price_token1) = tokio::try_join!(
            self.side_price(token0, token, token_price),
            self.side_price(token1, token, token_price),
        )?;

        let reserve0 = to_decimal(reserves.reserve0);
        let reserve1 = to_decimal(reserves.reserve1);
        let tvl = match (current_price_token0, current_price_token1) {
            (Some(price0), Some(price1)) => {
                Some(total_value_locked(price0, reserve0, price1, reserve1))
            }
            _ => None,
        };

        let (other_token, other_name) = if token0 == token {
            (token1, token1_content.clone())
        } else {
            (token0, token0_content.clone())
        };

        Ok(Classification::Pair {
            other_token,
            other_name,
            link: ValueLink {
                pair_address: holder,
                token0_content,
                token1_content,
                token0,
                token1,
                reserve0,
                reserve1,
                current_price_token0,
                current_price_token1,
                tvl,
            },
        })
    }
}
