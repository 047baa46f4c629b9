//! On-chain reads the aggregator depends on.
//!
//! [`ChainReader`] is the seam between the aggregation rules and the node;
//! [`RpcChain`] implements it over [`RpcClient`].

use crate::abi::{Transfer, getPairCall, getReservesCall, nameCall, token0Call, token1Call};
use crate::holders::{TokenHolder, balances_from_transfers, decode_transfers};
use crate::rpc::RpcClient;
use alloy::sol_types::SolEvent;
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// Constituent tokens of something that answered the pair calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairTokens {
    pub token0: Address,
    pub token1: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairReserves {
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
}

impl PairReserves {
    /// Reserves ordered as `(weth side, other side)`
    pub fn oriented_to(&self, weth: Address) -> (U256, U256) {
        if self.token0 == weth {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        }
    }
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Every address holding a non-zero balance of `token`, largest first
    async fn token_holders(&self, token: Address) -> Result<Vec<TokenHolder>>;

    /// Factory lookup; `None` when no pool exists for the two tokens
    async fn pair_address(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>>;

    async fn token_name(&self, token: Address) -> Result<String>;

    /// Sender of the transaction that emitted the token's first `Transfer`
    async fn creator_address(&self, token: Address) -> Result<Option<Address>>;

    async fn pair_reserves(&self, pair: Address) -> Result<PairReserves>;

    async fn is_contract(&self, address: Address) -> Result<bool>;

    /// `Ok(None)` means the contract does not behave like a pair. Transport
    /// failures are errors, never `None`.
    async fn read_pair_tokens(&self, address: Address) -> Result<Option<PairTokens>>;
}

pub struct RpcChain {
    client: RpcClient,
    log_batch_size: u64,
    /// Deployment block per token, searched for at most once
    deployments: Mutex<HashMap<Address, Arc<OnceCell<u64>>>>,
}

impl RpcChain {
    pub fn new(client: RpcClient, log_batch_size: u64) -> Self {
        Self {
            client,
            log_batch_size: log_batch_size.max(1),
            deployments: Mutex::default(),
        }
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Binary search for the first block where `address` has code
    pub async fn find_deployment_block(&self, address: Address, latest_block: u64) -> Result<u64> {
        debug!("Searching for deployment block of contract {:?}", address);

        let code = self.client.get_code(address, Some(latest_block)).await?;
        if code.is_empty() {
            anyhow::bail!("Address {:?} is not a deployed contract", address);
        }

        let mut left = 0u64;
        let mut right = latest_block;

        while left < right {
            let mid = left + (right - left) / 2;
            let code = self.client.get_code(address, Some(mid)).await?;

            if code.is_empty() {
                left = mid + 1;
            } else {
                right = mid;
            }
        }

        info!("Contract {:?} deployed at block {}", address, left);
        Ok(left)
    }

    /// Deployment block of `token`. Concurrent callers share one search and
    /// later calls reuse its result.
    pub async fn deployment_block(&self, token: Address) -> Result<u64> {
        let cell = {
            let mut deployments = self.deployments.lock().await;
            deployments.entry(token).or_default().clone()
        };

        let block = cell
            .get_or_try_init(|| async {
                let latest_block = self.client.get_latest_block().await?;
                self.find_deployment_block(token, latest_block).await
            })
            .await?;
        Ok(*block)
    }

    /// Walk `[from, to]` in windows of `log_batch_size`, stopping early once
    /// `stop_after_first` is set and a window produced logs.
    async fn transfer_logs(
        &self,
        token: Address,
        from_block: u64,
        to_block: u64,
        stop_after_first: bool,
    ) -> Result<Vec<alloy::rpc::types::Log>> {
        let mut logs = Vec::new();
        let mut window_start = from_block;

        while window_start <= to_block {
            let window_end = window_start
                .saturating_add(self.log_batch_size - 1)
                .min(to_block);

            let batch = self
                .client
                .get_logs(window_start, window_end, token, Transfer::SIGNATURE_HASH)
                .await
                .with_context(|| {
                    format!("Failed to fetch Transfer logs for blocks {window_start}-{window_end}")
                })?;

            debug!(
                "Fetched {} Transfer logs for blocks {} to {}",
                batch.len(),
                window_start,
                window_end
            );
            logs.extend(batch);

            if stop_after_first && !logs.is_empty() {
                break;
            }
            window_start = window_end + 1;
        }

        Ok(logs)
    }
}

#[async_trait]
impl ChainReader for RpcChain {
    async fn token_holders(&self, token: Address) -> Result<Vec<TokenHolder>> {
        let deployment_block = self.deployment_block(token).await?;
        let latest_block = self.client.get_latest_block().await?;

        let logs = self
            .transfer_logs(token, deployment_block, latest_block, false)
            .await?;
        let transfers = decode_transfers(&logs);
        let holders = balances_from_transfers(&transfers);

        info!(
            "Token {:?}: {} transfers, {} holders",
            token,
            transfers.len(),
            holders.len()
        );
        Ok(holders)
    }

    async fn pair_address(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>> {
        let pair = self
            .client
            .call_contract(
                factory,
                getPairCall {
                    tokenA: token_a,
                    tokenB: token_b,
                },
            )
            .await?;

        Ok((pair != Address::ZERO).then_some(pair))
    }

    async fn token_name(&self, token: Address) -> Result<String> {
        self.client
            .call_contract(token, nameCall {})
            .await
            .with_context(|| format!("Failed to read name() of {token:?}"))
    }

    async fn creator_address(&self, token: Address) -> Result<Option<Address>> {
        let deployment_block = self.deployment_block(token).await?;
        let latest_block = self.client.get_latest_block().await?;

        let logs = self
            .transfer_logs(token, deployment_block, latest_block, true)
            .await?;

        let Some(first_log) = logs.first() else {
            debug!("No Transfer logs found for {:?}", token);
            return Ok(None);
        };

        let tx_hash = first_log
            .transaction_hash
            .context("First Transfer log has no transaction hash")?;

        self.client.get_transaction_sender(tx_hash).await
    }

    async fn pair_reserves(&self, pair: Address) -> Result<PairReserves> {
        let (token0, token1, reserves) = tokio::try_join!(
            self.client.call_contract(pair, token0Call {}),
            self.client.call_contract(pair, token1Call {}),
            self.client.call_contract(pair, getReservesCall {}),
        )
        .with_context(|| format!("Failed to read reserves of pair {pair:?}"))?;

        Ok(PairReserves {
            token0,
            token1,
            reserve0: U256::from(reserves.reserve0),
            reserve1: U256::from(reserves.reserve1),
        })
    }

    async fn is_contract(&self, address: Address) -> Result<bool> {
        let code = self.client.get_code(address, None).await?;
        Ok(!code.is_empty())
    }

    async fn read_pair_tokens(&self, address: Address) -> Result<Option<PairTokens>> {
        let (token0, token1, reserves) = tokio::try_join!(
            self.client.try_call_contract(address, token0Call {}),
            self.client.try_call_contract(address, token1Call {}),
            self.client.try_call_contract(address, getReservesCall {}),
        )?;

        Ok(match (token0, token1, reserves) {
            (Some(token0), Some(token1), Some(_)) => Some(PairTokens { token0, token1 }),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_node::{
        Reply, TestNode, call_selector, parse_quantity, quantity, rate_limited, reverting,
    };
    use alloy::sol_types::SolCall;
    use alloy_primitives::{B256, hex};
    use serde_json::{Value, json};

    const TOKEN: Address = Address::repeat_byte(0x70);
    const PAIR: Address = Address::repeat_byte(0x52);
    const WETH: Address = Address::repeat_byte(0xee);
    const ALICE: Address = Address::repeat_byte(0xaa);
    const BOB: Address = Address::repeat_byte(0xbb);
    const DEPLOYED_AT: u64 = 37;
    const LATEST: u64 = 100;

    fn word(value: u64) -> B256 {
        B256::from(U256::from(value).to_be_bytes::<32>())
    }

    fn block_of(log: &Value) -> u64 {
        parse_quantity(&log["blockNumber"]).unwrap_or_default()
    }

    fn transfer_log(block: u64, from: Address, to: Address, value: u64) -> Value {
        json!({
            "address": TOKEN,
            "topics": [Transfer::SIGNATURE_HASH, from.into_word(), to.into_word()],
            "data": word(value),
            "blockHash": B256::repeat_byte(0x01),
            "blockNumber": quantity(block),
            "transactionHash": B256::with_last_byte(block as u8),
            "transactionIndex": "0x0",
            "logIndex": "0x0",
            "removed": false,
        })
    }

    /// Mint to Alice at block 40, Alice pays Bob at block 75
    fn history() -> Vec<Value> {
        vec![
            transfer_log(40, Address::ZERO, ALICE, 100),
            transfer_log(75, ALICE, BOB, 40),
        ]
    }

    /// A token deployed at `DEPLOYED_AT` with a short Transfer history
    fn deployed_token(method: &str, params: &Value) -> Reply {
        match method {
            "eth_blockNumber" => Ok(quantity(LATEST)),
            "eth_getCode" => {
                let block = parse_quantity(&params[1]).unwrap_or(LATEST);
                Ok(json!(if block >= DEPLOYED_AT { "0x6080" } else { "0x" }))
            }
            "eth_getLogs" => {
                let from = parse_quantity(&params[0]["fromBlock"]).unwrap_or(0);
                let to = parse_quantity(&params[0]["toBlock"]).unwrap_or(LATEST);
                let logs = history()
                    .into_iter()
                    .filter(|log| (from..=to).contains(&block_of(log)))
                    .collect();
                Ok(Value::Array(logs))
            }
            "eth_getTransactionByHash" => Ok(Value::Null),
            _ => Err((-32601, format!("method {method} not found"))),
        }
    }

    fn no_code(method: &str, _params: &Value) -> Reply {
        match method {
            "eth_blockNumber" => Ok(quantity(LATEST)),
            "eth_getCode" => Ok(json!("0x")),
            _ => Err((-32601, format!("method {method} not found"))),
        }
    }

    fn abi_words(words: &[B256]) -> Value {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.0).collect();
        json!(format!("0x{}", hex::encode(bytes)))
    }

    fn selector<C: SolCall>() -> String {
        format!("0x{}", hex::encode(C::SELECTOR))
    }

    /// A UniswapV2-style pair of WETH and TOKEN
    fn weth_pair(method: &str, params: &Value) -> Reply {
        if method != "eth_call" {
            return Err((-32601, format!("method {method} not found")));
        }

        let called = call_selector(params);
        if called == selector::<token0Call>() {
            Ok(abi_words(&[WETH.into_word()]))
        } else if called == selector::<token1Call>() {
            Ok(abi_words(&[TOKEN.into_word()]))
        } else if called == selector::<getReservesCall>() {
            Ok(abi_words(&[word(10), word(20), B256::ZERO]))
        } else if called == selector::<getPairCall>() {
            Ok(abi_words(&[B256::ZERO]))
        } else {
            Err((3, "execution reverted".to_string()))
        }
    }

    fn empty_returns(_method: &str, _params: &Value) -> Reply {
        Ok(json!("0x"))
    }

    #[tokio::test]
    async fn test_find_deployment_block() {
        let node = TestNode::start(deployed_token).await;
        let chain = RpcChain::new(node.client(0), 10);

        let block = chain.find_deployment_block(TOKEN, LATEST).await.unwrap();
        assert_eq!(block, DEPLOYED_AT);
    }

    #[tokio::test]
    async fn test_find_deployment_block_needs_code() {
        let node = TestNode::start(no_code).await;
        let chain = RpcChain::new(node.client(0), 10);

        assert!(chain.find_deployment_block(TOKEN, LATEST).await.is_err());
        assert_eq!(node.calls("eth_getCode").len(), 1);
    }

    #[tokio::test]
    async fn test_token_holders_walks_every_window() {
        let node = TestNode::start(deployed_token).await;
        let chain = RpcChain::new(node.client(0), 10);

        let holders = chain.token_holders(TOKEN).await.unwrap();
        assert_eq!(
            holders,
            vec![
                TokenHolder {
                    address: ALICE,
                    balance: U256::from(60)
                },
                TokenHolder {
                    address: BOB,
                    balance: U256::from(40)
                },
            ]
        );

        // 37-46, 47-56, ..., 87-96, 97-100
        let windows = node.calls("eth_getLogs");
        assert_eq!(windows.len(), 7);
        let (first, last) = (&windows[0][0], &windows[6][0]);
        assert_eq!(parse_quantity(&first["fromBlock"]), Some(DEPLOYED_AT));
        assert_eq!(parse_quantity(&last["toBlock"]), Some(LATEST));
    }

    #[tokio::test]
    async fn test_transfer_logs_stops_at_first_window_with_logs() {
        let node = TestNode::start(deployed_token).await;
        let chain = RpcChain::new(node.client(0), 10);

        let logs = chain.transfer_logs(TOKEN, 47, LATEST, true).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number, Some(75));
        // 47-56, 57-66, 67-76
        assert_eq!(node.calls("eth_getLogs").len(), 3);
    }

    #[tokio::test]
    async fn test_deployment_block_searched_once() {
        let node = TestNode::start(deployed_token).await;
        let chain = RpcChain::new(node.client(0), 10);

        let (holders, creator) =
            tokio::join!(chain.token_holders(TOKEN), chain.creator_address(TOKEN));
        assert_eq!(holders.unwrap().len(), 2);
        assert_eq!(creator.unwrap(), None);
        assert_eq!(chain.deployment_block(TOKEN).await.unwrap(), DEPLOYED_AT);
        let shared = node.calls("eth_getCode").len();

        let single_node = TestNode::start(deployed_token).await;
        let single = RpcChain::new(single_node.client(0), 10);
        single.find_deployment_block(TOKEN, LATEST).await.unwrap();
        assert_eq!(shared, single_node.calls("eth_getCode").len());
    }

    #[tokio::test]
    async fn test_read_pair_tokens_of_a_pair() {
        let node = TestNode::start(weth_pair).await;
        let chain = RpcChain::new(node.client(0), 10);

        let tokens = chain.read_pair_tokens(PAIR).await.unwrap();
        assert_eq!(
            tokens,
            Some(PairTokens {
                token0: WETH,
                token1: TOKEN
            })
        );

        let reserves = chain.pair_reserves(PAIR).await.unwrap();
        assert_eq!(reserves.oriented_to(WETH), (U256::from(10), U256::from(20)));
    }

    #[tokio::test]
    async fn test_read_pair_tokens_on_reverting_contract_is_not_a_pair() {
        let node = TestNode::start(reverting).await;
        let chain = RpcChain::new(node.client(1), 10);

        assert_eq!(chain.read_pair_tokens(PAIR).await.unwrap(), None);
        // reverts are final
        assert_eq!(node.calls("eth_call").len(), 3);
    }

    #[tokio::test]
    async fn test_read_pair_tokens_with_undecodable_returns_is_not_a_pair() {
        let node = TestNode::start(empty_returns).await;
        let chain = RpcChain::new(node.client(0), 10);

        assert_eq!(chain.read_pair_tokens(PAIR).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rate_limited_node_is_an_error_not_a_verdict() {
        let node = TestNode::start(rate_limited).await;
        let chain = RpcChain::new(node.client(1), 10);

        assert!(chain.read_pair_tokens(PAIR).await.is_err());

        let lookup = chain.pair_address(WETH, TOKEN, WETH).await;
        assert!(lookup.is_err());
    }

    #[tokio::test]
    async fn test_pair_address_zero_means_no_pool() {
        let node = TestNode::start(weth_pair).await;
        let chain = RpcChain::new(node.client(0), 10);

        let pair = chain.pair_address(WETH, TOKEN, WETH).await.unwrap();
        assert_eq!(pair, None);
    }

    #[test]
    fn test_oriented_to_weth_first() {
        let weth = Address::repeat_byte(0xee);
        let token = Address::repeat_byte(0x11);

        let reserves = PairReserves {
            token0: weth,
            token1: token,
            reserve0: U256::from(10),
            reserve1: U256::from(20),
        };
        assert_eq!(reserves.oriented_to(weth), (U256::from(10), U256::from(20)));
    }

    #[test]
    fn test_oriented_to_weth_second() {
        let weth = Address::repeat_byte(0xee);
        let token = Address::repeat_byte(0x11);

        let reserves = PairReserves {
            token0: token,
            token1: weth,
            reserve0: U256::from(10),
            reserve1: U256::from(20),
        };
        assert_eq!(reserves.oriented_to(weth), (U256::from(20), U256::from(10)));
    }
}
