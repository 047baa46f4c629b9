use crate::config::RpcConfig;
use alloy::network::TransactionResponse;
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log, TransactionRequest};
use alloy::sol_types::SolCall;
use alloy::transports::TransportError;
use alloy_primitives::{Address, B256, Bytes};
use anyhow::Result;
use regex::Regex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

type AlloyFullProvider = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

/// Result of an `eth_call` the node answered. `Reverted` carries the node's
/// error message and is never retried.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    Returned(Bytes),
    Reverted(String),
}

/// Error code geth and its forks use for `execution reverted`
const REVERT_ERROR_CODE: i64 = 3;

fn is_revert_response(code: i64, message: &str) -> bool {
    code == REVERT_ERROR_CODE || message.to_ascii_lowercase().contains("revert")
}

fn is_revert(error: &TransportError) -> bool {
    error
        .as_error_resp()
        .is_some_and(|payload| is_revert_response(payload.code, &payload.message))
}

#[derive(Clone)]
pub struct RpcClient {
    providers: Vec<AlloyFullProvider>,
    urls: Vec<String>,
    current_provider: Arc<AtomicUsize>,
    max_retries: usize,
    request_timeout: Duration,
}

impl RpcClient {
    pub fn new(config: &RpcConfig) -> Result<Self> {
        if config.json_rpc_urls.is_empty() {
            return Err(anyhow::anyhow!("At least one RPC URL must be provided"));
        }

        let mut providers = Vec::new();
        for url in &config.json_rpc_urls {
            let parsed_url = url
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", url))?;
            let provider: AlloyFullProvider = ProviderBuilder::new().connect_http(parsed_url);
            providers.push(provider);
        }

        Ok(RpcClient {
            providers,
            urls: config.json_rpc_urls.clone(),
            current_provider: Arc::new(AtomicUsize::new(0)),
            max_retries: config.max_retries,
            request_timeout: config.request_timeout,
        })
    }

    fn get_provider(&self) -> &AlloyFullProvider {
        let index = self.current_provider.load(Ordering::Relaxed) % self.providers.len();
        &self.providers[index]
    }

    pub fn get_current_url(&self) -> &str {
        let index = self.current_provider.load(Ordering::Relaxed) % self.urls.len();
        &self.urls[index]
    }

    pub fn rotate_provider(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.providers.len();
        self.current_provider.store(next, Ordering::Relaxed);

        if self.providers.len() > 1 {
            debug!("Rotating to RPC provider #{}", next);
        }
    }

    fn get_retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries)
    }

    fn handle_error(&self, error_str: &str) {
        let current_url = self.get_current_url();
        warn!(
            "RPC error on {}: {}, rotating provider",
            current_url, error_str
        );
        self.rotate_provider();
    }

    fn handle_timeout(&self) -> anyhow::Error {
        let current_url = self.get_current_url();
        warn!(
            "Request timeout after {} seconds on {}, rotating provider",
            self.request_timeout.as_secs(),
            current_url
        );
        self.rotate_provider();
        anyhow::anyhow!(
            "Request timeout after {} seconds",
            self.request_timeout.as_secs()
        )
    }

    pub async fn get_chain_id(&self) -> Result<u64> {
        let client = self.clone();
        Retry::spawn(self.get_retry_strategy(), move || {
            let client = client.clone();
            async move {
                let provider = client.get_provider();
                match timeout(client.request_timeout, provider.get_chain_id()).await {
                    Ok(Ok(chain_id)) => Ok(chain_id),
                    Ok(Err(e)) => {
                        client.handle_error(&e.to_string());
                        Err(anyhow::anyhow!("{}", e))
                    }
                    Err(_) => Err(client.handle_timeout()),
                }
            }
        })
        .await
    }

    pub async fn get_latest_block(&self) -> Result<u64> {
        let client = self.clone();
        Retry::spawn(self.get_retry_strategy(), move || {
            let client = client.clone();
            async move {
                let provider = client.get_provider();
                match timeout(client.request_timeout, provider.get_block_number()).await {
                    Ok(Ok(block_number)) => Ok(block_number),
                    Ok(Err(e)) => {
                        let error_str = e.to_string();
                        client.handle_error(&error_str);
                        Err(anyhow::anyhow!("{}", e))
                    }
                    Err(_) => Err(client.handle_timeout()),
                }
            }
        })
        .await
    }

    /// Contract code at `block_number`, or at the latest block when `None`
    pub async fn get_code(&self, address: Address, block_number: Option<u64>) -> Result<Bytes> {
        let client = self.clone();
        Retry::spawn(self.get_retry_strategy(), move || {
            let client = client.clone();
            async move {
                let provider = client.get_provider();
                let block = block_number
                    .map(BlockNumberOrTag::Number)
                    .unwrap_or(BlockNumberOrTag::Latest);
                let future = provider.get_code_at(address).block_id(block.into());

                match timeout(client.request_timeout, future).await {
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(e)) => {
                        let error_str = e.to_string();
                        client.handle_error(&error_str);
                        Err(anyhow::anyhow!("{}", e))
                    }
                    Err(_) => Err(client.handle_timeout()),
                }
            }
        })
        .await
    }

    pub async fn get_transaction_sender(&self, tx_hash: B256) -> Result<Option<Address>> {
        let client = self.clone();
        Retry::spawn(self.get_retry_strategy(), move || {
            let client = client.clone();
            async move {
                let provider = client.get_provider();
                match timeout(
                    client.request_timeout,
                    provider.get_transaction_by_hash(tx_hash),
                )
                .await
                {
                    Ok(Ok(tx)) => Ok(tx.map(|tx| TransactionResponse::from(&tx))),
                    Ok(Err(e)) => {
                        client.handle_error(&e.to_string());
                        Err(anyhow::anyhow!("{}", e))
                    }
                    Err(_) => Err(client.handle_timeout()),
                }
            }
        })
        .await
    }

    /// `eth_call` against the latest block. A revert is returned as
    /// [`CallOutcome::Reverted`] straight away. Every other error response
    /// (rate limits, missing state) goes through rotation and retry like a
    /// transport failure.
    pub async fn call_raw(&self, to: Address, data: Bytes) -> Result<CallOutcome> {
        let client = self.clone();
        Retry::spawn(self.get_retry_strategy(), move || {
            let client = client.clone();
            let data = data.clone();
            async move {
                let provider = client.get_provider();
                let tx = TransactionRequest::default().to(to).input(data.into());

                match timeout(client.request_timeout, provider.call(tx)).await {
                    Ok(Ok(bytes)) => Ok(CallOutcome::Returned(bytes)),
                    Ok(Err(e)) if is_revert(&e) => {
                        debug!("eth_call to {:?} reverted: {}", to, e);
                        Ok(CallOutcome::Reverted(e.to_string()))
                    }
                    Ok(Err(e)) => {
                        client.handle_error(&e.to_string());
                        Err(anyhow::anyhow!("{}", e))
                    }
                    Err(_) => Err(client.handle_timeout()),
                }
            }
        })
        .await
    }

    /// Call a view function, treating a revert or undecodable answer as an error
    pub async fn call_contract<C: SolCall + Send>(
        &self,
        address: Address,
        call: C,
    ) -> Result<C::Return> {
        match self.call_raw(address, call.abi_encode().into()).await? {
            CallOutcome::Returned(bytes) => C::abi_decode_returns(&bytes).map_err(|e| {
                anyhow::anyhow!("Failed to decode {} from {:?}: {}", C::SIGNATURE, address, e)
            }),
            CallOutcome::Reverted(reason) => Err(anyhow::anyhow!(
                "Call {} on {:?} reverted: {}",
                C::SIGNATURE,
                address,
                reason
            )),
        }
    }

    /// Call a view function that the target may not implement. Returns `None`
    /// when the node rejects the call or the return data does not decode;
    /// transport failures are still errors.
    pub async fn try_call_contract<C: SolCall + Send>(
        &self,
        address: Address,
        call: C,
    ) -> Result<Option<C::Return>> {
        match self.call_raw(address, call.abi_encode().into()).await? {
            CallOutcome::Returned(bytes) => Ok(C::abi_decode_returns(&bytes).ok()),
            CallOutcome::Reverted(_) => Ok(None),
        }
    }

    async fn get_logs_internal(
        &self,
        from_block: u64,
        to_block: u64,
        contract_address: Address,
        topic0: B256,
    ) -> Result<Vec<Log>> {
        let client = self.clone();
        Retry::spawn(self.get_retry_strategy(), move || {
            let client = client.clone();
            async move {
                let provider = client.get_provider();
                let filter = Filter::new()
                    .address(contract_address)
                    .event_signature(topic0)
                    .from_block(from_block)
                    .to_block(to_block);

                match timeout(client.request_timeout, provider.get_logs(&filter)).await {
                    Ok(Ok(logs)) => Ok(Ok(logs)),
                    Ok(Err(e)) => {
                        let error_str = e.to_string();

                        if error_str.contains("exceeds max results") {
                            debug!(
                                "Max results exceeded for blocks {}-{}, will split range",
                                from_block, to_block
                            );
                            // not retried: the caller splits the range instead
                            Ok(Err(anyhow::anyhow!("{}", e)))
                        } else {
                            client.handle_error(&error_str);
                            Err(anyhow::anyhow!("{}", e))
                        }
                    }
                    Err(_) => Err(client.handle_timeout()),
                }
            }
        })
        .await
        .and_then(|r| r)
    }

    fn parse_max_results_error(error_str: &str) -> Option<(u64, u64)> {
        let re = Regex::new(r"retry with the range (\d+)-(\d+)").ok()?;
        let captures = re.captures(error_str)?;

        let from = captures.get(1)?.as_str().parse().ok()?;
        let to = captures.get(2)?.as_str().parse().ok()?;

        Some((from, to))
    }

    pub async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        contract_address: Address,
        topic0: B256,
    ) -> Result<Vec<Log>> {
        let mut all_logs = Vec::new();
        let mut current_from = from_block;

        while current_from <= to_block {
            match self
                .get_logs_internal(current_from, to_block, contract_address, topic0)
                .await
            {
                Ok(logs) => {
                    all_logs.extend(logs);
                    break;
                }
                Err(e) => {
                    let error_str = e.to_string();

                    if !error_str.contains("exceeds max results") {
                        return Err(e);
                    }

                    let Some((suggested_from, suggested_to)) =
                        Self::parse_max_results_error(&error_str)
                    else {
                        return Err(e);
                    };

                    info!(
                        "Hit max results limit for blocks {}-{}, splitting at block {}",
                        current_from, to_block, suggested_to
                    );

                    let logs = self
                        .get_logs_internal(suggested_from, suggested_to, contract_address, topic0)
                        .await?;

                    all_logs.extend(logs);
                    current_from = suggested_to + 1;
                }
            }
        }

        Ok(all_logs)
    }
}
