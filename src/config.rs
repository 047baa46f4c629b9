use crate::network::Network;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SNAPSHOT_URL: &str = "https://cloudflare-ipfs.com/ipfs/bafybeieluiest3gtccszqh6bymzs6r4gn62wsh2uznom2pqb2tqt54ef7i/sepolia.db";

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub json_rpc_urls: Vec<String>,
    pub network: Option<Network>,
    pub log_batch_size: u64,
    pub request_timeout: Duration,
    pub max_retries: usize,
    pub nicknames_path: Option<String>,
}

impl RpcConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let urls = std::env::var("JSON_RPC_URLS")
            .or_else(|_| std::env::var("JSON_RPC_URL"))
            .context("JSON_RPC_URLS (or JSON_RPC_URL) must be set in .env")?;
        let json_rpc_urls = parse_url_list(&urls);
        if json_rpc_urls.is_empty() {
            anyhow::bail!("JSON_RPC_URLS contains no usable URL");
        }

        let network = std::env::var("NETWORK")
            .ok()
            .map(|name| Network::from_str(&name))
            .transpose()?;

        let log_batch_size = env_or("LOG_BATCH_SIZE", 50_000u64)?;
        if log_batch_size == 0 {
            anyhow::bail!("LOG_BATCH_SIZE must be greater than zero");
        }

        let request_timeout = Duration::from_secs(env_or("RPC_TIMEOUT_SECS", 120u64)?);
        let max_retries = env_or("RPC_MAX_RETRIES", 5usize)?;
        let nicknames_path = std::env::var("NICKNAMES_PATH").ok();

        Ok(RpcConfig {
            json_rpc_urls,
            network,
            log_batch_size,
            request_timeout,
            max_retries,
            nicknames_path,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Either an http(s) URL or a path to a local SQLite file
    pub source: String,
    pub cache_path: String,
}

impl SnapshotConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let source = std::env::var("SNAPSHOT_URL")
            .unwrap_or_else(|_| DEFAULT_SNAPSHOT_URL.to_string());
        let cache_path = std::env::var("SNAPSHOT_CACHE_PATH")
            .unwrap_or_else(|_| "./snapshot.db".to_string());

        Ok(SnapshotConfig { source, cache_path })
    }
}

fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {value}")),
        Err(_) => Ok(default),
    }
}
