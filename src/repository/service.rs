use super::{
    BalanceRepository, Database, PairRepository, SnapshotError, TokenDetails, TokenRepository,
};
use crate::config::SnapshotConfig;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Where the snapshot lives before it is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    Remote { url: String, cache_path: PathBuf },
    Local(PathBuf),
}

impl SnapshotSource {
    pub fn from_config(config: &SnapshotConfig) -> Self {
        let source = config.source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            SnapshotSource::Remote {
                url: source.to_string(),
                cache_path: PathBuf::from(&config.cache_path),
            }
        } else {
            let path = source.strip_prefix("sqlite:").unwrap_or(source);
            SnapshotSource::Local(PathBuf::from(path))
        }
    }
}

/// Looks up token details in a read-only snapshot database
pub struct QueryService {
    source: SnapshotSource,
    refresh: bool,
}

impl QueryService {
    pub fn new(source: SnapshotSource) -> Self {
        Self {
            source,
            refresh: false,
        }
    }

    /// Re-download a remote snapshot even when a cached copy exists
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Local path of the snapshot, downloading it first if needed
    pub async fn resolve(&self) -> Result<PathBuf, SnapshotError> {
        match &self.source {
            SnapshotSource::Local(path) => Ok(path.clone()),
            SnapshotSource::Remote { url, cache_path } => {
                let cached = tokio::fs::try_exists(cache_path).await.unwrap_or(false);
                if cached && !self.refresh {
                    debug!("Using cached snapshot {}", cache_path.display());
                } else {
                    download_snapshot(url, cache_path).await?;
                }
                Ok(cache_path.clone())
            }
        }
    }

    pub async fn fetch_token_details(
        &self,
        token_name: &str,
    ) -> Result<TokenDetails, SnapshotError> {
        let path = self.resolve().await?;
        let token_name = token_name.to_string();

        // rusqlite is blocking
        tokio::task::spawn_blocking(move || {
            let db = Database::open(&path)?;
            lookup_token_details(&db.conn, &token_name)
        })
        .await?
    }
}

/// Token row by name, then its balances, the pairs it appears in, and the
/// liquidity providers of every such pair.
pub fn lookup_token_details(
    conn: &Connection,
    token_name: &str,
) -> Result<TokenDetails, SnapshotError> {
    let start = Instant::now();

    let token = TokenRepository::new(conn)
        .find_by_name(token_name)?
        .ok_or_else(|| SnapshotError::TokenNotFound(token_name.to_string()))?;

    let balances = BalanceRepository::new(conn).for_token(&token.address)?;

    let pair_repo = PairRepository::new(conn);
    let pairs = pair_repo.for_token(&token.address)?;

    let mut liquidity_providers = Vec::new();
    for pair in &pairs {
        liquidity_providers.extend(pair_repo.liquidity_providers(&pair.pair_address)?);
    }

    info!(
        "Token {} ({}): {} balances, {} pairs, {} liquidity providers in {:?}",
        token.name,
        token.address,
        balances.len(),
        pairs.len(),
        liquidity_providers.len(),
        start.elapsed()
    );

    Ok(TokenDetails {
        token,
        balances,
        pairs,
        liquidity_providers,
    })
}

async fn download_snapshot(url: &str, dest: &Path) -> Result<(), SnapshotError> {
    let start = Instant::now();
    info!("Downloading snapshot from {}", url);

    let download_error = |source: reqwest::Error| SnapshotError::Download {
        url: url.to_string(),
        source,
    };

    let response = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(download_error)?;
    let body = response.bytes().await.map_err(download_error)?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    // renamed into place only once complete
    let partial = dest.with_extension("partial");
    tokio::fs::write(&partial, &body).await?;
    tokio::fs::rename(&partial, dest).await?;

    info!(
        "Snapshot saved to {} ({} bytes, {:?})",
        dest.display(),
        body.len(),
        start.elapsed()
    );
    Ok(())
}
