use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Token not found: {0}")]
    TokenNotFound(String),

    #[error("Failed to download snapshot from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot database error: {0:#}")]
    Database(anyhow::Error),

    #[error("Snapshot query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Snapshot task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<anyhow::Error> for SnapshotError {
    fn from(err: anyhow::Error) -> Self {
        SnapshotError::Database(err)
    }
}
