use alloy_primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("No WETH pair found for token {0:?}")]
    PairNotFound(Address),

    #[error("Upstream RPC failure: {0:#}")]
    Upstream(anyhow::Error),
}

impl From<anyhow::Error> for AggregateError {
    fn from(err: anyhow::Error) -> Self {
        AggregateError::Upstream(err)
    }
}
