pub mod balance_repository;
pub mod database;
pub mod error;
pub mod models;
pub mod pair_repository;
pub mod service;
pub mod token_repository;

pub use balance_repository::BalanceRepository;
pub use database::{Database, create_schema};
pub use error::SnapshotError;
pub use models::{LiquidityProvider, Pair, Token, TokenBalance, TokenDetails};
pub use pair_repository::PairRepository;
pub use service::{QueryService, SnapshotSource, lookup_token_details};
pub use token_repository::TokenRepository;
