pub mod abi;
pub mod aggregator;
pub mod chain;
pub mod config;
pub mod holders;
pub mod network;
pub mod nicknames;
pub mod pricing;
pub mod query;
pub mod repository;
pub mod rpc;

#[cfg(test)]
pub(crate) mod test_node;
