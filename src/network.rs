use alloy_primitives::{Address, address};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Sepolia,
}

/// Addresses the aggregator needs on a given network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConstants {
    pub weth: Address,
    pub uniswap_factory: Address,
}

impl Network {
    pub fn from_chain_id(chain_id: u64) -> anyhow::Result<Self> {
        match chain_id {
            1 => Ok(Network::Mainnet),
            11_155_111 => Ok(Network::Sepolia),
            other => anyhow::bail!("Unsupported chain id {}", other),
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Sepolia => 11_155_111,
        }
    }

    pub fn constants(&self) -> NetworkConstants {
        match self {
            Network::Mainnet => NetworkConstants {
                weth: address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
                uniswap_factory: address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f"),
            },
            Network::Sepolia => NetworkConstants {
                weth: address!("fFf9976782d46CC05630D1f6eBAb18b2324d6B14"),
                uniswap_factory: address!("F62c03E08ada871A0bEb309762E260a7a6a880E6"),
            },
        }
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" | "homestead" | "1" => Ok(Network::Mainnet),
            "sepolia" | "11155111" => Ok(Network::Sepolia),
            other => Err(anyhow::anyhow!("Unknown network: {}", other)),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Sepolia => write!(f, "sepolia"),
        }
    }
}
