//! Solana clusters and their Wallet Standard chain identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    #[default]
    MainnetBeta,
    Devnet,
    Testnet,
}

impl Cluster {
    /// Infer the cluster from an RPC endpoint. Unknown or missing endpoints
    /// map to mainnet.
    pub fn infer_from_endpoint(endpoint: Option<&str>) -> Self {
        let Some(endpoint) = endpoint else {
            return Self::MainnetBeta;
        };
        let endpoint = endpoint.to_ascii_lowercase();
        if endpoint.contains("devnet") {
            Self::Devnet
        } else if endpoint.contains("testnet") {
            Self::Testnet
        } else {
            Self::MainnetBeta
        }
    }

    /// Wallet Standard chain id, e.g. `solana:devnet`
    pub fn chain(&self) -> &'static str {
        match self {
            Self::MainnetBeta => "solana:mainnet",
            Self::Devnet => "solana:devnet",
            Self::Testnet => "solana:testnet",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MainnetBeta => write!(f, "mainnet-beta"),
            Self::Devnet => write!(f, "devnet"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}
