//! Supported network environments

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier outside the closed set of supported networks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("network '{0}' not supported")]
pub struct UnsupportedNetwork(pub String);

/// A deployment environment with its own address space and access node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Testnet, Network::Mainnet];

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }

    /// REST endpoint of the public access node for this network
    pub fn access_node(self) -> &'static str {
        match self {
            Network::Testnet => "https://rest-testnet.onflow.org",
            Network::Mainnet => "https://rest-mainnet.onflow.org",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = UnsupportedNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(UnsupportedNetwork(other.to_string())),
        }
    }
}
