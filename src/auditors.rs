//! Static per-network registry of known auditors

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::canonical::normalize_address;
use crate::network::{Network, UnsupportedNetwork};

/// Errors that can occur when loading the auditor registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read auditor registry: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse auditor registry JSON: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Identity record of an auditor on one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auditor {
    pub address: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
}

/// Auditors known for each supported network
#[derive(Debug, Clone, Default)]
pub struct AuditorRegistry {
    networks: HashMap<Network, Vec<Auditor>>,
}

impl AuditorRegistry {
    pub fn new(networks: HashMap<Network, Vec<Auditor>>) -> Self {
        Self { networks }
    }

    /// Load registry from a JSON file keyed by network name
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load registry from a JSON string keyed by network name
    ///
    /// Entries for networks outside the supported set are skipped.
    pub fn from_json(content: &str) -> Result<Self, RegistryError> {
        let raw: HashMap<String, Vec<Auditor>> = serde_json::from_str(content)?;
        let mut networks = HashMap::new();
        for (key, auditors) in raw {
            match key.parse::<Network>() {
                Ok(network) => {
                    networks.insert(network, auditors);
                }
                Err(_) => warn!(network = %key, "skipping auditors for unsupported network"),
            }
        }
        Ok(Self { networks })
    }

    /// Auditors for a network; `None` when the network has no registry entry
    pub fn auditors_for(&self, network: Network) -> Option<&[Auditor]> {
        self.networks.get(&network).map(|a| a.as_slice())
    }

    /// Like [`auditors_for`](Self::auditors_for), parsing the network name first
    pub fn auditors_for_name(&self, network: &str) -> Result<Option<&[Auditor]>, UnsupportedNetwork> {
        let network: Network = network.parse()?;
        Ok(self.auditors_for(network))
    }

    /// Whether `address` is a registered auditor on `network`
    ///
    /// Addresses compare in normalized form, so `0x1` matches
    /// `0x0000000000000001` regardless of case.
    pub fn is_registered(&self, network: Network, address: &str) -> bool {
        let wanted = normalize_address(address);
        self.auditors_for(network).is_some_and(|auditors| {
            auditors.iter().any(|a| match (&wanted, normalize_address(&a.address)) {
                (Some(wanted), Some(known)) => *wanted == known,
                _ => a.address == address,
            })
        })
    }
}
