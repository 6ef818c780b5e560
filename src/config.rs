//! Service configuration loaded from TOML

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::canonical::AddressBook;
use crate::network::{Network, UnsupportedNetwork};

/// Errors that can occur when loading or parsing configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid network in config: {0}")]
    Network(#[from] UnsupportedNetwork),
    #[error("Invalid address for {contract} on {network}: {address}")]
    Address {
        network: Network,
        contract: String,
        address: String,
    },
}

/// Runtime configuration of the resolution service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket address the HTTP surface binds to
    pub bind: String,
    /// JSON alias table (name -> name-or-id)
    pub names_path: PathBuf,
    /// JSON auditor registry keyed by network
    pub auditors_path: PathBuf,
    /// Directory of FLIX template documents
    pub templates_dir: PathBuf,
    /// Upper bound for each attestation query
    pub query_timeout: Duration,
    /// Access node overrides for known networks
    pub access_nodes: HashMap<Network, String>,
    /// Contract addresses for resolving address-less imports
    pub address_books: HashMap<Network, AddressBook>,
}

#[derive(Deserialize)]
struct TomlConfig {
    server: Option<TomlServer>,
    data: Option<TomlData>,
    ledger: Option<TomlLedger>,
    #[serde(default)]
    access_nodes: HashMap<String, String>,
    #[serde(default)]
    address_books: HashMap<String, HashMap<String, String>>,
}

#[derive(Deserialize)]
struct TomlServer {
    bind: Option<String>,
}

#[derive(Deserialize)]
struct TomlData {
    names: Option<PathBuf>,
    auditors: Option<PathBuf>,
    templates: Option<PathBuf>,
}

#[derive(Deserialize)]
struct TomlLedger {
    query_timeout_ms: Option<u64>,
}

impl ServiceConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from TOML string
    ///
    /// Missing keys fall back to the defaults.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let mut access_nodes = HashMap::new();
        for (network, url) in parsed.access_nodes {
            access_nodes.insert(network.parse::<Network>()?, url);
        }

        let mut address_books = HashMap::new();
        for (network, entries) in parsed.address_books {
            let network = network.parse::<Network>()?;
            let mut book = AddressBook::new();
            for (contract, address) in entries {
                if !book.insert(contract.clone(), &address) {
                    return Err(ConfigError::Address {
                        network,
                        contract,
                        address,
                    });
                }
            }
            address_books.insert(network, book);
        }

        let (names, auditors, templates) = match parsed.data {
            Some(data) => (data.names, data.auditors, data.templates),
            None => (None, None, None),
        };

        Ok(Self {
            bind: parsed.server.and_then(|s| s.bind).unwrap_or(defaults.bind),
            names_path: names.unwrap_or(defaults.names_path),
            auditors_path: auditors.unwrap_or(defaults.auditors_path),
            templates_dir: templates.unwrap_or(defaults.templates_dir),
            query_timeout: parsed
                .ledger
                .and_then(|l| l.query_timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.query_timeout),
            access_nodes,
            address_books,
        })
    }

    /// Set the bind address
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Set the attestation query timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set the template directory
    pub fn with_templates_dir(mut self, dir: PathBuf) -> Self {
        self.templates_dir = dir;
        self
    }

    /// Access node URL for a network, honouring overrides
    pub fn access_node(&self, network: Network) -> &str {
        self.access_nodes
            .get(&network)
            .map(|s| s.as_str())
            .unwrap_or_else(|| network.access_node())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3333".to_string(),
            names_path: PathBuf::from("data/names.json"),
            auditors_path: PathBuf::from("data/auditors.json"),
            templates_dir: PathBuf::from("templates"),
            query_timeout: Duration::from_millis(10_000),
            access_nodes: HashMap::new(),
            address_books: HashMap::new(),
        }
    }
}
