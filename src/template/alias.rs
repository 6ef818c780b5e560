//! Name alias resolution - walks name -> name-or-id chains to a template id

use std::collections::{HashMap, HashSet};
use std::path::Path;

use thiserror::Error;

/// Longest alias chain followed before giving up
pub const MAX_ALIAS_CHAIN: usize = 64;

/// Errors that can occur when loading an alias table
#[derive(Debug, Error)]
pub enum AliasError {
    #[error("Failed to read alias table: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse alias table JSON: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Outcome of resolving a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasResolution {
    /// The chain ended on this template id
    Resolved(String),
    /// The name is not in the table
    Unresolved,
    /// The chain revisits a name or exceeds [`MAX_ALIAS_CHAIN`]
    Cycle { chain: Vec<String> },
}

/// Static name -> name-or-template-id table
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Load table from a JSON object file
    pub fn from_file(path: &Path) -> Result<Self, AliasError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load table from a JSON object string
    pub fn from_json(content: &str) -> Result<Self, AliasError> {
        let entries: HashMap<String, String> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is a chain target that is not itself a key
    fn is_terminal(&self, name: &str) -> bool {
        !self.entries.contains_key(name) && self.entries.values().any(|v| v == name)
    }

    /// Follow the alias chain starting at `name`
    ///
    /// The answer is the last value found before a lookup misses. A name
    /// that is already a terminal id of the table resolves to itself.
    pub fn resolve(&self, name: &str) -> AliasResolution {
        let mut current = match self.entries.get(name) {
            Some(next) => next,
            None if self.is_terminal(name) => return AliasResolution::Resolved(name.to_string()),
            None => return AliasResolution::Unresolved,
        };

        let mut visited: HashSet<&str> = HashSet::from([name]);
        let mut chain = vec![name.to_string()];

        for _ in 0..MAX_ALIAS_CHAIN {
            chain.push(current.clone());
            if !visited.insert(current.as_str()) {
                return AliasResolution::Cycle { chain };
            }
            match self.entries.get(current) {
                Some(next) => current = next,
                None => return AliasResolution::Resolved(current.clone()),
            }
        }

        AliasResolution::Cycle { chain }
    }
}
