//! Network-scoped digests of canonical forms

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest as _, Sha3_256};

use super::{normalize_address, CanonicalForm, CanonicalImport, ImportLocation};
use crate::network::Network;

/// Which stored hash a digest corresponds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashFlavor {
    /// Imports rendered with their testnet addresses
    Testnet,
    /// Imports rendered with their mainnet addresses
    Mainnet,
    /// Imports rendered by contract name only
    AddressAgnostic,
}

impl From<Network> for HashFlavor {
    fn from(network: Network) -> Self {
        match network {
            Network::Testnet => HashFlavor::Testnet,
            Network::Mainnet => HashFlavor::Mainnet,
        }
    }
}

/// Hex-encoded SHA3-256 digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(pub String);

impl Digest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contract addresses for one network
///
/// Keys are either placeholders as they appear in source
/// (`0xFUNGIBLETOKENADDRESS`) or bare contract names (for `import "A"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AddressBook(HashMap<String, String>);

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry; non-hex addresses are ignored
    pub fn insert(&mut self, key: impl Into<String>, address: &str) -> bool {
        match normalize_address(address) {
            Some(address) => {
                self.0.insert(key.into(), address);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge another book, entries in `other` taking precedence
    pub fn extend(&mut self, other: &AddressBook) {
        for (key, address) in &other.0 {
            self.0.insert(key.clone(), address.clone());
        }
    }

    fn resolve(&self, import: &CanonicalImport) -> Option<String> {
        let by_placeholder = match &import.location {
            ImportLocation::Placeholder(raw) => self.get(raw),
            _ => None,
        };
        by_placeholder
            .or_else(|| self.get(&import.contract))
            .and_then(normalize_address)
    }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for AddressBook {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut book = AddressBook::new();
        for (key, address) in iter {
            book.insert(key, address.as_ref());
        }
        book
    }
}

/// Everything a digest depends on besides the source itself
#[derive(Debug, Clone, Default)]
pub struct NetworkContext {
    pub flavor: Option<HashFlavor>,
    pub addresses: AddressBook,
}

impl NetworkContext {
    pub fn new(flavor: HashFlavor, addresses: AddressBook) -> Self {
        Self {
            flavor: Some(flavor),
            addresses,
        }
    }

    pub fn for_network(network: Network, addresses: AddressBook) -> Self {
        Self::new(network.into(), addresses)
    }

    pub fn address_agnostic() -> Self {
        Self::new(HashFlavor::AddressAgnostic, AddressBook::default())
    }

    pub fn flavor(&self) -> HashFlavor {
        self.flavor.unwrap_or(HashFlavor::AddressAgnostic)
    }

    pub(super) fn render_import(&self, import: &CanonicalImport) -> String {
        if self.flavor() == HashFlavor::AddressAgnostic {
            return format!("import \"{}\"", import.contract);
        }

        let address = match &import.location {
            ImportLocation::Address(address) => Some(address.clone()),
            ImportLocation::Placeholder(_) | ImportLocation::Unspecified => {
                self.addresses.resolve(import)
            }
        };

        match (address, &import.location) {
            (Some(address), _) => format!("import {} from {}", import.contract, address),
            (None, ImportLocation::Placeholder(raw)) => {
                format!("import {} from {}", import.contract, raw)
            }
            (None, _) => format!("import \"{}\"", import.contract),
        }
    }
}

/// Digest a canonical form under a hashing context
pub fn hash(form: &CanonicalForm, ctx: &NetworkContext) -> Digest {
    let text = form.render(ctx);
    Digest(hex::encode(Sha3_256::digest(text.as_bytes())))
}

/// The three stored digests of one template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateHashes {
    pub testnet: Option<Digest>,
    pub mainnet: Option<Digest>,
    pub agnostic: Option<Digest>,
}

impl TemplateHashes {
    /// Compute every flavor, using the given per-network address books
    pub fn compute(form: &CanonicalForm, books: &HashMap<Network, AddressBook>) -> Self {
        let aware = |network: Network| {
            let book = books.get(&network).cloned().unwrap_or_default();
            hash(form, &NetworkContext::for_network(network, book))
        };
        Self {
            testnet: Some(aware(Network::Testnet)),
            mainnet: Some(aware(Network::Mainnet)),
            agnostic: Some(hash(form, &NetworkContext::address_agnostic())),
        }
    }

    pub fn get(&self, flavor: HashFlavor) -> Option<&Digest> {
        match flavor {
            HashFlavor::Testnet => self.testnet.as_ref(),
            HashFlavor::Mainnet => self.mainnet.as_ref(),
            HashFlavor::AddressAgnostic => self.agnostic.as_ref(),
        }
    }
}
