//! FLIX Resolver - lookup and audit status for Flow Interaction Templates
//!
//! This library canonicalizes Cadence source into formatting-independent
//! digests, resolves templates by source, id or human name, and reports
//! which registered auditors attest to a template on chain.
//!
//! # Example
//!
//! ```rust
//! use flix_resolver::{hash_source, NetworkContext};
//!
//! let ctx = NetworkContext::address_agnostic();
//! let a = hash_source("fun main() { return 1 }", &ctx).unwrap();
//! let b = hash_source("fun main()   {\n  return 1 // one\n}", &ctx).unwrap();
//! assert_eq!(a, b);
//! ```

pub mod auditors;
pub mod canonical;
pub mod config;
pub mod error;
pub mod generate;
pub mod http;
pub mod ledger;
pub mod network;
pub mod parser;
pub mod service;
pub mod template;

pub use auditors::{Auditor, AuditorRegistry, RegistryError};
pub use canonical::{canonicalize, hash, AddressBook, Digest, HashFlavor, NetworkContext};
pub use config::{ConfigError, ServiceConfig};
pub use error::ParseError;
pub use ledger::{AttestationQueryError, AttestationSet, AttestationSource, FlowAccessClient};
pub use network::{Network, UnsupportedNetwork};
pub use service::{ResolutionService, ResolveError};
pub use template::{AliasResolution, AliasTable, InMemoryTemplateStore, Template, TemplateStore};

pub(crate) fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Canonicalize and digest Cadence source in one step
///
/// # Example
///
/// ```rust
/// use flix_resolver::{hash_source, AddressBook, Network, NetworkContext};
///
/// let testnet = NetworkContext::for_network(Network::Testnet, AddressBook::default());
/// let short = hash_source("import A from 0x1\nfun main() {}", &testnet).unwrap();
/// let padded = hash_source("import A from 0x0000000000000001\nfun main() {}", &testnet).unwrap();
/// assert_eq!(short, padded);
/// ```
pub fn hash_source(source: &str, ctx: &NetworkContext) -> Result<Digest, Vec<ParseError>> {
    let form = canonicalize(source)?;
    Ok(hash(&form, ctx))
}
