//! Resolution service - template lookup by source, name and audit status

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auditors::{Auditor, AuditorRegistry};
use crate::canonical::{canonicalize, hash, AddressBook, HashFlavor, NetworkContext};
use crate::ledger::{AttestationQueryError, AttestationSet, AttestationSource};
use crate::network::{Network, UnsupportedNetwork};
use crate::template::{AliasResolution, AliasTable, Manifest, StoreError, Template, TemplateStore};
use crate::{format_parse_errors, ParseError};

/// Default upper bound for a single attestation query
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors surfaced by resolution operations
///
/// "Nothing matched" is never an error; lookups return `Ok(None)` or an
/// empty list for that.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Source text is not valid Cadence
    #[error("malformed source: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// Request payload could not be decoded
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error(transparent)]
    UnsupportedNetwork(#[from] UnsupportedNetwork),

    /// The static alias table loops or nests too deeply
    #[error("alias chain for '{name}' does not terminate: {}", chain.join(" -> "))]
    AliasCycle { name: String, chain: Vec<String> },

    #[error("attestation query failed: {0}")]
    Attestation(#[from] AttestationQueryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<Vec<ParseError>> for ResolveError {
    fn from(errors: Vec<ParseError>) -> Self {
        ResolveError::Parse(errors)
    }
}

impl ResolveError {
    /// Whether the caller's input caused the failure
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ResolveError::Parse(_)
                | ResolveError::MalformedInput(_)
                | ResolveError::UnsupportedNetwork(_)
                | ResolveError::Attestation(AttestationQueryError::InvalidAddress(_))
        )
    }
}

/// Answers template and audit queries over the store, alias table,
/// auditor registry and audit ledger
pub struct ResolutionService<S, L> {
    store: Arc<S>,
    ledger: Arc<L>,
    aliases: Arc<AliasTable>,
    registry: Arc<AuditorRegistry>,
    address_books: Arc<HashMap<Network, AddressBook>>,
    query_timeout: Duration,
}

impl<S, L> ResolutionService<S, L>
where
    S: TemplateStore,
    L: AttestationSource,
{
    pub fn new(
        store: Arc<S>,
        ledger: Arc<L>,
        aliases: Arc<AliasTable>,
        registry: Arc<AuditorRegistry>,
    ) -> Self {
        Self {
            store,
            ledger,
            aliases,
            registry,
            address_books: Arc::new(HashMap::new()),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Set the contract addresses used for address-less imports in searches
    pub fn with_address_books(mut self, books: HashMap<Network, AddressBook>) -> Self {
        self.address_books = Arc::new(books);
        self
    }

    /// Set the per-query attestation timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub async fn list_templates(&self) -> Result<Vec<Template>, ResolveError> {
        Ok(self.store.list_all().await?)
    }

    pub async fn manifest(&self) -> Result<Option<Manifest>, ResolveError> {
        Ok(self.store.get_manifest().await?)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Template>, ResolveError> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Find the template whose Cadence matches `source` on `network`
    ///
    /// Looks up the network's address-aware digest first. When the source
    /// pins no concrete addresses, falls back to the address-agnostic digest.
    pub async fn find_by_source(
        &self,
        source: &str,
        network: &str,
    ) -> Result<Option<Template>, ResolveError> {
        let network: Network = network.parse()?;
        let form = canonicalize(source)?;

        let book = self.address_books.get(&network).cloned().unwrap_or_default();
        let ctx = NetworkContext::for_network(network, book);
        let digest = hash(&form, &ctx);
        debug!(%network, %digest, "searching template by source");

        if let Some(template) = self.store.get_by_hash(&digest, ctx.flavor()).await? {
            return Ok(Some(template));
        }

        if form.has_concrete_addresses() {
            return Ok(None);
        }

        let agnostic = hash(&form, &NetworkContext::address_agnostic());
        debug!(%network, digest = %agnostic, "falling back to address-agnostic digest");
        Ok(self
            .store
            .get_by_hash(&agnostic, HashFlavor::AddressAgnostic)
            .await?)
    }

    /// [`find_by_source`](Self::find_by_source) for base64-encoded source
    pub async fn find_by_source_base64(
        &self,
        source_base64: &str,
        network: &str,
    ) -> Result<Option<Template>, ResolveError> {
        let bytes = B64
            .decode(source_base64.trim())
            .map_err(|e| ResolveError::MalformedInput(format!("cadence is not base64: {}", e)))?;
        let source = String::from_utf8(bytes)
            .map_err(|e| ResolveError::MalformedInput(format!("cadence is not UTF-8: {}", e)))?;
        self.find_by_source(&source, network).await
    }

    /// Resolve a human name through the alias table, then look up the id
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Template>, ResolveError> {
        match self.aliases.resolve(name) {
            AliasResolution::Resolved(id) => {
                debug!(name, template_id = %id, "resolved alias");
                self.find_by_id(&id).await
            }
            AliasResolution::Unresolved => Ok(None),
            AliasResolution::Cycle { chain } => Err(ResolveError::AliasCycle {
                name: name.to_string(),
                chain,
            }),
        }
    }

    fn registered_auditors(&self, network: Network) -> Result<&[Auditor], ResolveError> {
        self.registry
            .auditors_for(network)
            .ok_or_else(|| UnsupportedNetwork(network.to_string()).into())
    }

    /// Every registered auditor for a network
    pub async fn auditors(&self, network: &str) -> Result<Vec<Auditor>, ResolveError> {
        let network: Network = network.parse()?;
        Ok(self.registered_auditors(network)?.to_vec())
    }

    async fn query(
        &self,
        address: &str,
        network: Network,
    ) -> Result<AttestationSet, AttestationQueryError> {
        tokio::time::timeout(
            self.query_timeout,
            self.ledger.attestations_of(address, network),
        )
        .await
        .unwrap_or(Err(AttestationQueryError::Timeout(self.query_timeout)))
    }

    /// Template ids an address attests to; query failures propagate
    pub async fn audited_template_ids(
        &self,
        address: &str,
        network: &str,
    ) -> Result<AttestationSet, ResolveError> {
        let network: Network = network.parse()?;
        self.registered_auditors(network)?;
        if !self.registry.is_registered(network, address) {
            debug!(%network, address, "querying address outside the auditor registry");
        }
        Ok(self.query(address, network).await?)
    }

    /// Registered auditors on `network` that attest to `template_id`
    ///
    /// All auditors are queried concurrently. A failed or timed-out query
    /// only removes that auditor from the result.
    pub async fn auditors_of(
        &self,
        template_id: &str,
        network: &str,
    ) -> Result<Vec<Auditor>, ResolveError> {
        let network: Network = network.parse()?;
        let auditors = self.registered_auditors(network)?;

        let outcomes = join_all(auditors.iter().map(|auditor| async move {
            (auditor, self.query(&auditor.address, network).await)
        }))
        .await;

        let mut attesting = Vec::new();
        let mut failed = 0usize;
        for (auditor, outcome) in outcomes {
            match outcome {
                Ok(set) if set.contains(template_id) => attesting.push(auditor.clone()),
                Ok(_) => {}
                Err(err) => {
                    failed += 1;
                    warn!(
                        %network,
                        address = %auditor.address,
                        error = %err,
                        "attestation query failed, omitting auditor"
                    );
                }
            }
        }

        info!(
            %network,
            template_id,
            queried = auditors.len(),
            failed,
            attesting = attesting.len(),
            "resolved template auditors"
        );
        Ok(attesting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::InMemoryTemplateStore;

    #[test]
    fn test_client_error_classification() {
        assert!(ResolveError::from(UnsupportedNetwork("devnet".into())).is_client_error());
        assert!(ResolveError::MalformedInput("x".into()).is_client_error());
        assert!(!ResolveError::Store(StoreError::Backend("down".into())).is_client_error());
        assert!(!ResolveError::Attestation(AttestationQueryError::Timeout(
            Duration::from_secs(1)
        ))
        .is_client_error());
    }

    struct NoLedger;

    #[async_trait::async_trait]
    impl AttestationSource for NoLedger {
        async fn attestations_of(
            &self,
            _address: &str,
            _network: Network,
        ) -> Result<AttestationSet, AttestationQueryError> {
            Ok(AttestationSet::new())
        }
    }

    fn service() -> ResolutionService<InMemoryTemplateStore, NoLedger> {
        ResolutionService::new(
            Arc::new(InMemoryTemplateStore::new()),
            Arc::new(NoLedger),
            Arc::new(AliasTable::default()),
            Arc::new(AuditorRegistry::default()),
        )
    }

    #[tokio::test]
    async fn test_invalid_base64_is_malformed_input() {
        let result = service().find_by_source_base64("%%%", "testnet").await;
        assert!(matches!(result, Err(ResolveError::MalformedInput(_))));
    }

    #[tokio::test]
    async fn test_network_missing_from_registry_is_unsupported() {
        let result = service().auditors("mainnet").await;
        assert!(matches!(result, Err(ResolveError::UnsupportedNetwork(_))));
    }
}
