//! Audit ledger access - which templates an auditor attests to on chain
//!
//! Each auditor account stores an audit manager resource holding a
//! `{String: Bool}` dictionary of template ids. [`AttestationSource`] is the
//! seam the resolution service queries; [`FlowAccessClient`] implements it
//! against the public access node REST API.

mod client;
mod decode;

pub use client::{FlowAccessClient, AUDIT_MANAGER_SCRIPT};
pub use decode::decode_attestations;

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::network::Network;

/// Errors that can occur while querying an auditor's attestations
#[derive(Debug, Error)]
pub enum AttestationQueryError {
    #[error("invalid account address '{0}'")]
    InvalidAddress(String),

    #[error("failed to build access node client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {network} access node failed: {source}")]
    Transport {
        network: Network,
        #[source]
        source: reqwest::Error,
    },

    #[error("{network} access node returned status {status}: {body}")]
    Status {
        network: Network,
        status: u16,
        body: String,
    },

    #[error("script result is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("script result is not valid JSON-Cadence: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected script result: {0}")]
    Decode(String),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

/// Template ids an auditor currently attests to
///
/// Revoked (false-flagged) entries are dropped on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttestationSet(BTreeSet<String>);

impl AttestationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from on-chain `(template id, flag)` entries, keeping true flags
    pub fn from_flags<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self(
            entries
                .into_iter()
                .filter(|(_, attested)| *attested)
                .map(|(id, _)| id.into())
                .collect(),
        )
    }

    pub fn contains(&self, template_id: &str) -> bool {
        self.0.contains(template_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }
}

impl<S: Into<String>> FromIterator<S> for AttestationSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Source of per-auditor attestation sets
#[async_trait]
pub trait AttestationSource: Send + Sync {
    /// Attestations held by `address` on `network`
    ///
    /// An account without an audit manager resource has no attestations and
    /// yields an empty set, not an error.
    async fn attestations_of(
        &self,
        address: &str,
        network: Network,
    ) -> Result<AttestationSet, AttestationQueryError>;
}
