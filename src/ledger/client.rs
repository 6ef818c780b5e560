//! Access node REST client for audit manager queries

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::{decode_attestations, AttestationQueryError, AttestationSet, AttestationSource};
use crate::canonical::normalize_address;
use crate::network::Network;

/// Read-only script borrowing the audit manager from an auditor's storage
pub const AUDIT_MANAGER_SCRIPT: &str = r#"
access(all) fun main(address: Address): &AnyResource? {
    let account = getAuthAccount<auth(BorrowValue) &Account>(address)
    return account.storage.borrow<&AnyResource>(from: /storage/FlowInteractionTemplateAuditManagerStoragePath)
}
"#;

#[derive(Serialize)]
struct ScriptRequest {
    script: String,
    arguments: Vec<String>,
}

/// Queries audit managers through each network's access node
#[derive(Debug, Clone)]
pub struct FlowAccessClient {
    http: Client,
    endpoints: HashMap<Network, String>,
}

impl FlowAccessClient {
    /// Create a client whose requests are bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, AttestationQueryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AttestationQueryError::Client)?;
        Ok(Self {
            http,
            endpoints: HashMap::new(),
        })
    }

    /// Route a known network to a different access node
    pub fn with_endpoint(mut self, network: Network, url: impl Into<String>) -> Self {
        self.endpoints.insert(network, url.into());
        self
    }

    pub fn endpoint(&self, network: Network) -> &str {
        self.endpoints
            .get(&network)
            .map(|s| s.trim_end_matches('/'))
            .unwrap_or_else(|| network.access_node())
    }

    fn script_request(address: &str) -> Result<ScriptRequest, AttestationQueryError> {
        let address = normalize_address(address)
            .ok_or_else(|| AttestationQueryError::InvalidAddress(address.to_string()))?;
        let argument = json!({ "type": "Address", "value": address }).to_string();
        Ok(ScriptRequest {
            script: B64.encode(AUDIT_MANAGER_SCRIPT),
            arguments: vec![B64.encode(argument)],
        })
    }
}

#[async_trait]
impl AttestationSource for FlowAccessClient {
    async fn attestations_of(
        &self,
        address: &str,
        network: Network,
    ) -> Result<AttestationSet, AttestationQueryError> {
        let request = Self::script_request(address)?;
        let url = format!("{}/v1/scripts", self.endpoint(network));
        debug!(%network, address, %url, "querying audit manager");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|source| AttestationQueryError::Transport { network, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttestationQueryError::Status {
                network,
                status: status.as_u16(),
                body,
            });
        }

        // The access node answers with a JSON string of base64 JSON-Cadence
        let encoded: String = response
            .json()
            .await
            .map_err(|source| AttestationQueryError::Transport { network, source })?;
        let raw = B64.decode(encoded.trim())?;
        let value: serde_json::Value = serde_json::from_slice(&raw)?;

        let set = decode_attestations(&value)?;
        debug!(%network, address, attested = set.len(), "decoded audit manager");
        Ok(set)
    }
}
