//! HTTP surface over the resolution service

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::ledger::AttestationSource;
use crate::service::{ResolutionService, ResolveError};
use crate::template::{Template, TemplateStore};

type Shared<S, L> = State<Arc<ResolutionService<S, L>>>;

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NetworkQuery {
    pub network: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub cadence_base64: Option<String>,
    pub network: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if matches!(self, ResolveError::Attestation(_)) {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ResolveError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ResolveError::MalformedInput(format!("missing '{}'", field)))
}

fn template_response(template: Option<Template>) -> Response {
    match template {
        Some(template) => Json(template.body).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Build the `/v1` router
pub fn router<S, L>(service: Arc<ResolutionService<S, L>>) -> Router
where
    S: TemplateStore + 'static,
    L: AttestationSource + 'static,
{
    let v1 = Router::new()
        .route("/templates", get(list_templates::<S, L>))
        .route("/templates/manifest", get(get_manifest::<S, L>))
        .route("/templates/search", post(search_template::<S, L>))
        .route("/templates/:id", get(get_template::<S, L>))
        .route("/templates/:id/auditors", get(template_auditors::<S, L>))
        .route("/auditors", get(list_auditors::<S, L>))
        .route("/auditors/:address/audits", get(auditor_audits::<S, L>));

    Router::new()
        .nest("/v1", v1)
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// GET /v1/templates[?name=]
async fn list_templates<S, L>(
    State(service): Shared<S, L>,
    Query(query): Query<NameQuery>,
) -> Result<Response, ResolveError>
where
    S: TemplateStore,
    L: AttestationSource,
{
    if let Some(name) = query.name.filter(|n| !n.is_empty()) {
        return Ok(template_response(service.find_by_name(&name).await?));
    }
    let bodies: Vec<_> = service
        .list_templates()
        .await?
        .into_iter()
        .map(|t| t.body)
        .collect();
    Ok(Json(bodies).into_response())
}

/// GET /v1/templates/manifest
async fn get_manifest<S, L>(State(service): Shared<S, L>) -> Result<Response, ResolveError>
where
    S: TemplateStore,
    L: AttestationSource,
{
    Ok(match service.manifest().await? {
        Some(manifest) => Json(manifest).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// GET /v1/templates/:id
async fn get_template<S, L>(
    State(service): Shared<S, L>,
    Path(id): Path<String>,
) -> Result<Response, ResolveError>
where
    S: TemplateStore,
    L: AttestationSource,
{
    Ok(template_response(service.find_by_id(&id).await?))
}

/// GET /v1/templates/:id/auditors?network=
async fn template_auditors<S, L>(
    State(service): Shared<S, L>,
    Path(id): Path<String>,
    Query(query): Query<NetworkQuery>,
) -> Result<Response, ResolveError>
where
    S: TemplateStore,
    L: AttestationSource,
{
    let network = required(query.network, "network")?;
    Ok(Json(service.auditors_of(&id, &network).await?).into_response())
}

/// POST /v1/templates/search
async fn search_template<S, L>(
    State(service): Shared<S, L>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Response, ResolveError>
where
    S: TemplateStore,
    L: AttestationSource,
{
    let Json(request) = body.map_err(|e| ResolveError::MalformedInput(e.body_text()))?;
    let cadence = required(request.cadence_base64, "cadence_base64")?;
    let network = required(request.network, "network")?;
    Ok(template_response(
        service.find_by_source_base64(&cadence, &network).await?,
    ))
}

/// GET /v1/auditors?network=
async fn list_auditors<S, L>(
    State(service): Shared<S, L>,
    Query(query): Query<NetworkQuery>,
) -> Result<Response, ResolveError>
where
    S: TemplateStore,
    L: AttestationSource,
{
    let network = required(query.network, "network")?;
    Ok(Json(service.auditors(&network).await?).into_response())
}

/// GET /v1/auditors/:address/audits?network=
async fn auditor_audits<S, L>(
    State(service): Shared<S, L>,
    Path(address): Path<String>,
    Query(query): Query<NetworkQuery>,
) -> Result<Response, ResolveError>
where
    S: TemplateStore,
    L: AttestationSource,
{
    let network = required(query.network, "network")?;
    Ok(Json(service.audited_template_ids(&address, &network).await?).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use base64::Engine as _;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auditors::AuditorRegistry;
    use crate::ledger::{AttestationQueryError, AttestationSet};
    use crate::network::Network;
    use crate::template::{template_from_flix, AliasTable, InMemoryTemplateStore};

    const SOURCE: &str = "access(all) fun main(): Int { return 1 }";

    struct FixedLedger;

    #[async_trait]
    impl AttestationSource for FixedLedger {
        async fn attestations_of(
            &self,
            address: &str,
            _network: Network,
        ) -> Result<AttestationSet, AttestationQueryError> {
            match address {
                "0x01" => Ok(AttestationSet::from_iter(["tmpl-1"])),
                _ => Err(AttestationQueryError::Decode("no audit manager".into())),
            }
        }
    }

    fn app() -> Router {
        let template = template_from_flix(
            json!({ "id": "tmpl-1", "data": { "cadence": SOURCE } }),
            &HashMap::new(),
        )
        .expect("ingest");
        let store = InMemoryTemplateStore::from_templates([template]).expect("store");
        let aliases = AliasTable::from_json(r#"{ "get-one": "tmpl-1" }"#).expect("aliases");
        let registry = AuditorRegistry::from_json(
            r#"{ "testnet": [ { "address": "0x01", "name": "One" }, { "address": "0x02", "name": "Two" } ] }"#,
        )
        .expect("registry");
        let service = ResolutionService::new(
            Arc::new(store),
            Arc::new(FixedLedger),
            Arc::new(aliases),
            Arc::new(registry),
        );
        router(Arc::new(service))
    }

    async fn call(request: Request<Body>) -> (StatusCode, Option<Value>) {
        let response = app().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).ok())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn search(body: Value) -> Request<Body> {
        Request::post("/v1/templates/search")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_template_by_id() {
        let (status, body) = call(get("/v1/templates/tmpl-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["id"], "tmpl-1");

        let (status, _) = call(get("/v1/templates/missing")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_template_by_name() {
        let (status, body) = call(get("/v1/templates?name=get-one")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["id"], "tmpl-1");

        let (status, _) = call(get("/v1/templates?name=nobody")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_empty_name_lists_all() {
        let (status, body) = call(get("/v1/templates?name=")).await;
        assert_eq!(status, StatusCode::OK);
        let body = body.unwrap();
        assert_eq!(body.as_array().map(|a| a.len()), Some(1));
        assert_eq!(body[0]["id"], "tmpl-1");
    }

    #[tokio::test]
    async fn test_manifest_route_not_shadowed_by_id() {
        let (status, body) = call(get("/v1/templates/manifest")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.unwrap().get("tmpl-1").is_some());
    }

    #[tokio::test]
    async fn test_search_by_reformatted_source() {
        let cadence = base64::engine::general_purpose::STANDARD
            .encode("access(all)   fun main() : Int {\n  return 1 // one\n}");
        let (status, body) =
            call(search(json!({ "cadence_base64": cadence, "network": "testnet" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap()["id"], "tmpl-1");
    }

    #[tokio::test]
    async fn test_search_rejects_bad_input() {
        let (status, _) = call(search(json!({ "network": "testnet" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let cadence = base64::engine::general_purpose::STANDARD.encode("fun main() {");
        let (status, _) =
            call(search(json!({ "cadence_base64": cadence, "network": "testnet" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let cadence = base64::engine::general_purpose::STANDARD.encode(SOURCE);
        let (status, _) =
            call(search(json!({ "cadence_base64": cadence, "network": "devnet" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_template_auditors_skips_failing_auditor() {
        let (status, body) = call(get("/v1/templates/tmpl-1/auditors?network=testnet")).await;
        assert_eq!(status, StatusCode::OK);
        let body = body.unwrap();
        let addresses: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["address"].as_str().unwrap())
            .collect();
        assert_eq!(addresses, vec!["0x01"]);
    }

    #[tokio::test]
    async fn test_network_required() {
        let (status, _) = call(get("/v1/templates/tmpl-1/auditors")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(get("/v1/auditors?network=mainnet")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auditor_audits() {
        let (status, body) = call(get("/v1/auditors/0x01/audits?network=testnet")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.unwrap(), json!(["tmpl-1"]));

        let (status, _) = call(get("/v1/auditors/0x02/audits?network=testnet")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = call(get("/v2/templates")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
