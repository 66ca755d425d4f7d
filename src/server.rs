//! HTTP surface: router construction, handlers, and the serve loop.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::v2_models::StatementResponse;
use crate::api_client::v2_client::V2Client;
use crate::config::RelayConfig;
use crate::cors::{self, OriginPolicy};
use crate::error::RelayError;
use crate::service::QueryRelay;

/// Shared, read-only state handed to every handler.
pub struct AppState {
    pub relay: QueryRelay,
}

#[derive(Debug, Default, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    sql: Option<String>,
}

/// Owns the routing table; the outbound client lives inside the relay.
pub struct RelayServer {
    router: Router,
}

impl RelayServer {
    pub fn new(relay: QueryRelay, policy: OriginPolicy) -> Self {
        Self {
            router: build_router(Arc::new(AppState { relay }), Arc::new(policy)),
        }
    }

    /// Wires a live Databricks client from process configuration.
    pub fn from_config(config: &RelayConfig) -> Self {
        let client = V2Client::new(config.host(), config.token())
            .with_request_timeout(config.request_timeout());
        let relay = QueryRelay::new(Arc::new(client), config.warehouse(), config.poll_settings());
        Self::new(relay, config.origin_policy())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Binds `addr` and serves until Ctrl-C.
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Relay listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

/// Build the application router with CORS enforcement in front of every route.
pub fn build_router(state: Arc<AppState>, policy: Arc<OriginPolicy>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health-origin", get(health_origin))
        .route("/query", post(query))
        .with_state(state)
        .layer(cors::cors_layer(policy.clone()))
        .layer(middleware::from_fn_with_state(
            policy,
            cors::reject_disallowed_origin,
        ))
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn health_origin(headers: HeaderMap) -> Json<Value> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    Json(json!({ "ok": true, "origin": origin }))
}

/// POST /query
///
/// The body is parsed leniently: a missing, non-JSON, or SQL-less body all
/// end up as "Missing SQL".
async fn query(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<StatementResponse>, RelayError> {
    let request: QueryRequest = serde_json::from_slice(&body).unwrap_or_default();
    let sql = request
        .sql
        .filter(|s| !s.is_empty())
        .ok_or_else(RelayError::missing_sql)?;

    let resp = state.relay.submit_query(&sql).await?;
    Ok(Json(resp))
}
