//! The HTTP API: shared request plumbing and the three transport adapters,
//! all encoding outcomes of the one submission pipeline.

pub mod callable;
pub mod cors;
pub mod direct;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::ConnectInfo,
    http::StatusCode,
    routing::{any, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{captcha::VerifyToken, config::Config, db::StoreSubmission};

/// Read-only state shared by all request handlers, generic over the
/// verifier and store seams so tests can run the router against fakes.
#[derive(Clone, Debug)]
pub struct AppState<V, W> {
    /// The server configuration, loaded once at startup.
    pub config: Arc<Config>,

    /// The token verification client.
    pub verifier: V,

    /// The submission store.
    pub store: W,
}

/// Builds the API router over the given state.
pub fn router<V, W>(state: AppState<V, W>) -> Router
where
    V: VerifyToken + Clone + Send + Sync + 'static,
    W: StoreSubmission + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/submit", post(direct::post::<V, W>))
        .route("/rpc/submit", post(callable::post::<V, W>))
        .route("/widget/submit", any(cors::handle::<V, W>))
        .fallback(|| async {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "route_not_found" })),
            )
        })
        .with_state(state)
}

/// Parses a request body as JSON, treating an absent or unparseable body as
/// null so it fails the request gate instead of leaking a framework
/// rejection in a shape the adapter doesn't document.
fn parse_lenient(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// Extracts the caller's network address, when the transport provides one,
/// for the verification provider's `remoteip` field.
fn remote_ip(connect_info: Option<ConnectInfo<SocketAddr>>) -> Option<IpAddr> {
    connect_info.map(|ConnectInfo(address)| address.ip())
}
