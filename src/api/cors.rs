//! The browser-facing adapter: `POST /widget/submit` with CORS negotiation
//! for the frontend origins that embed the submission widget.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
        },
        HeaderMap, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    captcha::VerifyToken,
    db::StoreSubmission,
    submission::{self, GateError, Outcome},
};

use super::AppState;

/// The frontend origins allowed to read responses cross-origin, plus local
/// development origins. Advisory only: a disallowed origin still reaches the
/// pipeline, its response just lacks the permissive CORS header.
const ALLOWED_ORIGINS: &[&str] = &[
    "https://formgate.app",
    "https://www.formgate.app",
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
];

/// Handles every method on the widget route: preflight short-circuits before
/// the pipeline, POST runs it, anything else is a 405.
pub async fn handle<V, W>(
    State(state): State<AppState<V, W>>,
    method: Method,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Response
where
    V: VerifyToken + Clone + Send + Sync + 'static,
    W: StoreSubmission + Clone + Send + Sync + 'static,
{
    let origin = headers
        .get(ORIGIN)
        .and_then(|origin| origin.to_str().ok())
        .map(ToOwned::to_owned);

    if method == Method::OPTIONS {
        return preflight(origin.as_deref());
    }

    if method != Method::POST {
        // The 405 path is the one response without the CORS header.
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": "Method Not Allowed" })),
        )
            .into_response();
    }

    let body = super::parse_lenient(&body);

    let outcome = submission::process(
        &state.config,
        &state.verifier,
        &state.store,
        &body,
        super::remote_ip(connect_info),
    )
    .await;

    let mut response = encode(outcome);

    if let Some(origin) = origin.filter(|origin| allowed(origin)) {
        response.headers_mut().insert(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_str(&origin).unwrap_or(HeaderValue::from_static("*")),
        );
    }

    response
}

/// Answers a CORS preflight: echoes the requesting origin (wildcard when
/// absent) and the fixed method/header allow-list, with no body.
fn preflight(origin: Option<&str>) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();

    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        origin
            .and_then(|origin| HeaderValue::from_str(origin).ok())
            .unwrap_or(HeaderValue::from_static("*")),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );

    response
}

/// Returns whether an origin is on the fixed allow-list.
fn allowed(origin: &str) -> bool {
    ALLOWED_ORIGINS.contains(&origin)
}

/// Encodes a pipeline outcome into this adapter's human-readable wire format.
fn encode(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Accepted => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Outcome::BadRequest(GateError::MissingToken) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing reCAPTCHA token" })),
        )
            .into_response(),
        Outcome::BadRequest(GateError::MissingPayload) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing payload" })),
        )
            .into_response(),
        Outcome::NotConfigured => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "reCAPTCHA secret not configured" })),
        )
            .into_response(),
        Outcome::Rejected { details } => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "reCAPTCHA verification failed", "details": details })),
        )
            .into_response(),
        Outcome::Internal => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal error" })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_covers_production_and_dev_origins() {
        assert!(allowed("https://formgate.app"), "production origin");
        assert!(allowed("http://localhost:5173"), "dev origin");
        assert!(!allowed("https://evil.example"), "unknown origin");
        assert!(
            !allowed("https://formgate.app.evil.example"),
            "prefix-sharing origin shouldn't match",
        );
    }

    #[test]
    fn preflight_echoes_the_origin() {
        let response = preflight(Some("https://anywhere.example"));

        assert_eq!(response.status(), StatusCode::NO_CONTENT, "preflight status");
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://anywhere.example",
            "preflight should echo the requesting origin",
        );
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_METHODS],
            "POST, OPTIONS",
            "method allow-list",
        );
    }

    #[test]
    fn preflight_without_origin_uses_wildcard() {
        let response = preflight(None);

        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "*",
            "no origin should echo a wildcard",
        );
    }
}
