//! The direct HTTP adapter: plain `POST /submit` with machine-readable
//! snake_case error codes.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    captcha::VerifyToken,
    db::StoreSubmission,
    submission::{self, GateError, Outcome},
};

use super::AppState;

/// Handles a submission over plain HTTP.
///
/// Non-POST methods never reach this handler; the method router answers them
/// with 405 and an `Allow: POST` header.
pub async fn post<V, W>(
    State(state): State<AppState<V, W>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> (StatusCode, Json<Value>)
where
    V: VerifyToken + Clone + Send + Sync + 'static,
    W: StoreSubmission + Clone + Send + Sync + 'static,
{
    let body = super::parse_lenient(&body);

    let outcome = submission::process(
        &state.config,
        &state.verifier,
        &state.store,
        &body,
        super::remote_ip(connect_info),
    )
    .await;

    encode(outcome)
}

/// Encodes a pipeline outcome into this adapter's wire format.
fn encode(outcome: Outcome) -> (StatusCode, Json<Value>) {
    match outcome {
        Outcome::Accepted => (StatusCode::OK, Json(json!({ "ok": true }))),
        Outcome::BadRequest(GateError::MissingToken) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing_recaptcha_token" })),
        ),
        Outcome::BadRequest(GateError::MissingPayload) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing_payload" })),
        ),
        Outcome::NotConfigured => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "server_not_configured" })),
        ),
        Outcome::Rejected { details } => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "recaptcha_failed", "details": details })),
        ),
        Outcome::Internal => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal" })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_encoding() {
        let cases = [
            (Outcome::Accepted, StatusCode::OK, json!({ "ok": true })),
            (
                Outcome::BadRequest(GateError::MissingToken),
                StatusCode::BAD_REQUEST,
                json!({ "error": "missing_recaptcha_token" }),
            ),
            (
                Outcome::BadRequest(GateError::MissingPayload),
                StatusCode::BAD_REQUEST,
                json!({ "error": "missing_payload" }),
            ),
            (
                Outcome::NotConfigured,
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "server_not_configured" }),
            ),
            (
                Outcome::Rejected {
                    details: json!({ "success": false }),
                },
                StatusCode::BAD_REQUEST,
                json!({ "error": "recaptcha_failed", "details": { "success": false } }),
            ),
            (
                Outcome::Internal,
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal" }),
            ),
        ];

        for (outcome, expected_status, expected_body) in cases {
            let (status, Json(response)) = encode(outcome);

            assert_eq!(status, expected_status, "status for {response}");
            assert_eq!(response, expected_body, "body mismatch");
        }
    }
}
