//! The callable/RPC adapter: `POST /rpc/submit` speaking a structured-call
//! envelope. Requests wrap the call data as `{"data": {...}}`; responses are
//! `{"result": ...}` on success or `{"error": {"code", "message"}}` with a
//! callable status code otherwise.

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

/// Handles a submission call.
pub async fn post<V, W>(
    State(state): State<AppState<V, W>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> (StatusCode, Json<Value>)
where
    V: VerifyToken + Clone + Send + Sync + 'static,
    W: StoreSubmission + Clone + Send + Sync + 'static,
{
    let data = decode(super::parse_lenient(&body));

    let outcome = submission::process(
        &state.config,
        &state.verifier,
        &state.store,
        &data,
        super::remote_ip(connect_info),
    )
    .await;

    encode(outcome)
}

/// Unwraps the callable envelope. A body without a `data` field is treated
/// as the call data itself, for callers that skip the envelope.
fn decode(envelope: Value) -> Value {
    match envelope {
        Value::Object(mut envelope) if envelope.contains_key("data") => envelope
            .remove("data")
            .unwrap_or(Value::Null),
        envelope => envelope,
    }
}

/// Encodes a pipeline outcome as a callable response.
fn encode(outcome: Outcome) -> (StatusCode, Json<Value>) {
    match outcome {
        Outcome::Accepted => (StatusCode::OK, Json(json!({ "result": { "ok": true } }))),
        Outcome::NotConfigured => error(
            StatusCode::BAD_REQUEST,
            "failed-precondition",
            "reCAPTCHA secret not configured",
            None,
        ),
        Outcome::BadRequest(GateError::MissingToken) => error(
            StatusCode::BAD_REQUEST,
            "invalid-argument",
            "Missing reCAPTCHA token",
            None,
        ),
        Outcome::BadRequest(GateError::MissingPayload) => error(
            StatusCode::BAD_REQUEST,
            "invalid-argument",
            "Missing payload",
            None,
        ),
        Outcome::Rejected { details } => error(
            StatusCode::FORBIDDEN,
            "permission-denied",
            "reCAPTCHA verification failed",
            Some(details),
        ),
        Outcome::Internal => error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error", None),
    }
}

/// Builds a callable error response.
fn error(
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<Value>,
) -> (StatusCode, Json<Value>) {
    let mut body = json!({ "error": { "code": code, "message": message } });

    if let (Some(details), Some(error)) = (details, body["error"].as_object_mut()) {
        error.insert("details".to_owned(), details);
    }

    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_data_is_unwrapped() {
        let data = decode(json!({ "data": { "token": "t", "payload": {} } }));

        assert_eq!(data, json!({ "token": "t", "payload": {} }), "data should unwrap");
    }

    #[test]
    fn bare_body_is_treated_as_data() {
        let data = decode(json!({ "token": "t", "payload": {} }));

        assert_eq!(
            data,
            json!({ "token": "t", "payload": {} }),
            "an unenveloped body should pass through",
        );
    }

    #[test]
    fn outcome_encoding() {
        let (status, Json(body)) = encode(Outcome::Accepted);
        assert_eq!(status, StatusCode::OK, "acceptance should be 200");
        assert_eq!(body, json!({ "result": { "ok": true } }), "result envelope");

        let (status, Json(body)) = encode(Outcome::NotConfigured);
        assert_eq!(status, StatusCode::BAD_REQUEST, "failed-precondition maps to 400");
        assert_eq!(body["error"]["code"], "failed-precondition", "error code");

        let (status, Json(body)) = encode(Outcome::BadRequest(GateError::MissingToken));
        assert_eq!(status, StatusCode::BAD_REQUEST, "invalid-argument maps to 400");
        assert_eq!(body["error"]["code"], "invalid-argument", "error code");
        assert_eq!(body["error"]["message"], "Missing reCAPTCHA token", "message");

        let (status, Json(body)) = encode(Outcome::Rejected {
            details: json!({ "success": false, "error-codes": ["invalid-input-response"] }),
        });
        assert_eq!(status, StatusCode::FORBIDDEN, "permission-denied maps to 403");
        assert_eq!(body["error"]["code"], "permission-denied", "error code");
        assert_eq!(
            body["error"]["details"]["error-codes"][0],
            "invalid-input-response",
            "rejections should carry the provider detail",
        );

        let (status, Json(body)) = encode(Outcome::Internal);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "internal maps to 500");
        assert_eq!(body["error"]["code"], "internal", "error code");
    }
}
