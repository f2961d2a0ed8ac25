//! The submission pipeline shared by every transport adapter: request gate,
//! token verification, then the store write.

use std::net::IpAddr;

use serde_json::{Map, Value};

use crate::{captcha::VerifyToken, config::Config, db::StoreSubmission};

/// A validated submission: a challenge token and the payload to persist.
///
/// Lives only for the duration of one invocation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SubmissionRequest {
    /// The client-supplied verification token. Never empty.
    pub token: String,

    /// The form payload to persist. Contents are not schema-checked.
    pub payload: Map<String, Value>,
}

/// A rejection from the request gate.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum GateError {
    /// The `token` field was missing or empty.
    MissingToken,

    /// The `payload` field was missing, null, or not an object.
    MissingPayload,
}

/// The terminal outcome of one pipeline invocation. Each adapter encodes
/// these into its own wire format; the business rules live here only.
#[derive(Clone, PartialEq, Debug)]
pub enum Outcome {
    /// The submission was verified and durably stored.
    Accepted,

    /// The request body failed the gate; the caller can fix and resubmit.
    BadRequest(GateError),

    /// The verification secret isn't configured. A deployment fault, not
    /// something the caller can recover from.
    NotConfigured,

    /// The provider declined the token, or reported a confidence score below
    /// the threshold. `details` is the provider's raw response body.
    Rejected {
        /// The provider's full response, surfaced as diagnostic detail.
        details: Value,
    },

    /// A verification transport fault or a store write failure. Reported to
    /// callers opaquely; specifics go to the server log only.
    Internal,
}

/// Validates the shape of a raw request body.
///
/// The token is checked before the payload, so a doubly-invalid request
/// always reports the missing token. No side effects.
///
/// # Errors
///
/// Returns the first gate check that failed.
pub fn gate(body: &Value) -> Result<SubmissionRequest, GateError> {
    let token = body
        .get("token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or(GateError::MissingToken)?;

    let payload = body
        .get("payload")
        .and_then(Value::as_object)
        .ok_or(GateError::MissingPayload)?;

    Ok(SubmissionRequest {
        token: token.to_owned(),
        payload: payload.clone(),
    })
}

/// Runs one submission through the pipeline: configuration check, request
/// gate, verification call, then the store write. Each stage short-circuits
/// to a terminal outcome on failure, and no stage is retried.
pub async fn process<V: VerifyToken + Sync, W: StoreSubmission + Sync>(
    config: &Config,
    verifier: &V,
    store: &W,
    body: &Value,
    remote_ip: Option<IpAddr>,
) -> Outcome {
    let Some(secret) = config.recaptcha_secret.as_deref() else {
        tracing::error!("submission refused: reCAPTCHA secret is not configured");
        return Outcome::NotConfigured;
    };

    let request = match gate(body) {
        Ok(request) => request,
        Err(error) => return Outcome::BadRequest(error),
    };

    let verification = match verifier.verify(secret, &request.token, remote_ip).await {
        Ok(verification) => verification,
        Err(error) => {
            tracing::error!(%error, "verification call failed");
            return Outcome::Internal;
        }
    };

    if !verification.accepted() {
        tracing::warn!(
            success = verification.success,
            score = ?verification.score,
            error_codes = ?verification.error_codes,
            "verification rejected the token",
        );
        return Outcome::Rejected {
            details: verification.raw,
        };
    }

    if let Err(error) = store.append(&request.payload).await {
        tracing::error!(%error, "failed to store accepted submission");
        return Outcome::Internal;
    }

    tracing::debug!("submission stored");

    Outcome::Accepted
}
