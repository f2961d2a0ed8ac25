//! Server-side verification of reCAPTCHA tokens.

use std::future::Future;
use std::net::IpAddr;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// The reCAPTCHA verification API endpoint.
const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// The minimum confidence score an otherwise-successful verification must
/// report to be accepted. A response without a score is accepted as-is.
const MIN_SCORE: f64 = 0.5;

/// The seam between the submission pipeline and the verification provider,
/// so tests can substitute a fake provider.
pub trait VerifyToken {
    /// Verifies a client-supplied token against the provider.
    ///
    /// Issues exactly one outbound request; never retries.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be sent, the provider responds with a
    /// non-success status, or the response body isn't valid JSON.
    fn verify(
        &self,
        secret: &str,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> impl Future<Output = Result<VerificationOutcome, VerifyError>> + Send;
}

/// An error calling the verification provider.
///
/// These are transport-level faults, distinct from a policy rejection: the
/// pipeline maps them to its generic internal outcome.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The outbound request failed, returned a non-2xx status, or the body
    /// couldn't be read as JSON.
    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was JSON but not a recognizable provider response.
    #[error("malformed verification response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The provider's verdict on one token, parsed once at the response boundary
/// so downstream logic never re-checks field presence.
#[derive(Clone, Debug)]
pub struct VerificationOutcome {
    /// Whether the provider reported the token as valid.
    ///
    /// A response missing this field counts as unsuccessful.
    pub success: bool,

    /// The provider's confidence score in `[0, 1]`, if it reported one.
    /// Higher means more likely human.
    pub score: Option<f64>,

    /// Provider error codes explaining an unsuccessful verification.
    pub error_codes: Option<Vec<String>>,

    /// The full response body, surfaced as diagnostic detail on rejection.
    pub raw: Value,
}

/// The provider response fields the acceptance policy reads.
#[derive(Deserialize, Debug)]
struct ProviderResponse {
    /// Whether the token verified. Absent means failure.
    #[serde(default)]
    success: bool,

    /// The confidence score, reported by score-based providers only.
    score: Option<f64>,

    /// Machine-readable failure codes.
    #[serde(rename = "error-codes")]
    error_codes: Option<Vec<String>>,
}

impl VerificationOutcome {
    /// Parses a raw provider response body, keeping the original JSON for
    /// rejection diagnostics.
    ///
    /// # Errors
    ///
    /// Fails if the body isn't a JSON object shaped like a provider response.
    pub fn from_raw(raw: Value) -> Result<Self, serde_json::Error> {
        let fields: ProviderResponse = serde_json::from_value(raw.clone())?;

        Ok(Self {
            success: fields.success,
            score: fields.score,
            error_codes: fields.error_codes,
            raw,
        })
    }

    /// Applies the acceptance policy: the provider must report success, and
    /// any reported score must be at least [`MIN_SCORE`]. The threshold is
    /// fixed, not configurable at runtime.
    pub fn accepted(&self) -> bool {
        self.success && self.score.map_or(true, |score| score >= MIN_SCORE)
    }
}

/// A verification client backed by the real reCAPTCHA API.
#[derive(Clone, Debug)]
pub struct RecaptchaClient {
    /// The shared HTTP client.
    http: reqwest::Client,

    /// The verification endpoint. Only tests point this elsewhere.
    endpoint: String,
}

impl RecaptchaClient {
    /// Creates a client against the production verification endpoint.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: SITEVERIFY_URL.to_owned(),
        }
    }

    /// Creates a client against a custom endpoint, for tests.
    pub fn with_endpoint(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

impl Default for RecaptchaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifyToken for RecaptchaClient {
    async fn verify(
        &self,
        secret: &str,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<VerificationOutcome, VerifyError> {
        let mut params = vec![("secret", secret.to_owned()), ("response", token.to_owned())];

        if let Some(ip) = remote_ip {
            params.push(("remoteip", ip.to_string()));
        }

        let raw: Value = self
            .http
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(VerificationOutcome::from_raw(raw)?)
    }
}
