//! Server configuration loaded from the process environment.

use thiserror::Error;

/// Configuration read once at startup and shared read-only across requests.
#[derive(Clone, Debug)]
pub struct Config {
    /// The socket address the server binds to.
    pub address: String,

    /// The PostgreSQL connection URL.
    pub database_url: String,

    /// The reCAPTCHA secret key used for server-side token verification.
    ///
    /// `None` means the deployment is misconfigured. The server still starts
    /// so the fault is reported per request as a configuration error rather
    /// than silently defaulted.
    pub recaptcha_secret: Option<String>,
}

/// An error loading the [`Config`] from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable was missing or invalid.
    #[error("environment variable `{0}` should be set")]
    MissingVar(&'static str),
}

impl Config {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails if `ADDRESS` or `DATABASE_URL` is unset. A missing
    /// `RECAPTCHA_SECRET_KEY` is not an error here; it surfaces as a
    /// per-request configuration failure instead.
    pub fn from_env() -> Result<Self, ConfigError> {
        let address = dotenvy::var("ADDRESS").map_err(|_| ConfigError::MissingVar("ADDRESS"))?;

        let database_url =
            dotenvy::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

        let recaptcha_secret = dotenvy::var("RECAPTCHA_SECRET_KEY")
            .ok()
            .filter(|secret| !secret.is_empty());

        if recaptcha_secret.is_none() {
            tracing::error!(
                "environment variable `RECAPTCHA_SECRET_KEY` is not set; \
                 all submissions will fail with a configuration error"
            );
        }

        Ok(Self {
            address,
            database_url,
            recaptcha_secret,
        })
    }
}
