//! General database handling and the submission store.

use std::future::Future;

use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

/// Initializes the SQLx database pool and runs pending database migrations,
/// returning the pool once complete.
///
/// # Errors
///
/// Returns an error if the initial database connection or its migrations fail.
pub async fn initialize(db_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new().connect(db_url).await?;

    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}

/// An error appending a submission to the store.
///
/// Credential, permission, and transient store faults all land here; the
/// pipeline reports them uniformly as its generic internal outcome.
#[derive(Error, Debug)]
#[error("submission write failed: {0}")]
pub struct StoreError(#[from] sqlx::Error);

/// The seam between the submission pipeline and the document store, so tests
/// can substitute an in-memory store.
pub trait StoreSubmission {
    /// Appends one accepted payload as a new document.
    ///
    /// Exactly one write, no read-before-write, no uniqueness check: two
    /// identical payloads produce two documents. All-or-nothing from the
    /// caller's view.
    ///
    /// # Errors
    ///
    /// Fails if the write doesn't complete; no document exists afterwards.
    fn append(
        &self,
        payload: &Map<String, Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// The submission store backed by the `form_submissions` table.
#[derive(Clone, Debug)]
pub struct SubmissionStore {
    /// The shared connection pool.
    pool: PgPool,
}

impl SubmissionStore {
    /// Creates a store over an initialized pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl StoreSubmission for SubmissionStore {
    async fn append(&self, payload: &Map<String, Value>) -> Result<(), StoreError> {
        // The database clock assigns `submittedAt`, concatenated after the
        // payload so a client-supplied field of the same name is overwritten.
        sqlx::query(
            "INSERT INTO form_submissions (document)
                VALUES ($1::jsonb || jsonb_build_object('submittedAt', now()))",
        )
        .bind(Value::Object(payload.clone()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
