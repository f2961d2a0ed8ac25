//! Formgate's backend web server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use formgate::{
    api::{self, AppState},
    captcha::RecaptchaClient,
    config::Config,
    db::{self, SubmissionStore},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// # Errors
///
/// See implementation.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("info")
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");

    let pool = db::initialize(&config.database_url).await?;

    let address = config.address.clone();

    let state = AppState {
        config: Arc::new(config),
        verifier: RecaptchaClient::new(),
        store: SubmissionStore::new(pool),
    };

    tracing::info!("Listening to {address}...");

    let listener = TcpListener::bind(&address).await?;

    tracing::info!("Ready!");

    axum::serve(
        listener,
        api::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
