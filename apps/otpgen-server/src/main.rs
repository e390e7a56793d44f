mod config;
mod routes;
mod state;

use otpgen::TotpEngine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let shared_state = state::AppState::new(TotpEngine::new());
    let app = routes::app(shared_state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        timeout_secs = config.request_timeout.as_secs(),
        body_limit = config.body_limit,
        "listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;
    Ok(())
}
