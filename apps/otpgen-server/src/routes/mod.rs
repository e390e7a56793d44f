use axum::{error_handling::HandleErrorLayer, extract::DefaultBodyLimit, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{config::ServerConfig, state::AppState};

mod error;
mod totp;

pub use error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(totp::router())
        .route("/health", get(|| async { "OK" }))
}

/// The full service: routes, transport limits and request tracing
pub fn app(state: AppState, config: &ServerConfig) -> Router {
    with_transport(router(), config).with_state(state)
}

// Body limit is enforced by the extractors so oversized requests still get a JSON error
fn with_transport<S>(router: Router<S>, config: &ServerConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(ApiError::from_transport))
                .timeout(config.request_timeout),
        )
        .layer(TraceLayer::new_for_http())
}
