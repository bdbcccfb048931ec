//! HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Evaluation routes are nested under `/api/v1/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS → 2. Trace → 3. Access log

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the service router around a pre-constructed context.
pub fn api_router(ctx: ApiContext) -> Router {
    let v1 = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/catalog", get(endpoints::catalog::list))
        .route("/analyze", post(endpoints::analyze::analyze))
        .route(
            "/analyze-with-explanation",
            post(endpoints::analyze::analyze_with_explanation),
        )
        .route("/analyze-panel", post(endpoints::analyze::analyze_panel))
        .with_state(ctx);

    Router::new()
        .route("/", get(endpoints::health::welcome))
        .nest("/api/v1", v1)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
}
