//! Router setup and server startup.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use docmind_core::error::DocmindError;

use crate::handlers;
use crate::state::AppState;

/// Build the router: `/health` is public, everything under `/documents`
/// requires a bearer token.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::health));

    let protected_routes = Router::new()
        .route("/documents", post(handlers::create_document))
        .route("/documents/search", get(handlers::search_documents))
        .route("/documents/search-ai", get(handlers::search_ai))
        .route("/documents/{id}", delete(handlers::delete_document))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
pub async fn start_server(addr: &str, state: AppState) -> Result<(), DocmindError> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "API server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
