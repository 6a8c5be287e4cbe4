//! docmind API crate - axum HTTP surface over the document pipelines.
//!
//! Exposes document upload, owner-scoped search, agent answers and
//! deletion behind bearer-token auth, plus a public health check.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
