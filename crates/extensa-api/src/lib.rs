//! # extensa-api
//!
//! HTTP API layer for Extensa built on Axum.
//!
//! Provides the lifecycle and permission endpoints, the catch-all that
//! forwards `/extensions/*` requests into the runtime route table,
//! principal resolution, middleware (request logging, CORS, tracing), DTOs
//! and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use extractors::{AuthPrincipal, HeaderPrincipalResolver, PrincipalResolver};
pub use state::AppState;
