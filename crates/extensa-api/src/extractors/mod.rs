//! Custom Axum extractors.

pub mod auth;
pub mod path;
pub mod principal;

pub use auth::AuthPrincipal;
pub use principal::{HeaderPrincipalResolver, PrincipalResolver};
