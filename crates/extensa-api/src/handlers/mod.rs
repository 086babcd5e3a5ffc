//! HTTP request handlers organized by domain.

pub mod dispatch;
pub mod extension;
pub mod health;
pub mod permission;
