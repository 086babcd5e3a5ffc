//! # extensa-entity
//!
//! Domain entity models for Extensa: installed extensions and their
//! manifests, graded permission rows, principals, and audit events.

pub mod audit;
pub mod extension;
pub mod permission;
pub mod user;
