//! # solace_core
//!
//! Core domain logic for Solace: emotion classification and triage,
//! credential hashing, and the access/refresh token lifecycle.

pub mod auth;
pub mod companion;
pub mod contacts;
pub mod emotion;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod mood;
pub mod settings;
pub mod triage;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
