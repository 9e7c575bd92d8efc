//! Domain models shared between the core and the API layer.

pub mod auth;
