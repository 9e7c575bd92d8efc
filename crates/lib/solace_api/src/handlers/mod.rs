//! Request handlers.

pub mod agent;
pub mod auth;
pub mod chat;
pub mod contacts;
pub mod emotion;
pub mod health;
pub mod mood;
