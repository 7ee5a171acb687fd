//! HTTP surface for the Rounds inspection platform.
//!
//! Thin axum binding over `rounds-core`: bearer-token auth resolves the
//! caller to an authorization scope per request, handlers delegate to the
//! service layer, and a background task drives the recurrence sweep.

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweep_task;

pub use config::{Config, ConfigLoad};
pub use errors::{AppError, AppResult};
pub use state::AppState;
