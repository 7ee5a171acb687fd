//! Core library for the Rounds inspection platform.
//!
//! Ties together the four load-bearing pieces beneath the HTTP surface:
//!
//! - scope resolution ([`scope`]): role → organizational subtree filter,
//!   evaluated once per request;
//! - persistence boundaries ([`store`]): async traits with Postgres and
//!   in-memory implementations;
//! - recurrence scheduling ([`scheduler`]): on-demand creation and the
//!   idempotent sweep;
//! - the access-controlled query layer ([`service`]): scope-filtered
//!   listings and invariant-checked mutations, with best-effort auditing.
#![allow(missing_docs)]

pub mod audit;
pub mod clock;
pub mod error;
pub mod scheduler;
pub mod scope;
pub mod service;
pub mod store;

pub use audit::{AuditEntry, AuditSink, TracingAuditSink};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, Result};
pub use scheduler::{RecurrenceScheduler, SweepFailure, SweepOutcome};
pub use scope::{AuthContext, Scope, resolve_scope};
pub use service::{CreateOnDemand, InspectionService, StatusCounts};
pub use store::{
    DirectoryStore, InstanceStore, ReportStore, SessionStore,
    memory::{MemoryAuditSink, MemoryBackend, MemorySessionStore, MemoryStore},
    postgres::PgStore,
};

/// Embedded schema migrations, applied by the server at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
