//! Best-effort audit trail.
//!
//! Every successful mutation emits an entry. Sinks are collaborators: a
//! failure to record is logged and swallowed, never propagated into the
//! domain write it describes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rounds_model::InspectorId;

use crate::error::Result;

/// One recorded action. Held deliberately flat: actor, verb, target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor_id: InspectorId,
    /// Dotted verb, e.g. `inspection.delete`.
    pub action: String,
    /// Entity kind the action targeted, e.g. `inspection`.
    pub entity_kind: String,
    pub entity_id: Uuid,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// Sink that writes entries to the tracing pipeline. Useful as a default
/// when no durable audit collaborator is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        tracing::info!(
            actor = %entry.actor_id,
            action = %entry.action,
            entity_kind = %entry.entity_kind,
            entity_id = %entry.entity_id,
            "audit"
        );
        Ok(())
    }
}
