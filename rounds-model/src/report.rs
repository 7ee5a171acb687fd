//! Execution reports. The core only inspects existence and item counts;
//! rendering and export live elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{InstanceId, ReportId};

/// The record that an inspection was (or is being) executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub instance_id: InstanceId,
    pub created_at: DateTime<Utc>,
}

/// One recorded checklist answer. Any report item marks the inspection as
/// started, which blocks deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportItem {
    pub id: Uuid,
    pub report_id: ReportId,
    pub checklist_item_id: Uuid,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}
