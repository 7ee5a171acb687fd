//! Inspection instances: one dated occurrence of a template against a
//! department.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{DepartmentId, InspectorId, InstanceId, TemplateId};
use crate::status::InspectionStatus;

/// How an instance came to exist.
///
/// The duplicate-period uniqueness constraint applies only to sweep-created
/// rows; administrators may deliberately add ad hoc inspections for a
/// period that already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceOrigin {
    /// Created by the recurrence sweep.
    Sweep,
    /// Created on demand by an administrator.
    Manual,
}

/// One scheduled occurrence of a template.
///
/// `inspector_id` is `None` when the sweep created the instance for a
/// department whose recurrence policy names no default inspector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionInstance {
    pub id: InstanceId,
    pub template_id: TemplateId,
    pub department_id: DepartmentId,
    pub inspector_id: Option<InspectorId>,
    pub due_date: NaiveDate,
    pub completed_at: Option<DateTime<Utc>>,
    pub origin: InstanceOrigin,
    pub created_at: DateTime<Utc>,
}

impl InspectionInstance {
    /// Sort key for listings: status priority first (overdue before
    /// due-soon before pending before completed), then due date ascending.
    pub fn sort_key(&self, status: InspectionStatus) -> (InspectionStatus, NaiveDate) {
        (status, self.due_date)
    }
}

/// Payload handed to the instance store; the store assigns nothing, the
/// scheduler mints the id and creation timestamp so each insert is a
/// self-contained unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInstance {
    pub id: InstanceId,
    pub template_id: TemplateId,
    pub department_id: DepartmentId,
    pub inspector_id: Option<InspectorId>,
    pub due_date: NaiveDate,
    pub origin: InstanceOrigin,
    pub created_at: DateTime<Utc>,
}

impl NewInstance {
    pub fn into_instance(self) -> InspectionInstance {
        InspectionInstance {
            id: self.id,
            template_id: self.template_id,
            department_id: self.department_id,
            inspector_id: self.inspector_id,
            due_date: self.due_date,
            completed_at: None,
            origin: self.origin,
            created_at: self.created_at,
        }
    }
}

/// An instance enriched with its derived status, as served to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionWithStatus {
    #[serde(flatten)]
    pub instance: InspectionInstance,
    pub status: InspectionStatus,
}
