//! Master templates: reusable checklist definitions that generate
//! recurring inspection instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, Result};
use crate::ids::{OrganizationId, TemplateId};
use crate::recurrence::RecurrencePolicy;

/// One entry in a template's checklist. The item id is stable across
/// template edits so external correlation (QR labels, report items) keeps
/// working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub position: u32,
    pub prompt: String,
}

/// A reusable checklist definition owned by one organization.
///
/// Administrative edits never retroactively alter instances that already
/// reference the template; instances copy what they need at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterTemplate {
    pub id: TemplateId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub items: Vec<ChecklistItem>,
    /// Absent for templates that are only ever run on demand.
    pub recurrence: Option<RecurrencePolicy>,
    /// Inactive templates are skipped by the sweep but keep their history.
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplate {
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub items: Vec<ChecklistItem>,
    pub recurrence: Option<RecurrencePolicy>,
}

impl CreateTemplate {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::Invalid("template name cannot be empty".into()));
        }
        if let Some(policy) = &self.recurrence {
            policy.validate()?;
        }
        let mut positions: Vec<u32> = self.items.iter().map(|i| i.position).collect();
        positions.sort_unstable();
        positions.dedup();
        if positions.len() != self.items.len() {
            return Err(ModelError::Invalid(
                "checklist item positions must be unique".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::Cadence;

    fn item(position: u32) -> ChecklistItem {
        ChecklistItem {
            id: Uuid::new_v4(),
            position,
            prompt: format!("check {position}"),
        }
    }

    #[test]
    fn duplicate_positions_are_rejected() {
        let payload = CreateTemplate {
            organization_id: OrganizationId::new(),
            name: "Fire safety".into(),
            description: None,
            items: vec![item(1), item(1)],
            recurrence: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn recurrence_validation_is_applied() {
        let payload = CreateTemplate {
            organization_id: OrganizationId::new(),
            name: "Fire safety".into(),
            description: None,
            items: vec![item(1), item(2)],
            recurrence: Some(RecurrencePolicy {
                cadence: Cadence::Days(0),
                assignments: vec![],
            }),
        };
        assert!(payload.validate().is_err());
    }
}
