//! Recurring instance generation.
//!
//! Two entry points: on-demand creation (never idempotent, administrators
//! may deliberately add ad hoc inspections) and the scheduled sweep
//! (idempotent under repetition and overlap). The sweep's duplicate
//! protection is the store's uniqueness guarantee, not a pre-check here:
//! a [`CoreError::Conflict`] coming back from the insert simply means a
//! concurrent invocation won the period, and is treated as a no-op.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rounds_model::{
    DepartmentId, InspectorId, InspectionInstance, InstanceId,
    InstanceOrigin, MasterTemplate, NewInstance, TemplateAssignment,
    TemplateId,
};

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::store::{DirectoryStore, InstanceStore};

/// One pair the sweep could not process; the sweep carries on regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub template_id: TemplateId,
    pub department_id: DepartmentId,
    pub error: String,
}

/// Aggregate result of one sweep pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepOutcome {
    /// Instances created this pass.
    pub created: Vec<InspectionInstance>,
    /// Pairs whose new instance has no inspector because the recurrence
    /// policy names no default for the department. The instance exists;
    /// an administrator needs to assign it.
    pub unassigned: Vec<(TemplateId, DepartmentId)>,
    /// Pairs that failed; each is an independent unit of work.
    pub failures: Vec<SweepFailure>,
}

pub struct RecurrenceScheduler {
    directory: Arc<dyn DirectoryStore>,
    instances: Arc<dyn InstanceStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RecurrenceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecurrenceScheduler").finish_non_exhaustive()
    }
}

impl RecurrenceScheduler {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        instances: Arc<dyn InstanceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            instances,
            clock,
        }
    }

    /// Create one ad hoc instance.
    ///
    /// When `due_date` is omitted the template's cadence is applied to the
    /// latest existing instance for the pair, or to today when none
    /// exists. Templates without a recurrence policy require an explicit
    /// due date.
    pub async fn create_instance(
        &self,
        template_id: TemplateId,
        department_id: DepartmentId,
        inspector_id: InspectorId,
        due_date: Option<NaiveDate>,
    ) -> Result<InspectionInstance> {
        let template = self
            .directory
            .find_template(template_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("template".into()))?;
        let department = self
            .directory
            .find_department(department_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("department".into()))?;
        if department.organization_id != template.organization_id {
            return Err(CoreError::InvalidAssignment(
                "department belongs to a different organization than the \
                 template"
                    .into(),
            ));
        }
        let inspector = self
            .directory
            .find_inspector(inspector_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("inspector".into()))?;
        if inspector.organization_id != Some(template.organization_id) {
            return Err(CoreError::InvalidAssignment(
                "inspector belongs to a different organization than the \
                 template"
                    .into(),
            ));
        }

        let now = self.clock.now();
        let due_date = match due_date {
            Some(date) => date,
            None => {
                let cadence = template
                    .recurrence
                    .as_ref()
                    .map(|p| p.cadence)
                    .ok_or_else(|| {
                        CoreError::Invalid(
                            "template has no recurrence policy; a due date \
                             is required"
                                .into(),
                        )
                    })?;
                let latest = self
                    .instances
                    .latest_for(template_id, department_id)
                    .await?;
                match latest {
                    Some(prev) => cadence.next_after(prev.due_date),
                    None => cadence.next_after(now.date_naive()),
                }
            }
        };

        self.instances
            .insert(NewInstance {
                id: InstanceId::new(),
                template_id,
                department_id,
                inspector_id: Some(inspector_id),
                due_date,
                origin: InstanceOrigin::Manual,
                created_at: now,
            })
            .await
    }

    /// One scheduled pass: create every instance that is missing for the
    /// current period, across all active recurring templates.
    ///
    /// Safe to invoke repeatedly and concurrently for the same `now`; a
    /// period that already has an instance yields a store conflict which
    /// is swallowed as a no-op. A failure on one pair never aborts the
    /// rest, and every created instance is committed independently, so an
    /// externally imposed deadline merely truncates the remaining pairs.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<SweepOutcome> {
        let templates = self.directory.active_recurring_templates().await?;
        let today = now.date_naive();
        let mut outcome = SweepOutcome::default();

        for template in &templates {
            let Some(policy) = &template.recurrence else {
                continue;
            };
            for assignment in &policy.assignments {
                match self
                    .sweep_pair(template, assignment, today, now)
                    .await
                {
                    Ok(Some(instance)) => {
                        if instance.inspector_id.is_none() {
                            outcome.unassigned.push((
                                template.id,
                                assignment.department_id,
                            ));
                        }
                        outcome.created.push(instance);
                    }
                    Ok(None) => {}
                    Err(CoreError::Conflict(_)) => {
                        // Lost the period to a concurrent sweep; done.
                        debug!(
                            template = %template.id,
                            department = %assignment.department_id,
                            "period already occupied, skipping"
                        );
                    }
                    Err(err) => {
                        warn!(
                            template = %template.id,
                            department = %assignment.department_id,
                            error = %err,
                            "sweep pair failed"
                        );
                        outcome.failures.push(SweepFailure {
                            template_id: template.id,
                            department_id: assignment.department_id,
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Decide whether one (template, department) pair is missing an
    /// instance and create it if so.
    async fn sweep_pair(
        &self,
        template: &MasterTemplate,
        assignment: &TemplateAssignment,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<InspectionInstance>> {
        let cadence = template
            .recurrence
            .as_ref()
            .map(|p| p.cadence)
            .ok_or_else(|| {
                CoreError::Invalid("template has no recurrence policy".into())
            })?;

        // Manual ad hoc instances never occupy a period; plan off the
        // sweep's own lineage, matching the uniqueness constraint.
        let latest = self
            .instances
            .latest_sweep_for(template.id, assignment.department_id)
            .await?;

        let due_date = match latest {
            // First occurrence anchors on the sweep date itself.
            None => today,
            Some(prev) => {
                let mut next = cadence.next_after(prev.due_date);
                if next <= prev.due_date {
                    return Err(CoreError::Invalid(
                        "recurrence cadence does not advance the due date"
                            .into(),
                    ));
                }
                if next > today {
                    // The current period already has its instance.
                    return Ok(None);
                }
                // Catch up to the current period instead of backfilling
                // one instance per elapsed period.
                while cadence.next_after(next) <= today {
                    next = cadence.next_after(next);
                }
                next
            }
        };

        let inspector_id = self
            .verified_default_inspector(template, assignment)
            .await?;

        let instance = self
            .instances
            .insert(NewInstance {
                id: InstanceId::new(),
                template_id: template.id,
                department_id: assignment.department_id,
                inspector_id,
                due_date,
                origin: InstanceOrigin::Sweep,
                created_at: now,
            })
            .await?;
        Ok(Some(instance))
    }

    /// Re-check the assignment's default inspector against the template's
    /// organization at sweep time. A vanished or foreign inspector leaves
    /// the instance unassigned rather than handing work across tenants.
    async fn verified_default_inspector(
        &self,
        template: &MasterTemplate,
        assignment: &TemplateAssignment,
    ) -> Result<Option<InspectorId>> {
        let Some(inspector_id) = assignment.default_inspector_id else {
            return Ok(None);
        };
        match self.directory.find_inspector(inspector_id).await? {
            Some(inspector)
                if inspector.organization_id
                    == Some(template.organization_id) =>
            {
                Ok(Some(inspector_id))
            }
            _ => {
                warn!(
                    template = %template.id,
                    department = %assignment.department_id,
                    inspector = %inspector_id,
                    "default inspector missing or outside the template's \
                     organization, creating unassigned"
                );
                Ok(None)
            }
        }
    }
}
