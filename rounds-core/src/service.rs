//! Access-controlled query layer.
//!
//! Every operation takes an explicit [`Scope`] resolved at the request
//! edge, re-verifies containment server-side, and re-checks invariants
//! regardless of what the client already validated. Cross-tenant reads
//! surface as `NotFound` rather than `AccessDenied` so callers cannot
//! probe for the existence of other tenants' data.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use rounds_model::{
    DEFAULT_BUFFER_DAYS, DepartmentId, InspectorId, InspectionInstance,
    InspectionStatus, InspectionWithStatus, InstanceId, TemplateId,
    derive_status,
};

use crate::audit::{AuditEntry, AuditSink};
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::scheduler::RecurrenceScheduler;
use crate::scope::Scope;
use crate::store::{DirectoryStore, InstanceStore, ReportStore};

/// Parameters for an administrator's on-demand creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOnDemand {
    pub template_id: TemplateId,
    pub department_id: DepartmentId,
    pub inspector_id: InspectorId,
    pub due_date: Option<NaiveDate>,
}

/// Aggregate instance counts per status, the one read served to an
/// organization-unscoped super administrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub overdue: u64,
    pub due_soon: u64,
    pub pending: u64,
    pub completed: u64,
    pub total: u64,
}

pub struct InspectionService {
    directory: Arc<dyn DirectoryStore>,
    instances: Arc<dyn InstanceStore>,
    reports: Arc<dyn ReportStore>,
    audit: Arc<dyn AuditSink>,
    scheduler: RecurrenceScheduler,
    clock: Arc<dyn Clock>,
    buffer_days: i64,
}

impl std::fmt::Debug for InspectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspectionService")
            .field("buffer_days", &self.buffer_days)
            .finish_non_exhaustive()
    }
}

impl InspectionService {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        instances: Arc<dyn InstanceStore>,
        reports: Arc<dyn ReportStore>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let scheduler = RecurrenceScheduler::new(
            Arc::clone(&directory),
            Arc::clone(&instances),
            Arc::clone(&clock),
        );
        Self {
            directory,
            instances,
            reports,
            audit,
            scheduler,
            clock,
            buffer_days: DEFAULT_BUFFER_DAYS,
        }
    }

    /// Override the due-soon buffer window for this service's listings.
    pub fn with_buffer_days(mut self, buffer_days: i64) -> Self {
        self.buffer_days = buffer_days;
        self
    }

    pub fn scheduler(&self) -> &RecurrenceScheduler {
        &self.scheduler
    }

    /// List instances inside `scope`, enriched with derived status and
    /// ordered by status priority, then due date ascending.
    pub async fn list(
        &self,
        scope: &Scope,
    ) -> Result<Vec<InspectionWithStatus>> {
        if matches!(scope, Scope::AllOrganizations) {
            return Err(CoreError::AccessDenied(
                "instance listings require an organization scope".into(),
            ));
        }
        let now = self.clock.now();
        let mut listed: Vec<InspectionWithStatus> = self
            .instances
            .list(scope)
            .await?
            .into_iter()
            .map(|instance| {
                let status = derive_status(
                    instance.due_date,
                    instance.completed_at,
                    self.buffer_days,
                    now,
                );
                InspectionWithStatus { instance, status }
            })
            .collect();
        listed.sort_by_key(|i| i.instance.sort_key(i.status));
        Ok(listed)
    }

    /// Aggregate counts per status. The only read that accepts the
    /// organization-unscoped sentinel.
    pub async fn stats(&self, scope: &Scope) -> Result<StatusCounts> {
        let now = self.clock.now();
        let mut counts = StatusCounts::default();
        for instance in self.instances.list(scope).await? {
            let status = derive_status(
                instance.due_date,
                instance.completed_at,
                self.buffer_days,
                now,
            );
            match status {
                InspectionStatus::Overdue => counts.overdue += 1,
                InspectionStatus::DueSoon => counts.due_soon += 1,
                InspectionStatus::Pending => counts.pending += 1,
                InspectionStatus::Completed => counts.completed += 1,
            }
            counts.total += 1;
        }
        Ok(counts)
    }

    /// Delete an instance, provided it is inside `scope`, not completed,
    /// and has no recorded report items.
    pub async fn delete(
        &self,
        scope: &Scope,
        id: InstanceId,
        actor: InspectorId,
    ) -> Result<()> {
        let instance = self.fetch_in_scope(scope, id).await?;
        if instance.completed_at.is_some() {
            return Err(CoreError::PreconditionFailed(
                "completed inspections cannot be deleted".into(),
            ));
        }
        if self.reports.item_count(id).await? > 0 {
            return Err(CoreError::PreconditionFailed(
                "inspections with recorded progress cannot be deleted".into(),
            ));
        }
        self.instances.delete(id).await?;
        self.emit_audit(actor, "inspection.delete", id.to_uuid()).await;
        Ok(())
    }

    /// Create an ad hoc instance inside `scope`. Only organization- and
    /// area-scoped callers qualify.
    pub async fn create_on_demand(
        &self,
        scope: &Scope,
        actor: InspectorId,
        params: CreateOnDemand,
    ) -> Result<InspectionInstance> {
        self.verify_target_in_scope(scope, &params).await?;
        let instance = self
            .scheduler
            .create_instance(
                params.template_id,
                params.department_id,
                params.inspector_id,
                params.due_date,
            )
            .await?;
        self.emit_audit(actor, "inspection.create", instance.id.to_uuid())
            .await;
        Ok(instance)
    }

    /// Record completion of an instance inside `scope`. Identity-scoped
    /// callers may only complete their own assignments.
    pub async fn complete(
        &self,
        scope: &Scope,
        id: InstanceId,
        actor: InspectorId,
    ) -> Result<InspectionWithStatus> {
        let instance = self.fetch_in_scope(scope, id).await?;
        if matches!(scope, Scope::Inspector(_))
            && instance.inspector_id != Some(actor)
        {
            return Err(CoreError::NotFound("inspection instance".into()));
        }
        let now = self.clock.now();
        // The store re-checks ordering against creation; clamp here so a
        // skewed clock cannot produce a completion before creation.
        let at = now.max(instance.created_at);
        let completed = self.instances.complete(id, at).await?;
        self.emit_audit(actor, "inspection.complete", id.to_uuid()).await;
        let status = derive_status(
            completed.due_date,
            completed.completed_at,
            self.buffer_days,
            now,
        );
        Ok(InspectionWithStatus {
            instance: completed,
            status,
        })
    }

    /// Load an instance and verify it lies inside `scope`, presenting
    /// anything outside as absent.
    async fn fetch_in_scope(
        &self,
        scope: &Scope,
        id: InstanceId,
    ) -> Result<InspectionInstance> {
        if matches!(scope, Scope::AllOrganizations) {
            return Err(CoreError::AccessDenied(
                "mutations require an organization scope".into(),
            ));
        }
        let instance = self
            .instances
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound("inspection instance".into()))?;
        let contained = match scope {
            Scope::AllOrganizations => false,
            Scope::Organization(org) => {
                let department = self
                    .directory
                    .find_department(instance.department_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound("department".into()))?;
                department.organization_id == *org
            }
            Scope::Area(area) => {
                let department = self
                    .directory
                    .find_department(instance.department_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound("department".into()))?;
                department.area_id == *area
            }
            Scope::Inspector(inspector) => {
                instance.inspector_id == Some(*inspector)
            }
        };
        if !contained {
            return Err(CoreError::NotFound("inspection instance".into()));
        }
        Ok(instance)
    }

    async fn verify_target_in_scope(
        &self,
        scope: &Scope,
        params: &CreateOnDemand,
    ) -> Result<()> {
        let template = self
            .directory
            .find_template(params.template_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("template".into()))?;
        let department = self
            .directory
            .find_department(params.department_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("department".into()))?;
        match scope {
            Scope::Organization(org) => {
                if template.organization_id != *org
                    || department.organization_id != *org
                {
                    return Err(CoreError::NotFound("template".into()));
                }
            }
            Scope::Area(area) => {
                if department.area_id != *area {
                    return Err(CoreError::NotFound("department".into()));
                }
                let own_area = self
                    .directory
                    .find_area(*area)
                    .await?
                    .ok_or_else(|| CoreError::NotFound("area".into()))?;
                if template.organization_id != own_area.organization_id {
                    return Err(CoreError::NotFound("template".into()));
                }
            }
            Scope::AllOrganizations | Scope::Inspector(_) => {
                return Err(CoreError::AccessDenied(
                    "on-demand creation requires an organization or area \
                     scope"
                        .into(),
                ));
            }
        }
        Ok(())
    }

    /// Best-effort audit: a sink failure is logged, never surfaced.
    async fn emit_audit(
        &self,
        actor: InspectorId,
        action: &str,
        entity_id: Uuid,
    ) {
        let entry = AuditEntry {
            actor_id: actor,
            action: action.to_string(),
            entity_kind: "inspection".to_string(),
            entity_id,
            recorded_at: self.clock.now(),
        };
        if let Err(err) = self.audit.record(entry).await {
            warn!(action, %entity_id, error = %err, "audit record failed");
        }
    }
}
