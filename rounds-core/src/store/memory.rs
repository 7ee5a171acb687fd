//! In-memory store implementation.
//!
//! Backs the test suites and any embedded usage that has no database at
//! hand. All maps live behind a single async `RwLock`, which doubles as
//! the atomicity boundary for the duplicate-period check: the period key
//! set is consulted and updated under one write guard, so concurrent
//! sweeps observe the same constraint a unique index provides in Postgres.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use rounds_model::{
    Area, AreaId, CreateArea, CreateDepartment, CreateInspector,
    CreateOrganization, CreateTemplate, Department, DepartmentId, Inspector,
    InspectorId, InspectionInstance, InstanceId, InstanceOrigin,
    MasterTemplate, NewInstance, Organization, OrganizationId, Report,
    ReportId, ReportItem, TemplateId,
};

use crate::audit::{AuditEntry, AuditSink};
use crate::error::{CoreError, Result};
use crate::scope::{AuthContext, Scope};
use crate::store::{DirectoryStore, InstanceStore, ReportStore, SessionStore};

#[derive(Debug, Default)]
struct Inner {
    organizations: HashMap<OrganizationId, Organization>,
    areas: HashMap<AreaId, Area>,
    departments: HashMap<DepartmentId, Department>,
    inspectors: HashMap<InspectorId, Inspector>,
    templates: HashMap<TemplateId, MasterTemplate>,
    instances: HashMap<InstanceId, InspectionInstance>,
    /// Occupied (template, department, due date) buckets for
    /// sweep-originated instances.
    sweep_periods: HashSet<(TemplateId, DepartmentId, NaiveDate)>,
    reports: HashMap<ReportId, Report>,
    report_items: Vec<ReportItem>,
}

/// Directory, instance, and report store in one struct, the way the test
/// suites want to hold it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn create_organization(
        &self,
        input: CreateOrganization,
    ) -> Result<Organization> {
        input.validate()?;
        let org = Organization {
            id: OrganizationId::new(),
            name: input.name,
            created_at: Utc::now(),
        };
        self.inner
            .write()
            .await
            .organizations
            .insert(org.id, org.clone());
        Ok(org)
    }

    async fn find_organization(
        &self,
        id: OrganizationId,
    ) -> Result<Option<Organization>> {
        Ok(self.inner.read().await.organizations.get(&id).cloned())
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let mut orgs: Vec<_> =
            self.inner.read().await.organizations.values().cloned().collect();
        orgs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(orgs)
    }

    async fn create_area(&self, input: CreateArea) -> Result<Area> {
        input.validate()?;
        let mut inner = self.inner.write().await;
        if !inner.organizations.contains_key(&input.organization_id) {
            return Err(CoreError::NotFound("organization".into()));
        }
        let area = Area {
            id: AreaId::new(),
            name: input.name,
            organization_id: input.organization_id,
            created_at: Utc::now(),
        };
        inner.areas.insert(area.id, area.clone());
        Ok(area)
    }

    async fn find_area(&self, id: AreaId) -> Result<Option<Area>> {
        Ok(self.inner.read().await.areas.get(&id).cloned())
    }

    async fn list_areas(&self, org: OrganizationId) -> Result<Vec<Area>> {
        let mut areas: Vec<_> = self
            .inner
            .read()
            .await
            .areas
            .values()
            .filter(|a| a.organization_id == org)
            .cloned()
            .collect();
        areas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(areas)
    }

    async fn create_department(
        &self,
        input: CreateDepartment,
    ) -> Result<Department> {
        input.validate()?;
        let mut inner = self.inner.write().await;
        let area = inner
            .areas
            .get(&input.area_id)
            .ok_or_else(|| CoreError::NotFound("area".into()))?;
        let department = Department {
            id: DepartmentId::new(),
            name: input.name,
            area_id: area.id,
            organization_id: area.organization_id,
            created_at: Utc::now(),
        };
        inner.departments.insert(department.id, department.clone());
        Ok(department)
    }

    async fn find_department(
        &self,
        id: DepartmentId,
    ) -> Result<Option<Department>> {
        Ok(self.inner.read().await.departments.get(&id).cloned())
    }

    async fn list_departments(&self, area: AreaId) -> Result<Vec<Department>> {
        let mut departments: Vec<_> = self
            .inner
            .read()
            .await
            .departments
            .values()
            .filter(|d| d.area_id == area)
            .cloned()
            .collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn create_inspector(
        &self,
        input: CreateInspector,
    ) -> Result<Inspector> {
        input.validate()?;
        let mut inner = self.inner.write().await;
        if let Some(org) = input.organization_id
            && !inner.organizations.contains_key(&org)
        {
            return Err(CoreError::NotFound("organization".into()));
        }
        if let Some(area_id) = input.area_id {
            let area = inner
                .areas
                .get(&area_id)
                .ok_or_else(|| CoreError::NotFound("area".into()))?;
            if input.organization_id != Some(area.organization_id) {
                return Err(CoreError::InvalidAssignment(
                    "area belongs to a different organization".into(),
                ));
            }
        }
        let inspector = Inspector {
            id: InspectorId::new(),
            display_name: input.display_name,
            role: input.role,
            organization_id: input.organization_id,
            area_id: input.area_id,
            created_at: Utc::now(),
        };
        inner.inspectors.insert(inspector.id, inspector.clone());
        Ok(inspector)
    }

    async fn find_inspector(
        &self,
        id: InspectorId,
    ) -> Result<Option<Inspector>> {
        Ok(self.inner.read().await.inspectors.get(&id).cloned())
    }

    async fn list_inspectors(
        &self,
        org: OrganizationId,
    ) -> Result<Vec<Inspector>> {
        let mut inspectors: Vec<_> = self
            .inner
            .read()
            .await
            .inspectors
            .values()
            .filter(|i| i.organization_id == Some(org))
            .cloned()
            .collect();
        inspectors.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(inspectors)
    }

    async fn create_template(
        &self,
        input: CreateTemplate,
    ) -> Result<MasterTemplate> {
        input.validate()?;
        let mut inner = self.inner.write().await;
        if !inner.organizations.contains_key(&input.organization_id) {
            return Err(CoreError::NotFound("organization".into()));
        }
        if let Some(policy) = &input.recurrence {
            for assignment in &policy.assignments {
                let department = inner
                    .departments
                    .get(&assignment.department_id)
                    .ok_or_else(|| CoreError::NotFound("department".into()))?;
                if department.organization_id != input.organization_id {
                    return Err(CoreError::InvalidAssignment(
                        "target department belongs to a different organization"
                            .into(),
                    ));
                }
                if let Some(inspector_id) = assignment.default_inspector_id {
                    let inspector =
                        inner.inspectors.get(&inspector_id).ok_or_else(
                            || CoreError::NotFound("inspector".into()),
                        )?;
                    if inspector.organization_id
                        != Some(input.organization_id)
                    {
                        return Err(CoreError::InvalidAssignment(
                            "default inspector belongs to a different organization"
                                .into(),
                        ));
                    }
                }
            }
        }
        let template = MasterTemplate {
            id: TemplateId::new(),
            organization_id: input.organization_id,
            name: input.name,
            description: input.description,
            items: input.items,
            recurrence: input.recurrence,
            active: true,
            created_at: Utc::now(),
        };
        inner.templates.insert(template.id, template.clone());
        Ok(template)
    }

    async fn find_template(
        &self,
        id: TemplateId,
    ) -> Result<Option<MasterTemplate>> {
        Ok(self.inner.read().await.templates.get(&id).cloned())
    }

    async fn list_templates(
        &self,
        org: OrganizationId,
    ) -> Result<Vec<MasterTemplate>> {
        let mut templates: Vec<_> = self
            .inner
            .read()
            .await
            .templates
            .values()
            .filter(|t| t.organization_id == org)
            .cloned()
            .collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn active_recurring_templates(&self) -> Result<Vec<MasterTemplate>> {
        Ok(self
            .inner
            .read()
            .await
            .templates
            .values()
            .filter(|t| t.active && t.recurrence.is_some())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl InstanceStore for MemoryStore {
    async fn insert(&self, new: NewInstance) -> Result<InspectionInstance> {
        let mut inner = self.inner.write().await;
        let period_key = (new.template_id, new.department_id, new.due_date);
        if new.origin == InstanceOrigin::Sweep {
            if inner.sweep_periods.contains(&period_key) {
                return Err(CoreError::Conflict(
                    "instance already exists for this period".into(),
                ));
            }
            inner.sweep_periods.insert(period_key);
        }
        let instance = new.into_instance();
        inner.instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    async fn get(&self, id: InstanceId) -> Result<Option<InspectionInstance>> {
        Ok(self.inner.read().await.instances.get(&id).cloned())
    }

    async fn latest_for(
        &self,
        template: TemplateId,
        department: DepartmentId,
    ) -> Result<Option<InspectionInstance>> {
        Ok(self
            .inner
            .read()
            .await
            .instances
            .values()
            .filter(|i| {
                i.template_id == template && i.department_id == department
            })
            .max_by_key(|i| i.due_date)
            .cloned())
    }

    async fn latest_sweep_for(
        &self,
        template: TemplateId,
        department: DepartmentId,
    ) -> Result<Option<InspectionInstance>> {
        Ok(self
            .inner
            .read()
            .await
            .instances
            .values()
            .filter(|i| {
                i.template_id == template
                    && i.department_id == department
                    && i.origin == InstanceOrigin::Sweep
            })
            .max_by_key(|i| i.due_date)
            .cloned())
    }

    async fn list(&self, scope: &Scope) -> Result<Vec<InspectionInstance>> {
        let inner = self.inner.read().await;
        let instances = inner
            .instances
            .values()
            .filter(|i| match scope {
                Scope::AllOrganizations => true,
                Scope::Organization(org) => inner
                    .departments
                    .get(&i.department_id)
                    .is_some_and(|d| d.organization_id == *org),
                Scope::Area(area) => inner
                    .departments
                    .get(&i.department_id)
                    .is_some_and(|d| d.area_id == *area),
                Scope::Inspector(inspector) => {
                    i.inspector_id == Some(*inspector)
                }
            })
            .cloned()
            .collect();
        Ok(instances)
    }

    async fn complete(
        &self,
        id: InstanceId,
        at: DateTime<Utc>,
    ) -> Result<InspectionInstance> {
        let mut inner = self.inner.write().await;
        let instance = inner
            .instances
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound("inspection instance".into()))?;
        if instance.completed_at.is_some() {
            return Err(CoreError::PreconditionFailed(
                "inspection is already completed".into(),
            ));
        }
        if at < instance.created_at {
            return Err(CoreError::PreconditionFailed(
                "completion cannot precede creation".into(),
            ));
        }
        instance.completed_at = Some(at);
        Ok(instance.clone())
    }

    async fn delete(&self, id: InstanceId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let instance = inner
            .instances
            .remove(&id)
            .ok_or_else(|| CoreError::NotFound("inspection instance".into()))?;
        if instance.origin == InstanceOrigin::Sweep {
            inner.sweep_periods.remove(&(
                instance.template_id,
                instance.department_id,
                instance.due_date,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn create_report(
        &self,
        instance: InstanceId,
        at: DateTime<Utc>,
    ) -> Result<Report> {
        let mut inner = self.inner.write().await;
        if !inner.instances.contains_key(&instance) {
            return Err(CoreError::NotFound("inspection instance".into()));
        }
        if inner.reports.values().any(|r| r.instance_id == instance) {
            return Err(CoreError::Conflict(
                "a report already exists for this inspection".into(),
            ));
        }
        let report = Report {
            id: ReportId::new(),
            instance_id: instance,
            created_at: at,
        };
        inner.reports.insert(report.id, report.clone());
        Ok(report)
    }

    async fn find_report(
        &self,
        instance: InstanceId,
    ) -> Result<Option<Report>> {
        Ok(self
            .inner
            .read()
            .await
            .reports
            .values()
            .find(|r| r.instance_id == instance)
            .cloned())
    }

    async fn add_item(
        &self,
        report: ReportId,
        checklist_item: Uuid,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<ReportItem> {
        let mut inner = self.inner.write().await;
        if !inner.reports.contains_key(&report) {
            return Err(CoreError::NotFound("report".into()));
        }
        let item = ReportItem {
            id: Uuid::new_v4(),
            report_id: report,
            checklist_item_id: checklist_item,
            note,
            recorded_at: at,
        };
        inner.report_items.push(item.clone());
        Ok(item)
    }

    async fn item_count(&self, instance: InstanceId) -> Result<u64> {
        let inner = self.inner.read().await;
        let Some(report) =
            inner.reports.values().find(|r| r.instance_id == instance)
        else {
            return Ok(0);
        };
        Ok(inner
            .report_items
            .iter()
            .filter(|i| i.report_id == report.id)
            .count() as u64)
    }
}

/// Token-to-context map standing in for the external session collaborator.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, AuthContext>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, token: impl Into<String>, ctx: AuthContext) {
        self.sessions.write().await.insert(token.into(), ctx);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn lookup(&self, token: &str) -> Result<Option<AuthContext>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }
}

/// Audit sink that retains entries for assertions.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}

/// Convenience bundle for wiring a fully in-memory stack.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub audit: Arc<MemoryAuditSink>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}
