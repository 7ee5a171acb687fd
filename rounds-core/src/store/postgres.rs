//! Postgres store implementation.
//!
//! Queries are bound at runtime (`query_as` + `FromRow` rows mapped into
//! domain types) so the crate builds without a live database. The sweep's
//! duplicate-period guarantee is the `uq_sweep_period` partial unique
//! index; this code only translates the violation into
//! [`CoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use rounds_model::{
    Area, AreaId, Cadence, ChecklistItem, CreateArea, CreateDepartment,
    CreateInspector, CreateOrganization, CreateTemplate, Department,
    DepartmentId, Inspector, InspectorId, InspectionInstance, InstanceId,
    InstanceOrigin, MasterTemplate, NewInstance, Organization,
    OrganizationId, RecurrencePolicy, Report, ReportId, ReportItem, Role,
    TemplateAssignment, TemplateId,
};

use crate::audit::{AuditEntry, AuditSink};
use crate::error::{CoreError, Result};
use crate::scope::{AuthContext, Scope};
use crate::store::{DirectoryStore, InstanceStore, ReportStore, SessionStore};

/// All store traits over one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        crate::MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::Storage(format!("migration failed: {e}")))
    }
}

fn storage_err(context: &str) -> impl FnOnce(sqlx::Error) -> CoreError + '_ {
    move |e| CoreError::Storage(format!("{context}: {e}"))
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::SuperAdmin => "SUPER_ADMIN",
        Role::Admin => "ADMIN",
        Role::MiniAdmin => "MINI_ADMIN",
        Role::Inspector => "INSPECTOR",
    }
}

fn role_from_str(raw: &str) -> Result<Role> {
    match raw {
        "SUPER_ADMIN" => Ok(Role::SuperAdmin),
        "ADMIN" => Ok(Role::Admin),
        "MINI_ADMIN" => Ok(Role::MiniAdmin),
        "INSPECTOR" => Ok(Role::Inspector),
        other => Err(CoreError::Storage(format!("unknown role '{other}'"))),
    }
}

fn cadence_to_columns(cadence: Cadence) -> (&'static str, i32) {
    match cadence {
        Cadence::Days(n) => ("days", n as i32),
        Cadence::Weeks(n) => ("weeks", n as i32),
        Cadence::Months(n) => ("months", n as i32),
    }
}

fn cadence_from_columns(unit: &str, count: i32) -> Result<Cadence> {
    let count = u32::try_from(count).map_err(|_| {
        CoreError::Storage(format!("negative cadence count {count}"))
    })?;
    match unit {
        "days" => Ok(Cadence::Days(count)),
        "weeks" => Ok(Cadence::Weeks(count)),
        "months" => Ok(Cadence::Months(count)),
        other => {
            Err(CoreError::Storage(format!("unknown cadence unit '{other}'")))
        }
    }
}

fn origin_to_str(origin: InstanceOrigin) -> &'static str {
    match origin {
        InstanceOrigin::Sweep => "sweep",
        InstanceOrigin::Manual => "manual",
    }
}

fn origin_from_str(raw: &str) -> Result<InstanceOrigin> {
    match raw {
        "sweep" => Ok(InstanceOrigin::Sweep),
        "manual" => Ok(InstanceOrigin::Manual),
        other => {
            Err(CoreError::Storage(format!("unknown origin '{other}'")))
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[derive(FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: OrganizationId(row.id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AreaRow {
    id: Uuid,
    name: String,
    organization_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<AreaRow> for Area {
    fn from(row: AreaRow) -> Self {
        Area {
            id: AreaId(row.id),
            name: row.name,
            organization_id: OrganizationId(row.organization_id),
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct DepartmentRow {
    id: Uuid,
    name: String,
    area_id: Uuid,
    organization_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Department {
            id: DepartmentId(row.id),
            name: row.name,
            area_id: AreaId(row.area_id),
            organization_id: OrganizationId(row.organization_id),
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct InspectorRow {
    id: Uuid,
    display_name: String,
    role: String,
    organization_id: Option<Uuid>,
    area_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl InspectorRow {
    fn into_inspector(self) -> Result<Inspector> {
        Ok(Inspector {
            id: InspectorId(self.id),
            display_name: self.display_name,
            role: role_from_str(&self.role)?,
            organization_id: self.organization_id.map(OrganizationId),
            area_id: self.area_id.map(AreaId),
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct TemplateRow {
    id: Uuid,
    organization_id: Uuid,
    name: String,
    description: Option<String>,
    cadence_unit: Option<String>,
    cadence_count: Option<i32>,
    active: bool,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ChecklistItemRow {
    id: Uuid,
    position: i32,
    prompt: String,
}

#[derive(FromRow)]
struct AssignmentRow {
    department_id: Uuid,
    default_inspector_id: Option<Uuid>,
}

#[derive(FromRow)]
struct InstanceRow {
    id: Uuid,
    template_id: Uuid,
    department_id: Uuid,
    inspector_id: Option<Uuid>,
    due_date: NaiveDate,
    completed_at: Option<DateTime<Utc>>,
    origin: String,
    created_at: DateTime<Utc>,
}

impl InstanceRow {
    fn into_instance(self) -> Result<InspectionInstance> {
        Ok(InspectionInstance {
            id: InstanceId(self.id),
            template_id: TemplateId(self.template_id),
            department_id: DepartmentId(self.department_id),
            inspector_id: self.inspector_id.map(InspectorId),
            due_date: self.due_date,
            completed_at: self.completed_at,
            origin: origin_from_str(&self.origin)?,
            created_at: self.created_at,
        })
    }
}

const INSTANCE_COLUMNS: &str = "i.id, i.template_id, i.department_id, \
     i.inspector_id, i.due_date, i.completed_at, i.origin, i.created_at";

impl PgStore {
    async fn load_template(
        &self,
        row: TemplateRow,
    ) -> Result<MasterTemplate> {
        let items = sqlx::query_as::<_, ChecklistItemRow>(
            "SELECT id, position, prompt FROM checklist_items \
             WHERE template_id = $1 ORDER BY position",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("load checklist items"))?;

        let recurrence = match (row.cadence_unit.as_deref(), row.cadence_count)
        {
            (Some(unit), Some(count)) => {
                let assignments = sqlx::query_as::<_, AssignmentRow>(
                    "SELECT department_id, default_inspector_id \
                     FROM template_assignments WHERE template_id = $1",
                )
                .bind(row.id)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err("load template assignments"))?;
                Some(RecurrencePolicy {
                    cadence: cadence_from_columns(unit, count)?,
                    assignments: assignments
                        .into_iter()
                        .map(|a| TemplateAssignment {
                            department_id: DepartmentId(a.department_id),
                            default_inspector_id: a
                                .default_inspector_id
                                .map(InspectorId),
                        })
                        .collect(),
                })
            }
            _ => None,
        };

        Ok(MasterTemplate {
            id: TemplateId(row.id),
            organization_id: OrganizationId(row.organization_id),
            name: row.name,
            description: row.description,
            items: items
                .into_iter()
                .map(|i| ChecklistItem {
                    id: i.id,
                    position: i.position as u32,
                    prompt: i.prompt,
                })
                .collect(),
            recurrence,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn create_organization(
        &self,
        input: CreateOrganization,
    ) -> Result<Organization> {
        input.validate()?;
        let row = sqlx::query_as::<_, OrganizationRow>(
            "INSERT INTO organizations (id, name) VALUES ($1, $2) \
             RETURNING id, name, created_at",
        )
        .bind(OrganizationId::new().to_uuid())
        .bind(&input.name)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err("insert organization"))?;
        Ok(row.into())
    }

    async fn find_organization(
        &self,
        id: OrganizationId,
    ) -> Result<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, created_at FROM organizations WHERE id = $1",
        )
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("load organization"))?;
        Ok(row.map(Into::into))
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let rows = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, created_at FROM organizations ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("list organizations"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_area(&self, input: CreateArea) -> Result<Area> {
        input.validate()?;
        if self.find_organization(input.organization_id).await?.is_none() {
            return Err(CoreError::NotFound("organization".into()));
        }
        let row = sqlx::query_as::<_, AreaRow>(
            "INSERT INTO areas (id, name, organization_id) \
             VALUES ($1, $2, $3) \
             RETURNING id, name, organization_id, created_at",
        )
        .bind(AreaId::new().to_uuid())
        .bind(&input.name)
        .bind(input.organization_id.to_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err("insert area"))?;
        Ok(row.into())
    }

    async fn find_area(&self, id: AreaId) -> Result<Option<Area>> {
        let row = sqlx::query_as::<_, AreaRow>(
            "SELECT id, name, organization_id, created_at FROM areas \
             WHERE id = $1",
        )
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("load area"))?;
        Ok(row.map(Into::into))
    }

    async fn list_areas(&self, org: OrganizationId) -> Result<Vec<Area>> {
        let rows = sqlx::query_as::<_, AreaRow>(
            "SELECT id, name, organization_id, created_at FROM areas \
             WHERE organization_id = $1 ORDER BY name",
        )
        .bind(org.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("list areas"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_department(
        &self,
        input: CreateDepartment,
    ) -> Result<Department> {
        input.validate()?;
        let area = self
            .find_area(input.area_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("area".into()))?;
        let row = sqlx::query_as::<_, DepartmentRow>(
            "INSERT INTO departments (id, name, area_id, organization_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, name, area_id, organization_id, created_at",
        )
        .bind(DepartmentId::new().to_uuid())
        .bind(&input.name)
        .bind(area.id.to_uuid())
        .bind(area.organization_id.to_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err("insert department"))?;
        Ok(row.into())
    }

    async fn find_department(
        &self,
        id: DepartmentId,
    ) -> Result<Option<Department>> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, name, area_id, organization_id, created_at \
             FROM departments WHERE id = $1",
        )
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("load department"))?;
        Ok(row.map(Into::into))
    }

    async fn list_departments(&self, area: AreaId) -> Result<Vec<Department>> {
        let rows = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, name, area_id, organization_id, created_at \
             FROM departments WHERE area_id = $1 ORDER BY name",
        )
        .bind(area.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("list departments"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_inspector(
        &self,
        input: CreateInspector,
    ) -> Result<Inspector> {
        input.validate()?;
        if let Some(area_id) = input.area_id {
            let area = self
                .find_area(area_id)
                .await?
                .ok_or_else(|| CoreError::NotFound("area".into()))?;
            if input.organization_id != Some(area.organization_id) {
                return Err(CoreError::InvalidAssignment(
                    "area belongs to a different organization".into(),
                ));
            }
        }
        let row = sqlx::query_as::<_, InspectorRow>(
            "INSERT INTO inspectors \
             (id, display_name, role, organization_id, area_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, display_name, role, organization_id, area_id, \
                       created_at",
        )
        .bind(InspectorId::new().to_uuid())
        .bind(&input.display_name)
        .bind(role_to_str(input.role))
        .bind(input.organization_id.map(|o| o.to_uuid()))
        .bind(input.area_id.map(|a| a.to_uuid()))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err("insert inspector"))?;
        row.into_inspector()
    }

    async fn find_inspector(
        &self,
        id: InspectorId,
    ) -> Result<Option<Inspector>> {
        let row = sqlx::query_as::<_, InspectorRow>(
            "SELECT id, display_name, role, organization_id, area_id, \
                    created_at \
             FROM inspectors WHERE id = $1",
        )
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("load inspector"))?;
        row.map(InspectorRow::into_inspector).transpose()
    }

    async fn list_inspectors(
        &self,
        org: OrganizationId,
    ) -> Result<Vec<Inspector>> {
        let rows = sqlx::query_as::<_, InspectorRow>(
            "SELECT id, display_name, role, organization_id, area_id, \
                    created_at \
             FROM inspectors WHERE organization_id = $1 \
             ORDER BY display_name",
        )
        .bind(org.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("list inspectors"))?;
        rows.into_iter()
            .map(InspectorRow::into_inspector)
            .collect()
    }

    async fn create_template(
        &self,
        input: CreateTemplate,
    ) -> Result<MasterTemplate> {
        input.validate()?;
        if self.find_organization(input.organization_id).await?.is_none() {
            return Err(CoreError::NotFound("organization".into()));
        }
        if let Some(policy) = &input.recurrence {
            for assignment in &policy.assignments {
                let department = self
                    .find_department(assignment.department_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound("department".into()))?;
                if department.organization_id != input.organization_id {
                    return Err(CoreError::InvalidAssignment(
                        "target department belongs to a different organization"
                            .into(),
                    ));
                }
                if let Some(inspector_id) = assignment.default_inspector_id {
                    let inspector = self
                        .find_inspector(inspector_id)
                        .await?
                        .ok_or_else(|| {
                            CoreError::NotFound("inspector".into())
                        })?;
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(storage_err("begin template transaction"))?;

        let cadence = input.recurrence.as_ref().map(|p| p.cadence);
        let (unit, count) = match cadence.map(cadence_to_columns) {
            Some((unit, count)) => (Some(unit), Some(count)),
            None => (None, None),
        };
        let template_id = TemplateId::new();
        let row = sqlx::query_as::<_, TemplateRow>(
            "INSERT INTO templates \
             (id, organization_id, name, description, cadence_unit, \
              cadence_count) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, organization_id, name, description, \
                       cadence_unit, cadence_count, active, created_at",
        )
        .bind(template_id.to_uuid())
        .bind(input.organization_id.to_uuid())
        .bind(&input.name)
        .bind(&input.description)
        .bind(unit)
        .bind(count)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_err("insert template"))?;

        for item in &input.items {
            sqlx::query(
                "INSERT INTO checklist_items (id, template_id, position, \
                 prompt) VALUES ($1, $2, $3, $4)",
            )
            .bind(item.id)
            .bind(template_id.to_uuid())
            .bind(item.position as i32)
            .bind(&item.prompt)
            .execute(&mut *tx)
            .await
            .map_err(storage_err("insert checklist item"))?;
        }

        if let Some(policy) = &input.recurrence {
            for assignment in &policy.assignments {
                sqlx::query(
                    "INSERT INTO template_assignments \
                     (template_id, department_id, default_inspector_id) \
                     VALUES ($1, $2, $3)",
                )
                .bind(template_id.to_uuid())
                .bind(assignment.department_id.to_uuid())
                .bind(assignment.default_inspector_id.map(|i| i.to_uuid()))
                .execute(&mut *tx)
                .await
                .map_err(storage_err("insert template assignment"))?;
            }
        }

        tx.commit()
            .await
            .map_err(storage_err("commit template transaction"))?;

        self.load_template(row).await
    }

    async fn find_template(
        &self,
        id: TemplateId,
    ) -> Result<Option<MasterTemplate>> {
        let row = sqlx::query_as::<_, TemplateRow>(
            "SELECT id, organization_id, name, description, cadence_unit, \
                    cadence_count, active, created_at \
             FROM templates WHERE id = $1",
        )
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("load template"))?;
        match row {
            Some(row) => Ok(Some(self.load_template(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_templates(
        &self,
        org: OrganizationId,
    ) -> Result<Vec<MasterTemplate>> {
        let rows = sqlx::query_as::<_, TemplateRow>(
            "SELECT id, organization_id, name, description, cadence_unit, \
                    cadence_count, active, created_at \
             FROM templates WHERE organization_id = $1 ORDER BY name",
        )
        .bind(org.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("list templates"))?;
        let mut templates = Vec::with_capacity(rows.len());
        for row in rows {
            templates.push(self.load_template(row).await?);
        }
        Ok(templates)
    }

    async fn active_recurring_templates(&self) -> Result<Vec<MasterTemplate>> {
        let rows = sqlx::query_as::<_, TemplateRow>(
            "SELECT id, organization_id, name, description, cadence_unit, \
                    cadence_count, active, created_at \
             FROM templates \
             WHERE active AND cadence_unit IS NOT NULL \
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("list recurring templates"))?;
        let mut templates = Vec::with_capacity(rows.len());
        for row in rows {
            templates.push(self.load_template(row).await?);
        }
        Ok(templates)
    }

}

#[async_trait]
impl InstanceStore for PgStore {
    async fn insert(&self, new: NewInstance) -> Result<InspectionInstance> {
        let row = sqlx::query_as::<_, InstanceRow>(
            "INSERT INTO inspection_instances \
             (id, template_id, department_id, inspector_id, due_date, \
              origin, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, template_id, department_id, inspector_id, \
                       due_date, completed_at, origin, created_at",
        )
        .bind(new.id.to_uuid())
        .bind(new.template_id.to_uuid())
        .bind(new.department_id.to_uuid())
        .bind(new.inspector_id.map(|i| i.to_uuid()))
        .bind(new.due_date)
        .bind(origin_to_str(new.origin))
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::Conflict(
                    "instance already exists for this period".into(),
                )
            } else {
                CoreError::Storage(format!("insert instance: {e}"))
            }
        })?;
        row.into_instance()
    }

    async fn get(&self, id: InstanceId) -> Result<Option<InspectionInstance>> {
        let row = sqlx::query_as::<_, InstanceRow>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM inspection_instances i \
             WHERE i.id = $1"
        ))
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("load instance"))?;
        row.map(InstanceRow::into_instance).transpose()
    }

    async fn latest_for(
        &self,
        template: TemplateId,
        department: DepartmentId,
    ) -> Result<Option<InspectionInstance>> {
        let row = sqlx::query_as::<_, InstanceRow>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM inspection_instances i \
             WHERE i.template_id = $1 AND i.department_id = $2 \
             ORDER BY i.due_date DESC LIMIT 1"
        ))
        .bind(template.to_uuid())
        .bind(department.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("load latest instance"))?;
        row.map(InstanceRow::into_instance).transpose()
    }

    async fn latest_sweep_for(
        &self,
        template: TemplateId,
        department: DepartmentId,
    ) -> Result<Option<InspectionInstance>> {
        let row = sqlx::query_as::<_, InstanceRow>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM inspection_instances i \
             WHERE i.template_id = $1 AND i.department_id = $2 \
               AND i.origin = 'sweep' \
             ORDER BY i.due_date DESC LIMIT 1"
        ))
        .bind(template.to_uuid())
        .bind(department.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("load latest sweep instance"))?;
        row.map(InstanceRow::into_instance).transpose()
    }

    async fn list(&self, scope: &Scope) -> Result<Vec<InspectionInstance>> {
        let query = match scope {
            Scope::AllOrganizations => sqlx::query_as::<_, InstanceRow>(
                "SELECT i.id, i.template_id, i.department_id, \
                        i.inspector_id, i.due_date, i.completed_at, \
                        i.origin, i.created_at \
                 FROM inspection_instances i",
            ),
            Scope::Organization(org) => sqlx::query_as::<_, InstanceRow>(
                "SELECT i.id, i.template_id, i.department_id, \
                        i.inspector_id, i.due_date, i.completed_at, \
                        i.origin, i.created_at \
                 FROM inspection_instances i \
                 JOIN departments d ON d.id = i.department_id \
                 WHERE d.organization_id = $1",
            )
            .bind(org.to_uuid()),
            Scope::Area(area) => sqlx::query_as::<_, InstanceRow>(
                "SELECT i.id, i.template_id, i.department_id, \
                        i.inspector_id, i.due_date, i.completed_at, \
                        i.origin, i.created_at \
                 FROM inspection_instances i \
                 JOIN departments d ON d.id = i.department_id \
                 WHERE d.area_id = $1",
            )
            .bind(area.to_uuid()),
            Scope::Inspector(inspector) => sqlx::query_as::<_, InstanceRow>(
                "SELECT i.id, i.template_id, i.department_id, \
                        i.inspector_id, i.due_date, i.completed_at, \
                        i.origin, i.created_at \
                 FROM inspection_instances i \
                 WHERE i.inspector_id = $1",
            )
            .bind(inspector.to_uuid()),
        };
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("list instances"))?;
        rows.into_iter().map(InstanceRow::into_instance).collect()
    }

    async fn complete(
        &self,
        id: InstanceId,
        at: DateTime<Utc>,
    ) -> Result<InspectionInstance> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| CoreError::NotFound("inspection instance".into()))?;
        if current.completed_at.is_some() {
            return Err(CoreError::PreconditionFailed(
                "inspection is already completed".into(),
            ));
        }
        if at < current.created_at {
            return Err(CoreError::PreconditionFailed(
                "completion cannot precede creation".into(),
            ));
        }
        let row = sqlx::query_as::<_, InstanceRow>(
            "UPDATE inspection_instances i SET completed_at = $2 \
             WHERE i.id = $1 AND i.completed_at IS NULL \
             RETURNING i.id, i.template_id, i.department_id, \
                       i.inspector_id, i.due_date, i.completed_at, \
                       i.origin, i.created_at",
        )
        .bind(id.to_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("complete instance"))?
        // A concurrent completion won the race between our read and write.
        .ok_or_else(|| {
            CoreError::PreconditionFailed(
                "inspection is already completed".into(),
            )
        })?;
        row.into_instance()
    }

    async fn delete(&self, id: InstanceId) -> Result<()> {
        let result = sqlx::query("DELETE FROM inspection_instances WHERE id = $1")
            .bind(id.to_uuid())
            .execute(&self.pool)
            .await
            .map_err(storage_err("delete instance"))?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("inspection instance".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn create_report(
        &self,
        instance: InstanceId,
        at: DateTime<Utc>,
    ) -> Result<Report> {
        let id = ReportId::new();
        sqlx::query(
            "INSERT INTO reports (id, instance_id, created_at) \
             VALUES ($1, $2, $3)",
        )
        .bind(id.to_uuid())
        .bind(instance.to_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::Conflict(
                    "a report already exists for this inspection".into(),
                )
            } else {
                CoreError::Storage(format!("insert report: {e}"))
            }
        })?;
        Ok(Report {
            id,
            instance_id: instance,
            created_at: at,
        })
    }

    async fn find_report(
        &self,
        instance: InstanceId,
    ) -> Result<Option<Report>> {
        #[derive(FromRow)]
        struct ReportRow {
            id: Uuid,
            instance_id: Uuid,
            created_at: DateTime<Utc>,
        }
        let row = sqlx::query_as::<_, ReportRow>(
            "SELECT id, instance_id, created_at FROM reports \
             WHERE instance_id = $1",
        )
        .bind(instance.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("load report"))?;
        Ok(row.map(|r| Report {
            id: ReportId(r.id),
            instance_id: InstanceId(r.instance_id),
            created_at: r.created_at,
        }))
    }

    async fn add_item(
        &self,
        report: ReportId,
        checklist_item: Uuid,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<ReportItem> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO report_items \
             (id, report_id, checklist_item_id, note, recorded_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(report.to_uuid())
        .bind(checklist_item)
        .bind(&note)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(storage_err("insert report item"))?;
        Ok(ReportItem {
            id,
            report_id: report,
            checklist_item_id: checklist_item,
            note,
            recorded_at: at,
        })
    }

    async fn item_count(&self, instance: InstanceId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM report_items ri \
             JOIN reports r ON r.id = ri.report_id \
             WHERE r.instance_id = $1",
        )
        .bind(instance.to_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err("count report items"))?;
        Ok(count as u64)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn lookup(&self, token: &str) -> Result<Option<AuthContext>> {
        #[derive(FromRow)]
        struct SessionRow {
            inspector_id: Uuid,
            role: String,
            organization_id: Option<Uuid>,
            area_id: Option<Uuid>,
        }
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT n.id AS inspector_id, n.role, n.organization_id, \
                    n.area_id \
             FROM sessions s \
             JOIN inspectors n ON n.id = s.inspector_id \
             WHERE s.token = $1 \
               AND (s.expires_at IS NULL OR s.expires_at > now())",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("load session"))?;
        row.map(|r| {
            Ok(AuthContext {
                inspector_id: InspectorId(r.inspector_id),
                role: role_from_str(&r.role)?,
                organization_id: r.organization_id.map(OrganizationId),
                area_id: r.area_id.map(AreaId),
            })
        })
        .transpose()
    }
}

#[async_trait]
impl AuditSink for PgStore {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_log \
             (id, actor_id, action, entity_kind, entity_id, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(entry.actor_id.to_uuid())
        .bind(&entry.action)
        .bind(&entry.entity_kind)
        .bind(entry.entity_id)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err("insert audit entry"))?;
        Ok(())
    }
}
