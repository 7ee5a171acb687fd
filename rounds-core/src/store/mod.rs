//! Persistence boundaries.
//!
//! The core talks to durable state exclusively through these traits. Two
//! implementations ship: [`postgres::PgStore`] for production and
//! [`memory::MemoryStore`] for tests. Correctness of the recurrence sweep
//! under concurrent invocation rests on the duplicate-period uniqueness
//! guarantee of [`InstanceStore::insert`], which implementations must
//! enforce themselves (unique index, keyed set under a lock), never by
//! check-then-act in application code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use rounds_model::{
    Area, AreaId, CreateArea, CreateDepartment, CreateInspector,
    CreateOrganization, CreateTemplate, Department, DepartmentId, Inspector,
    InspectorId, InspectionInstance, InstanceId, MasterTemplate, NewInstance,
    Organization, OrganizationId, Report, ReportId, ReportItem, TemplateId,
};

use crate::error::Result;
use crate::scope::{AuthContext, Scope};

pub mod memory;
pub mod postgres;

/// Directory of the organizational hierarchy and template catalog.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn create_organization(
        &self,
        input: CreateOrganization,
    ) -> Result<Organization>;
    async fn find_organization(
        &self,
        id: OrganizationId,
    ) -> Result<Option<Organization>>;
    async fn list_organizations(&self) -> Result<Vec<Organization>>;

    async fn create_area(&self, input: CreateArea) -> Result<Area>;
    async fn find_area(&self, id: AreaId) -> Result<Option<Area>>;
    async fn list_areas(&self, org: OrganizationId) -> Result<Vec<Area>>;

    async fn create_department(
        &self,
        input: CreateDepartment,
    ) -> Result<Department>;
    async fn find_department(
        &self,
        id: DepartmentId,
    ) -> Result<Option<Department>>;
    async fn list_departments(&self, area: AreaId) -> Result<Vec<Department>>;

    async fn create_inspector(
        &self,
        input: CreateInspector,
    ) -> Result<Inspector>;
    async fn find_inspector(
        &self,
        id: InspectorId,
    ) -> Result<Option<Inspector>>;
    async fn list_inspectors(
        &self,
        org: OrganizationId,
    ) -> Result<Vec<Inspector>>;

    async fn create_template(
        &self,
        input: CreateTemplate,
    ) -> Result<MasterTemplate>;
    async fn find_template(
        &self,
        id: TemplateId,
    ) -> Result<Option<MasterTemplate>>;
    async fn list_templates(
        &self,
        org: OrganizationId,
    ) -> Result<Vec<MasterTemplate>>;
    /// Every active template carrying a recurrence policy; the sweep's
    /// work list.
    async fn active_recurring_templates(&self) -> Result<Vec<MasterTemplate>>;
}

/// Store of inspection instances.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    /// Insert one instance. For sweep-originated rows a duplicate
    /// (template, department, due date) must fail with
    /// [`crate::CoreError::Conflict`]; manual rows always insert.
    async fn insert(&self, new: NewInstance) -> Result<InspectionInstance>;

    async fn get(&self, id: InstanceId) -> Result<Option<InspectionInstance>>;

    /// The instance with the greatest due date for the pair, regardless of
    /// origin or completion.
    async fn latest_for(
        &self,
        template: TemplateId,
        department: DepartmentId,
    ) -> Result<Option<InspectionInstance>>;

    /// Like [`Self::latest_for`] but restricted to sweep-originated
    /// instances. The sweep plans its next period off this, mirroring the
    /// uniqueness constraint: manual ad hoc rows never occupy a period.
    async fn latest_sweep_for(
        &self,
        template: TemplateId,
        department: DepartmentId,
    ) -> Result<Option<InspectionInstance>>;

    /// All instances inside `scope`. `Scope::AllOrganizations` returns
    /// everything; the service layer restricts that to aggregate uses.
    async fn list(&self, scope: &Scope) -> Result<Vec<InspectionInstance>>;

    /// Record completion. Fails with `PreconditionFailed` if already
    /// completed or if `at` precedes the instance's creation.
    async fn complete(
        &self,
        id: InstanceId,
        at: DateTime<Utc>,
    ) -> Result<InspectionInstance>;

    async fn delete(&self, id: InstanceId) -> Result<()>;
}

/// Store of execution reports. The core needs little more than existence
/// and item counts; report content management lives with the reporting
/// collaborator.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create_report(
        &self,
        instance: InstanceId,
        at: DateTime<Utc>,
    ) -> Result<Report>;
    async fn find_report(&self, instance: InstanceId)
    -> Result<Option<Report>>;
    async fn add_item(
        &self,
        report: ReportId,
        checklist_item: Uuid,
        note: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<ReportItem>;
    /// Number of recorded items across the instance's report, zero when no
    /// report exists. Gates deletion.
    async fn item_count(&self, instance: InstanceId) -> Result<u64>;
}

/// Session lookup boundary. Credential storage and token issuance are an
/// external collaborator; the core only maps an opaque bearer token to the
/// caller's verified attributes.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn lookup(&self, token: &str) -> Result<Option<AuthContext>>;
}
