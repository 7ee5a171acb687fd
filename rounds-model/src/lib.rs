//! Core data model definitions shared across Rounds crates.
#![allow(missing_docs)]

pub mod error;
pub mod hierarchy;
pub mod ids;
pub mod instance;
pub mod recurrence;
pub mod report;
pub mod role;
pub mod status;
pub mod template;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use hierarchy::{
    Area, CreateArea, CreateDepartment, CreateInspector, CreateOrganization,
    Department, Inspector, Organization,
};
pub use ids::{
    AreaId, DepartmentId, InspectorId, InstanceId, OrganizationId, ReportId,
    TemplateId,
};
pub use instance::{
    InspectionInstance, InspectionWithStatus, InstanceOrigin, NewInstance,
};
pub use recurrence::{Cadence, RecurrencePolicy, TemplateAssignment};
pub use report::{Report, ReportItem};
pub use role::Role;
pub use status::{DEFAULT_BUFFER_DAYS, InspectionStatus, derive_status};
pub use template::{ChecklistItem, CreateTemplate, MasterTemplate};
