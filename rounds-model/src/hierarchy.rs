//! The organizational hierarchy: Organization → Area → Department →
//! Inspector. Organizations are tenant roots; department-to-area linkage is
//! the authority boundary for area-scoped administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ids::{AreaId, DepartmentId, InspectorId, OrganizationId};
use crate::role::Role;

/// A tenant root. Created by a super administrator; rarely deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
}

/// A subdivision of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub name: String,
    pub organization_id: OrganizationId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArea {
    pub name: String,
    pub organization_id: OrganizationId,
}

/// A subdivision of an area; the unit inspections are scoped to.
///
/// `organization_id` is denormalized from the parent area so scope checks
/// never need a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub area_id: AreaId,
    pub organization_id: OrganizationId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepartment {
    pub name: String,
    pub area_id: AreaId,
}

/// An inspector account. Carries the role plus whichever scope attributes
/// the role requires (organization for admins, area for mini admins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspector {
    pub id: InspectorId,
    pub display_name: String,
    pub role: Role,
    pub organization_id: Option<OrganizationId>,
    pub area_id: Option<AreaId>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create an inspector account. Credential handling is
/// a separate collaborator; this is directory data only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInspector {
    pub display_name: String,
    pub role: Role,
    pub organization_id: Option<OrganizationId>,
    pub area_id: Option<AreaId>,
}

impl CreateInspector {
    pub fn validate(&self) -> Result<()> {
        require_name(&self.display_name, "inspector")?;
        match self.role {
            Role::Admin | Role::MiniAdmin | Role::Inspector
                if self.organization_id.is_none() =>
            {
                Err(ModelError::Invalid(format!(
                    "{:?} accounts require an organization",
                    self.role
                )))
            }
            Role::MiniAdmin if self.area_id.is_none() => Err(ModelError::Invalid(
                "MiniAdmin accounts require an area".into(),
            )),
            _ => Ok(()),
        }
    }
}

fn require_name(name: &str, what: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ModelError::Invalid(format!("{what} name cannot be empty")));
    }
    Ok(())
}

impl CreateOrganization {
    pub fn validate(&self) -> Result<()> {
        require_name(&self.name, "organization")
    }
}

impl CreateArea {
    pub fn validate(&self) -> Result<()> {
        require_name(&self.name, "area")
    }
}

impl CreateDepartment {
    pub fn validate(&self) -> Result<()> {
        require_name(&self.name, "department")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        let org = CreateOrganization {
            name: "  ".to_string(),
        };
        assert!(org.validate().is_err());

        let area = CreateArea {
            name: "North Wing".to_string(),
            organization_id: OrganizationId::new(),
        };
        assert!(area.validate().is_ok());
    }
}
