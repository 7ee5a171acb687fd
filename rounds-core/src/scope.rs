//! Scope resolution: turning a caller's role into a data filter.
//!
//! Resolution happens once per request at the edge; the resulting [`Scope`]
//! value is passed explicitly into every query and mutation. Nothing deeper
//! in the stack reads ambient session state.

use serde::{Deserialize, Serialize};

use rounds_model::{AreaId, InspectorId, OrganizationId, Role};

use crate::error::{CoreError, Result};

/// The verified identity attributes of an authenticated caller, as
/// produced by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub inspector_id: InspectorId,
    pub role: Role,
    pub organization_id: Option<OrganizationId>,
    pub area_id: Option<AreaId>,
}

/// The organizational subtree a caller may see and act within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Sentinel for a super administrator who requested no organization.
    /// Valid only for cross-tenant aggregate statistics, never for
    /// instance listings or mutations.
    AllOrganizations,
    /// Everything under one organization.
    Organization(OrganizationId),
    /// Everything under one area.
    Area(AreaId),
    /// Only instances assigned to this inspector.
    Inspector(InspectorId),
}

/// Resolve the caller's effective scope for one request.
///
/// `requested_org` is the server-verified "act as" parameter: a super
/// administrator narrows focus to one organization and from then on
/// behaves exactly like an admin of that organization. Every other role
/// may only pass its own organization (or nothing); anything else is an
/// access violation, never a silent widening or narrowing.
pub fn resolve_scope(
    ctx: &AuthContext,
    requested_org: Option<OrganizationId>,
) -> Result<Scope> {
    match ctx.role {
        Role::SuperAdmin => Ok(match requested_org {
            Some(org) => Scope::Organization(org),
            None => Scope::AllOrganizations,
        }),
        Role::Admin => {
            let own = ctx.organization_id.ok_or_else(|| {
                CoreError::AccessDenied(
                    "admin account has no organization assigned".into(),
                )
            })?;
            if requested_org.is_some_and(|req| req != own) {
                return Err(CoreError::AccessDenied(
                    "requested organization does not match caller's assignment"
                        .into(),
                ));
            }
            Ok(Scope::Organization(own))
        }
        Role::MiniAdmin => {
            let area = ctx.area_id.ok_or_else(|| {
                CoreError::AccessDenied(
                    "mini admin account has no area assigned".into(),
                )
            })?;
            // The org id is irrelevant to the filter (department-to-area
            // linkage is the authority boundary), but passing someone
            // else's organization is still a violation.
            if requested_org.is_some_and(|req| ctx.organization_id != Some(req))
            {
                return Err(CoreError::AccessDenied(
                    "requested organization does not match caller's assignment"
                        .into(),
                ));
            }
            Ok(Scope::Area(area))
        }
        Role::Inspector => {
            if requested_org.is_some() {
                return Err(CoreError::AccessDenied(
                    "organizational parameters do not apply to inspectors"
                        .into(),
                ));
            }
            Ok(Scope::Inspector(ctx.inspector_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(
        role: Role,
        organization_id: Option<OrganizationId>,
        area_id: Option<AreaId>,
    ) -> AuthContext {
        AuthContext {
            inspector_id: InspectorId::new(),
            role,
            organization_id,
            area_id,
        }
    }

    #[test]
    fn super_admin_without_target_is_unscoped() {
        let scope =
            resolve_scope(&ctx(Role::SuperAdmin, None, None), None).unwrap();
        assert_eq!(scope, Scope::AllOrganizations);
    }

    #[test]
    fn super_admin_with_target_impersonates_that_org() {
        let org = OrganizationId::new();
        let scope =
            resolve_scope(&ctx(Role::SuperAdmin, None, None), Some(org))
                .unwrap();
        assert_eq!(scope, Scope::Organization(org));
    }

    #[test]
    fn admin_is_pinned_to_own_org() {
        let own = OrganizationId::new();
        let caller = ctx(Role::Admin, Some(own), None);

        assert_eq!(
            resolve_scope(&caller, None).unwrap(),
            Scope::Organization(own)
        );
        assert_eq!(
            resolve_scope(&caller, Some(own)).unwrap(),
            Scope::Organization(own)
        );
        assert!(matches!(
            resolve_scope(&caller, Some(OrganizationId::new())),
            Err(CoreError::AccessDenied(_))
        ));
    }

    #[test]
    fn admin_without_org_attribute_is_denied() {
        assert!(matches!(
            resolve_scope(&ctx(Role::Admin, None, None), None),
            Err(CoreError::AccessDenied(_))
        ));
    }

    #[test]
    fn mini_admin_scope_is_their_area() {
        let org = OrganizationId::new();
        let area = AreaId::new();
        let caller = ctx(Role::MiniAdmin, Some(org), Some(area));

        assert_eq!(resolve_scope(&caller, None).unwrap(), Scope::Area(area));
        // Passing their own organization is consistent, not a violation.
        assert_eq!(
            resolve_scope(&caller, Some(org)).unwrap(),
            Scope::Area(area)
        );
        assert!(matches!(
            resolve_scope(&caller, Some(OrganizationId::new())),
            Err(CoreError::AccessDenied(_))
        ));
    }

    #[test]
    fn mini_admin_without_area_is_denied() {
        let caller = ctx(Role::MiniAdmin, Some(OrganizationId::new()), None);
        assert!(matches!(
            resolve_scope(&caller, None),
            Err(CoreError::AccessDenied(_))
        ));
    }

    #[test]
    fn inspector_gets_identity_filter_only() {
        let caller = ctx(Role::Inspector, Some(OrganizationId::new()), None);
        assert_eq!(
            resolve_scope(&caller, None).unwrap(),
            Scope::Inspector(caller.inspector_id)
        );
        assert!(matches!(
            resolve_scope(&caller, Some(OrganizationId::new())),
            Err(CoreError::AccessDenied(_))
        ));
    }

    #[test]
    fn impersonation_equals_admin_resolution() {
        let org = OrganizationId::new();
        let as_super =
            resolve_scope(&ctx(Role::SuperAdmin, None, None), Some(org))
                .unwrap();
        let as_admin =
            resolve_scope(&ctx(Role::Admin, Some(org), None), None).unwrap();
        assert_eq!(as_super, as_admin);
    }
}
