//! Directory administration: organizations, areas, departments, and
//! templates. Organizations are super-administrator territory; everything
//! below is open to administrators of the owning organization.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use rounds_core::AuthContext;
use rounds_model::{
    Area, CreateArea, CreateDepartment, CreateOrganization, CreateTemplate,
    Department, Inspector, MasterTemplate, Organization, OrganizationId, Role,
};

use crate::{
    AppState,
    errors::{AppError, AppResult},
};

fn require_super(ctx: &AuthContext) -> AppResult<()> {
    if ctx.role != Role::SuperAdmin {
        return Err(AppError::forbidden("super administrator required"));
    }
    Ok(())
}

/// Super administrators qualify everywhere; administrators only within
/// their own organization.
fn require_org_admin(
    ctx: &AuthContext,
    org: OrganizationId,
) -> AppResult<()> {
    match ctx.role {
        Role::SuperAdmin => Ok(()),
        Role::Admin if ctx.organization_id == Some(org) => Ok(()),
        _ => Err(AppError::forbidden(
            "organization administrator required",
        )),
    }
}

// --- organizations -------------------------------------------------------

pub async fn create_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateOrganization>,
) -> AppResult<(StatusCode, Json<Organization>)> {
    require_super(&ctx)?;
    let org = state.directory.create_organization(input).await?;
    Ok((StatusCode::CREATED, Json(org)))
}

pub async fn list_organizations(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> AppResult<Json<Vec<Organization>>> {
    require_super(&ctx)?;
    Ok(Json(state.directory.list_organizations().await?))
}

pub async fn get_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Organization>> {
    let id = OrganizationId::from(id);
    require_org_admin(&ctx, id)?;
    let org = state
        .directory
        .find_organization(id)
        .await?
        .ok_or_else(|| AppError::not_found("organization"))?;
    Ok(Json(org))
}

// --- areas ---------------------------------------------------------------

pub async fn create_area(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateArea>,
) -> AppResult<(StatusCode, Json<Area>)> {
    require_org_admin(&ctx, input.organization_id)?;
    let area = state.directory.create_area(input).await?;
    Ok((StatusCode::CREATED, Json(area)))
}

pub async fn list_areas(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(org): Path<Uuid>,
) -> AppResult<Json<Vec<Area>>> {
    let org = OrganizationId::from(org);
    require_org_admin(&ctx, org)?;
    Ok(Json(state.directory.list_areas(org).await?))
}

// --- inspectors ----------------------------------------------------------

pub async fn list_inspectors(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(org): Path<Uuid>,
) -> AppResult<Json<Vec<Inspector>>> {
    let org = OrganizationId::from(org);
    require_org_admin(&ctx, org)?;
    Ok(Json(state.directory.list_inspectors(org).await?))
}

// --- departments ---------------------------------------------------------

pub async fn create_department(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateDepartment>,
) -> AppResult<(StatusCode, Json<Department>)> {
    let area = state
        .directory
        .find_area(input.area_id)
        .await?
        .ok_or_else(|| AppError::not_found("area"))?;
    require_org_admin(&ctx, area.organization_id)?;
    let department = state.directory.create_department(input).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn list_departments(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(area): Path<Uuid>,
) -> AppResult<Json<Vec<Department>>> {
    let area = state
        .directory
        .find_area(rounds_model::AreaId::from(area))
        .await?
        .ok_or_else(|| AppError::not_found("area"))?;
    require_org_admin(&ctx, area.organization_id)?;
    Ok(Json(state.directory.list_departments(area.id).await?))
}

// --- templates -----------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub acting_org: Option<Uuid>,
}

pub async fn create_template(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateTemplate>,
) -> AppResult<(StatusCode, Json<MasterTemplate>)> {
    require_org_admin(&ctx, input.organization_id)?;
    let template = state.directory.create_template(input).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn list_templates(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<TemplateQuery>,
) -> AppResult<Json<Vec<MasterTemplate>>> {
    let org = query
        .acting_org
        .map(OrganizationId::from)
        .or(ctx.organization_id)
        .ok_or_else(|| {
            AppError::bad_request("acting_org required for this caller")
        })?;
    require_org_admin(&ctx, org)?;
    Ok(Json(state.directory.list_templates(org).await?))
}

pub async fn get_template(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MasterTemplate>> {
    let template = state
        .directory
        .find_template(rounds_model::TemplateId::from(id))
        .await?
        .ok_or_else(|| AppError::not_found("template"))?;
    // Cross-tenant lookups read as absent rather than forbidden.
    require_org_admin(&ctx, template.organization_id)
        .map_err(|_| AppError::not_found("template"))?;
    Ok(Json(template))
}
