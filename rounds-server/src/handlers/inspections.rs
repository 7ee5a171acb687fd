//! Instance endpoints. Every handler resolves the caller's scope from the
//! authenticated context plus the optional `acting_org` query parameter;
//! nothing below the handler reads ambient caller state.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use rounds_core::{
    AuthContext, CreateOnDemand, Scope, StatusCounts, resolve_scope,
};
use rounds_model::{InspectionInstance, InspectionWithStatus, InstanceId, OrganizationId};

use crate::{AppState, errors::AppResult};

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    /// Organization a super administrator is acting on behalf of.
    pub acting_org: Option<Uuid>,
}

fn scope_for(ctx: &AuthContext, query: &ScopeQuery) -> AppResult<Scope> {
    let requested = query.acting_org.map(OrganizationId::from);
    Ok(resolve_scope(ctx, requested)?)
}

pub async fn list_inspections(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ScopeQuery>,
) -> AppResult<Json<Vec<InspectionWithStatus>>> {
    let scope = scope_for(&ctx, &query)?;
    Ok(Json(state.service.list(&scope).await?))
}

pub async fn inspection_stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ScopeQuery>,
) -> AppResult<Json<StatusCounts>> {
    let scope = scope_for(&ctx, &query)?;
    Ok(Json(state.service.stats(&scope).await?))
}

pub async fn create_inspection(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ScopeQuery>,
    Json(params): Json<CreateOnDemand>,
) -> AppResult<(StatusCode, Json<InspectionInstance>)> {
    let scope = scope_for(&ctx, &query)?;
    let instance = state
        .service
        .create_on_demand(&scope, ctx.inspector_id, params)
        .await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

pub async fn complete_inspection(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ScopeQuery>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InspectionWithStatus>> {
    let scope = scope_for(&ctx, &query)?;
    let completed = state
        .service
        .complete(&scope, InstanceId::from(id), ctx.inspector_id)
        .await?;
    Ok(Json(completed))
}

pub async fn delete_inspection(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ScopeQuery>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let scope = scope_for(&ctx, &query)?;
    state
        .service
        .delete(&scope, InstanceId::from(id), ctx.inspector_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
