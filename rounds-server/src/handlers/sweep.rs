use axum::{Extension, Json, extract::State};
use chrono::Utc;

use rounds_core::{AuthContext, SweepOutcome};
use rounds_model::Role;

use crate::{AppState, errors::{AppError, AppResult}};

/// Manual sweep trigger. Idempotency lives in the store constraint, so
/// racing the background task is harmless.
pub async fn trigger_sweep(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> AppResult<Json<SweepOutcome>> {
    if ctx.role != Role::SuperAdmin {
        return Err(AppError::forbidden(
            "sweeps require a super administrator",
        ));
    }
    let outcome = state.service.scheduler().run_sweep(Utc::now()).await?;
    tracing::info!(
        created = outcome.created.len(),
        unassigned = outcome.unassigned.len(),
        failures = outcome.failures.len(),
        "manual sweep finished"
    );
    Ok(Json(outcome))
}
