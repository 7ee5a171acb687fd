use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::{
    AppState,
    auth::auth_middleware,
    handlers::{directory, health, inspections, sweep},
};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        // Public endpoints
        .route("/health", get(health::health))
        // Merge authenticated routes
        .merge(create_protected_routes(state))
}

/// Routes that require a valid session token
fn create_protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Inspection instances
        .route(
            "/inspections",
            get(inspections::list_inspections)
                .post(inspections::create_inspection),
        )
        .route(
            "/inspections/{id}/complete",
            post(inspections::complete_inspection),
        )
        .route("/inspections/{id}", delete(inspections::delete_inspection))
        .route("/stats", get(inspections::inspection_stats))
        // Recurrence sweep
        .route("/sweep", post(sweep::trigger_sweep))
        // Directory administration
        .route(
            "/organizations",
            get(directory::list_organizations)
                .post(directory::create_organization),
        )
        .route("/organizations/{id}", get(directory::get_organization))
        .route("/organizations/{id}/areas", get(directory::list_areas))
        .route(
            "/organizations/{id}/inspectors",
            get(directory::list_inspectors),
        )
        .route("/areas", post(directory::create_area))
        .route("/areas/{id}/departments", get(directory::list_departments))
        .route("/departments", post(directory::create_department))
        .route(
            "/templates",
            get(directory::list_templates).post(directory::create_template),
        )
        .route("/templates/{id}", get(directory::get_template))
        .layer(middleware::from_fn_with_state(state, auth_middleware))
}
