pub mod health;

use axum::{
    routing::{get, put},
    Router,
};

use crate::insights::handlers as insight_handlers;
use crate::state::AppState;
use crate::users::handlers as user_handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Insight API
        .route(
            "/api/v1/insights",
            get(insight_handlers::handle_get_insight),
        )
        // User-facing callers (onboarding + dashboard)
        .route(
            "/api/v1/users/:id/insights",
            get(user_handlers::handle_user_insights),
        )
        .route(
            "/api/v1/users/:id/profile",
            put(user_handlers::handle_update_profile),
        )
        .route(
            "/api/v1/users/:id/onboarding",
            get(user_handlers::handle_onboarding_status),
        )
        .with_state(state)
}
