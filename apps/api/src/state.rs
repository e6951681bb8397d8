use std::sync::Arc;

use sqlx::PgPool;

use crate::insights::coordinator::InsightCoordinator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Single process-wide coordinator: its per-industry lock registry is
    /// what guarantees one in-flight generation per industry.
    pub insights: Arc<InsightCoordinator>,
}
