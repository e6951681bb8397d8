use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::insight::IndustryInsightRow;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct IndustryQuery {
    pub industry: String,
}

/// GET /api/v1/insights?industry=...
/// Dashboard path for callers that already know the industry string.
pub async fn handle_get_insight(
    State(state): State<AppState>,
    Query(params): Query<IndustryQuery>,
) -> Result<Json<IndustryInsightRow>, AppError> {
    let row = state.insights.resolve(&params.industry).await?;
    Ok(Json(row))
}
