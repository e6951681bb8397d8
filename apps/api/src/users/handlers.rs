use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::insight::IndustryInsightRow;
use crate::models::user::UserRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub industry: String,
    pub experience: i32,
    pub bio: Option<String>,
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub user: UserRow,
    pub industry_insight: IndustryInsightRow,
}

/// PUT /api/v1/users/:id/profile
///
/// Onboarding flow. The shared insight for the submitted industry is
/// resolved FIRST; only then is the profile written. A failed resolution
/// aborts the update, so a user never lands in an industry with no insight.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    let industry = req.industry.trim();
    if industry.is_empty() {
        return Err(AppError::Validation(
            "industry must not be empty".to_string(),
        ));
    }

    // Confirm the user exists before paying for insight resolution.
    let existing: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    existing.ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;

    let industry_insight = state.insights.resolve(industry).await?;

    let user: UserRow = sqlx::query_as(
        r#"
        UPDATE users
        SET industry = $1, experience = $2, bio = $3, skills = $4, updated_at = NOW()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(industry)
    .bind(req.experience)
    .bind(req.bio.as_deref())
    .bind(&req.skills)
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(UpdateProfileResponse {
        user,
        industry_insight,
    }))
}

/// GET /api/v1/users/:id/insights
/// Dashboard path: resolves the insight for the user's stored industry.
pub async fn handle_user_insights(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<IndustryInsightRow>, AppError> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    let user = user.ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;

    let industry = user
        .industry
        .as_deref()
        .filter(|i| !i.trim().is_empty())
        .ok_or_else(|| AppError::NotFound(format!("User {id} has no industry set")))?;

    let row = state.insights.resolve(industry).await?;
    Ok(Json(row))
}

#[derive(Debug, Serialize)]
pub struct OnboardingStatus {
    pub is_onboarded: bool,
}

/// GET /api/v1/users/:id/onboarding
pub async fn handle_onboarding_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OnboardingStatus>, AppError> {
    let industry: Option<Option<String>> =
        sqlx::query_scalar("SELECT industry FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;

    let industry = industry.ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;

    Ok(Json(OnboardingStatus {
        is_onboarded: industry.map(|i| !i.trim().is_empty()).unwrap_or(false),
    }))
}
