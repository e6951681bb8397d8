// Industry insight subsystem: one shared, week-fresh, model-derived market
// summary per industry. All LLM calls go through llm_client — no direct
// Anthropic SDK calls here.

pub mod coalesce;
pub mod coordinator;
pub mod freshness;
pub mod generate;
pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod store;

use thiserror::Error;

/// Failure taxonomy for insight resolution.
///
/// `MalformedOutput` carries the offending raw model text for diagnostics;
/// it must never be echoed into an HTTP response body.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("invalid industry: {0}")]
    InvalidIndustry(String),

    #[error("insight generation failed: {0}")]
    Generation(String),

    #[error("malformed model output: {reason}")]
    MalformedOutput { reason: String, raw: String },

    #[error("insight store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for InsightError {
    fn from(err: sqlx::Error) -> Self {
        InsightError::Store(err.to_string())
    }
}
