use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One cached market insight per distinct industry.
/// `industry` carries a UNIQUE constraint — the store upserts on it.
///
/// `next_update` is the TTL boundary (write time + 7 days). `last_updated`
/// is display metadata only and never drives freshness decisions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IndustryInsightRow {
    pub id: Uuid,
    pub industry: String,
    /// JSONB array of salary bands as produced by the model.
    pub salary_ranges: Value,
    pub growth_rate: f64,
    pub demand_level: String,
    pub top_skills: Vec<String>,
    pub market_outlook: String,
    pub key_trends: Vec<String>,
    pub recommended_skills: Vec<String>,
    pub next_update: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
