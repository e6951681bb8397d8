//! Insight Store — persistence over the `industry_insights` table.
//!
//! One row per distinct industry, enforced by a UNIQUE constraint on
//! `industry`. The only write path is an atomic upsert that sets every field
//! together, so readers never observe a partially written record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::insights::freshness::next_update_after;
use crate::insights::parser::InsightPayload;
use crate::insights::InsightError;
use crate::models::insight::IndustryInsightRow;

/// A fully-populated record ready to write.
#[derive(Debug, Clone)]
pub struct NewInsight {
    pub industry: String,
    pub salary_ranges: serde_json::Value,
    pub growth_rate: f64,
    pub demand_level: String,
    pub top_skills: Vec<String>,
    pub market_outlook: String,
    pub key_trends: Vec<String>,
    pub recommended_skills: Vec<String>,
    pub next_update: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl NewInsight {
    /// Binds a validated payload to an industry with the TTL boundary stamped
    /// relative to `now` (write time + 7 days).
    pub fn from_payload(
        industry: &str,
        payload: &InsightPayload,
        now: DateTime<Utc>,
    ) -> Result<Self, InsightError> {
        let salary_ranges = serde_json::to_value(&payload.salary_ranges)
            .map_err(|e| InsightError::Store(format!("salary bands not serializable: {e}")))?;

        Ok(Self {
            industry: industry.to_string(),
            salary_ranges,
            growth_rate: payload.growth_rate,
            demand_level: payload.demand_level.as_str().to_string(),
            top_skills: payload.top_skills.clone(),
            market_outlook: payload.market_outlook.as_str().to_string(),
            key_trends: payload.key_trends.clone(),
            recommended_skills: payload.recommended_skills.clone(),
            next_update: next_update_after(now),
            last_updated: now,
        })
    }
}

#[async_trait]
pub trait InsightStore: Send + Sync {
    async fn find_by_industry(
        &self,
        industry: &str,
    ) -> Result<Option<IndustryInsightRow>, InsightError>;

    /// Atomic create-or-update keyed by `industry`. Concurrent upserts for
    /// the same key serialize at the storage boundary; last writer wins.
    async fn upsert(&self, insight: &NewInsight) -> Result<IndustryInsightRow, InsightError>;
}

/// Postgres-backed store.
pub struct PgInsightStore {
    pool: PgPool,
}

impl PgInsightStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InsightStore for PgInsightStore {
    async fn find_by_industry(
        &self,
        industry: &str,
    ) -> Result<Option<IndustryInsightRow>, InsightError> {
        Ok(sqlx::query_as::<_, IndustryInsightRow>(
            "SELECT * FROM industry_insights WHERE industry = $1",
        )
        .bind(industry)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert(&self, insight: &NewInsight) -> Result<IndustryInsightRow, InsightError> {
        Ok(sqlx::query_as::<_, IndustryInsightRow>(
            r#"
            INSERT INTO industry_insights
                (id, industry, salary_ranges, growth_rate, demand_level, top_skills,
                 market_outlook, key_trends, recommended_skills, next_update, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (industry) DO UPDATE SET
                salary_ranges = EXCLUDED.salary_ranges,
                growth_rate = EXCLUDED.growth_rate,
                demand_level = EXCLUDED.demand_level,
                top_skills = EXCLUDED.top_skills,
                market_outlook = EXCLUDED.market_outlook,
                key_trends = EXCLUDED.key_trends,
                recommended_skills = EXCLUDED.recommended_skills,
                next_update = EXCLUDED.next_update,
                last_updated = EXCLUDED.last_updated
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&insight.industry)
        .bind(&insight.salary_ranges)
        .bind(insight.growth_rate)
        .bind(&insight.demand_level)
        .bind(&insight.top_skills)
        .bind(&insight.market_outlook)
        .bind(&insight.key_trends)
        .bind(&insight.recommended_skills)
        .bind(insight.next_update)
        .bind(insight.last_updated)
        .fetch_one(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::parser::{DemandLevel, MarketOutlook};

    #[test]
    fn test_from_payload_stamps_ttl_boundary() {
        let payload = InsightPayload {
            salary_ranges: vec![],
            growth_rate: 3.0,
            demand_level: DemandLevel::Medium,
            top_skills: vec!["SQL".to_string()],
            market_outlook: MarketOutlook::Neutral,
            key_trends: vec![],
            recommended_skills: vec![],
        };
        let now = Utc::now();
        let insight = NewInsight::from_payload("Data Engineering", &payload, now).unwrap();

        assert_eq!(insight.industry, "Data Engineering");
        assert_eq!(insight.demand_level, "Medium");
        assert_eq!(insight.market_outlook, "Neutral");
        assert_eq!(insight.last_updated, now);
        assert_eq!((insight.next_update - now).num_seconds(), 604_800);
    }
}
