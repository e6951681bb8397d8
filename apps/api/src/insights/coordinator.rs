//! Insight Cache Coordinator — the single operation the insight subsystem
//! exposes to callers.
//!
//! Flow: validate industry → fresh cached row? return it → per-industry
//! lock → re-check freshness → generate (bounded, one internal retry) →
//! parse → atomic upsert → return the new row.
//!
//! Fail-open persistence: when a refresh fails, the previous (stale but
//! complete) row stays in the store untouched and the error surfaces to the
//! caller. The next access attempts the refresh again.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::insights::coalesce::IndustryCoalescer;
use crate::insights::freshness::{classify, Freshness};
use crate::insights::generate::InsightGenerator;
use crate::insights::parser::{parse_insight, InsightPayload};
use crate::insights::store::{InsightStore, NewInsight};
use crate::insights::InsightError;
use crate::models::insight::IndustryInsightRow;

/// Bound on a single generation attempt, on top of the HTTP client's own
/// timeout. A timed-out attempt releases the per-industry lock via the RAII
/// guard in `resolve` before the error returns.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);
/// One internal retry before the error surfaces to the caller.
const GENERATION_ATTEMPTS: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

pub struct InsightCoordinator {
    store: Arc<dyn InsightStore>,
    generator: Arc<dyn InsightGenerator>,
    coalescer: IndustryCoalescer,
}

impl InsightCoordinator {
    pub fn new(store: Arc<dyn InsightStore>, generator: Arc<dyn InsightGenerator>) -> Self {
        Self {
            store,
            generator,
            coalescer: IndustryCoalescer::new(),
        }
    }

    /// Returns a valid insight for `industry`, computing and storing one if
    /// the cached row is absent or past its `next_update` boundary.
    ///
    /// At most one generation runs per industry at a time; concurrent
    /// callers for the same industry converge on one resulting record.
    pub async fn resolve(&self, industry: &str) -> Result<IndustryInsightRow, InsightError> {
        let industry = industry.trim();
        if industry.is_empty() {
            return Err(InsightError::InvalidIndustry(
                "industry must be a non-empty string".to_string(),
            ));
        }

        // Fast path: a fresh hit costs one read and never takes the lock.
        if let Some(row) = self.store.find_by_industry(industry).await? {
            if classify(row.next_update, Utc::now()) == Freshness::Fresh {
                debug!("Insight cache hit for '{industry}'");
                return Ok(row);
            }
        }

        let _guard = self.coalescer.acquire(industry).await;

        // Re-check under the lock: a concurrent caller may have just
        // finished computing this industry while we waited.
        if let Some(row) = self.store.find_by_industry(industry).await? {
            if classify(row.next_update, Utc::now()) == Freshness::Fresh {
                debug!("Insight for '{industry}' was refreshed by a concurrent caller");
                return Ok(row);
            }
        }

        info!("Generating insight for '{industry}'");
        let payload = self.generate_payload(industry).await?;
        let insight = NewInsight::from_payload(industry, &payload, Utc::now())?;
        let row = self.store.upsert(&insight).await?;
        info!(
            "Stored insight for '{industry}' ({} salary bands, next update {})",
            payload.salary_ranges.len(),
            row.next_update
        );
        Ok(row)
    }

    /// Runs bounded generation attempts and parses the output. A failed
    /// attempt (model error, timeout, or unparseable text) is retried once
    /// with a short backoff; nothing is written until a parse succeeds.
    async fn generate_payload(&self, industry: &str) -> Result<InsightPayload, InsightError> {
        let mut last_error: Option<InsightError> = None;

        for attempt in 0..GENERATION_ATTEMPTS {
            if attempt > 0 {
                warn!(
                    "Insight generation for '{industry}' failed ({}), retrying...",
                    last_error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_default()
                );
                tokio::time::sleep(RETRY_BACKOFF).await;
            }

            let raw = match tokio::time::timeout(
                GENERATION_TIMEOUT,
                self.generator.generate(industry),
            )
            .await
            {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    last_error = Some(e);
                    continue;
                }
                Err(_) => {
                    last_error = Some(InsightError::Generation(format!(
                        "generation timed out after {}s",
                        GENERATION_TIMEOUT.as_secs()
                    )));
                    continue;
                }
            };

            match parse_insight(&raw) {
                Ok(payload) => return Ok(payload),
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| InsightError::Generation("generation failed".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use super::*;

    // ── Test doubles ────────────────────────────────────────────────────

    /// In-memory store honoring the upsert contract: one row per industry,
    /// id preserved across updates, every field replaced together.
    struct MemoryStore {
        rows: Mutex<HashMap<String, IndustryInsightRow>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                rows: Mutex::new(HashMap::new()),
            }
        }

        async fn seed(&self, industry: &str, next_update: DateTime<Utc>) -> IndustryInsightRow {
            let row = IndustryInsightRow {
                id: Uuid::new_v4(),
                industry: industry.to_string(),
                salary_ranges: serde_json::json!([]),
                growth_rate: 1.0,
                demand_level: "Low".to_string(),
                top_skills: vec!["legacy".to_string()],
                market_outlook: "Neutral".to_string(),
                key_trends: vec![],
                recommended_skills: vec![],
                next_update,
                last_updated: next_update - ChronoDuration::days(7),
            };
            self.rows
                .lock()
                .await
                .insert(industry.to_string(), row.clone());
            row
        }
    }

    #[async_trait]
    impl InsightStore for MemoryStore {
        async fn find_by_industry(
            &self,
            industry: &str,
        ) -> Result<Option<IndustryInsightRow>, InsightError> {
            Ok(self.rows.lock().await.get(industry).cloned())
        }

        async fn upsert(&self, insight: &NewInsight) -> Result<IndustryInsightRow, InsightError> {
            let mut rows = self.rows.lock().await;
            let id = rows
                .get(&insight.industry)
                .map(|r| r.id)
                .unwrap_or_else(Uuid::new_v4);
            let row = IndustryInsightRow {
                id,
                industry: insight.industry.clone(),
                salary_ranges: insight.salary_ranges.clone(),
                growth_rate: insight.growth_rate,
                demand_level: insight.demand_level.clone(),
                top_skills: insight.top_skills.clone(),
                market_outlook: insight.market_outlook.clone(),
                key_trends: insight.key_trends.clone(),
                recommended_skills: insight.recommended_skills.clone(),
                next_update: insight.next_update,
                last_updated: insight.last_updated,
            };
            rows.insert(insight.industry.clone(), row.clone());
            Ok(row)
        }
    }

    /// Counts invocations; optionally dawdles so concurrent callers overlap.
    struct CountingGenerator {
        calls: AtomicU32,
        delay: Duration,
    }

    impl CountingGenerator {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicU32::new(0),
                delay,
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InsightGenerator for CountingGenerator {
        async fn generate(&self, _industry: &str) -> Result<String, InsightError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(sample_output())
        }
    }

    struct FailingGenerator {
        calls: AtomicU32,
    }

    #[async_trait]
    impl InsightGenerator for FailingGenerator {
        async fn generate(&self, _industry: &str) -> Result<String, InsightError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(InsightError::Generation("model unavailable".to_string()))
        }
    }

    fn sample_output() -> String {
        r#"```json
        {
            "salaryRanges": [
                { "role": "Backend Engineer", "min": 95000, "max": 180000, "median": 135000, "location": "US Remote" },
                { "role": "Frontend Engineer", "min": 85000, "max": 165000, "median": 120000, "location": "US Remote" },
                { "role": "DevOps Engineer", "min": 100000, "max": 190000, "median": 140000, "location": "US Remote" },
                { "role": "Engineering Manager", "min": 140000, "max": 240000, "median": 185000, "location": "US Remote" },
                { "role": "Data Engineer", "min": 105000, "max": 195000, "median": 145000, "location": "US Remote" }
            ],
            "growthRate": 12.5,
            "demandLevel": "High",
            "topSkills": ["Rust", "Kubernetes", "PostgreSQL", "AWS", "gRPC"],
            "marketOutlook": "Positive",
            "keyTrends": ["AI tooling", "Platform consolidation", "Remote-first hiring", "Rust adoption", "Edge compute"],
            "recommendedSkills": ["Rust", "Terraform", "Observability", "System design", "LLM integration"]
        }
        ```"#
            .to_string()
    }

    fn coordinator(
        store: Arc<MemoryStore>,
        generator: Arc<dyn InsightGenerator>,
    ) -> Arc<InsightCoordinator> {
        Arc::new(InsightCoordinator::new(store, generator))
    }

    // ── Tests ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_blank_industry_rejected_before_io() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(CountingGenerator::new(Duration::ZERO));
        let coord = coordinator(store, generator.clone());

        let err = coord.resolve("   ").await.unwrap_err();
        assert!(matches!(err, InsightError::InvalidIndustry(_)));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_miss_generates_and_stores() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(CountingGenerator::new(Duration::ZERO));
        let coord = coordinator(store.clone(), generator.clone());

        let row = coord.resolve("Software Engineering").await.unwrap();

        assert_eq!(generator.call_count(), 1);
        assert_eq!(row.industry, "Software Engineering");
        assert_eq!(row.demand_level, "High");
        assert_eq!(row.market_outlook, "Positive");
        assert_eq!((row.next_update - row.last_updated).num_seconds(), 604_800);
        assert!(store
            .find_by_industry("Software Engineering")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_fresh_hit_never_invokes_generator() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(CountingGenerator::new(Duration::ZERO));
        let coord = coordinator(store.clone(), generator.clone());

        let seeded = store
            .seed("Healthcare", Utc::now() + ChronoDuration::days(3))
            .await;
        let row = coord.resolve("Healthcare").await.unwrap();

        assert_eq!(generator.call_count(), 0);
        assert_eq!(row.id, seeded.id);
        assert_eq!(row.last_updated, seeded.last_updated);
    }

    #[tokio::test]
    async fn test_stale_row_triggers_exactly_one_refresh() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(CountingGenerator::new(Duration::ZERO));
        let coord = coordinator(store.clone(), generator.clone());

        let seeded = store
            .seed("Finance", Utc::now() - ChronoDuration::hours(1))
            .await;
        let row = coord.resolve("Finance").await.unwrap();

        assert_eq!(generator.call_count(), 1);
        // Refreshed in place: same key, same id, new TTL boundary.
        assert_eq!(row.id, seeded.id);
        assert!(row.next_update > Utc::now());
        assert_eq!(row.demand_level, "High");
    }

    #[tokio::test]
    async fn test_concurrent_resolves_converge_on_one_generation() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(CountingGenerator::new(Duration::from_millis(50)));
        let coord = coordinator(store, generator.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coord = Arc::clone(&coord);
                tokio::spawn(async move { coord.resolve("Software Engineering").await })
            })
            .collect();

        let mut rows = Vec::new();
        for handle in handles {
            rows.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(generator.call_count(), 1);
        let first = &rows[0];
        assert!(rows
            .iter()
            .all(|r| r.id == first.id && r.last_updated == first.last_updated));
    }

    #[tokio::test]
    async fn test_distinct_industries_do_not_serialize() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(CountingGenerator::new(Duration::from_millis(20)));
        let coord = coordinator(store, generator.clone());

        let a = {
            let coord = Arc::clone(&coord);
            tokio::spawn(async move { coord.resolve("Aerospace").await })
        };
        let b = {
            let coord = Arc::clone(&coord);
            tokio::spawn(async move { coord.resolve("Biotech").await })
        };

        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(generator.call_count(), 2);
        assert_ne!(a.industry, b.industry);
    }

    #[tokio::test]
    async fn test_failed_refresh_preserves_stale_row() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(FailingGenerator {
            calls: AtomicU32::new(0),
        });
        let coord = coordinator(store.clone(), generator.clone());

        let seeded = store
            .seed("Retail", Utc::now() - ChronoDuration::days(1))
            .await;

        let err = coord.resolve("Retail").await.unwrap_err();
        assert!(matches!(err, InsightError::Generation(_)));
        // One internal retry: two attempts total.
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);

        // The stale row is still there, byte for byte.
        let survivor = store.find_by_industry("Retail").await.unwrap().unwrap();
        assert_eq!(survivor.id, seeded.id);
        assert_eq!(survivor.last_updated, seeded.last_updated);
        assert_eq!(survivor.top_skills, seeded.top_skills);
    }

    #[tokio::test]
    async fn test_second_resolve_within_window_reuses_row() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(CountingGenerator::new(Duration::ZERO));
        let coord = coordinator(store, generator.clone());

        let first = coord.resolve("Software Engineering").await.unwrap();
        let second = coord.resolve("Software Engineering").await.unwrap();

        assert_eq!(generator.call_count(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(first.last_updated, second.last_updated);
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_industry() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let mut first = NewInsight::from_payload(
            "Logistics",
            &parse_insight(&sample_output()).unwrap(),
            now,
        )
        .unwrap();
        first.growth_rate = 1.0;
        let mut second = first.clone();
        second.growth_rate = 9.0;

        store.upsert(&first).await.unwrap();
        store.upsert(&second).await.unwrap();

        let rows = store.rows.lock().await;
        assert_eq!(rows.len(), 1);
        assert!((rows["Logistics"].growth_rate - 9.0).abs() < f64::EPSILON);
    }
}
