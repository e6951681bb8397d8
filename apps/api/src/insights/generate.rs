//! Model boundary for insight generation — a trait so the coordinator can be
//! exercised in tests with counting/failing doubles, the same seam shape the
//! rest of the app uses for pluggable backends.
//!
//! Carried by the coordinator as `Arc<dyn InsightGenerator>`.

use async_trait::async_trait;

use crate::insights::prompts::{INSIGHT_PROMPT_TEMPLATE, INSIGHT_SYSTEM};
use crate::insights::InsightError;
use crate::llm_client::LlmClient;

/// One text-in/text-out generation attempt for an industry. Implementations
/// hold no state between calls; prompt construction is owned here, not by
/// callers.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, industry: &str) -> Result<String, InsightError>;
}

/// Production generator backed by the Claude client.
pub struct LlmInsightGenerator {
    llm: LlmClient,
}

impl LlmInsightGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl InsightGenerator for LlmInsightGenerator {
    async fn generate(&self, industry: &str) -> Result<String, InsightError> {
        let prompt = INSIGHT_PROMPT_TEMPLATE.replace("{industry}", industry);
        self.llm
            .call_text(&prompt, INSIGHT_SYSTEM)
            .await
            .map_err(|e| InsightError::Generation(e.to_string()))
    }
}
