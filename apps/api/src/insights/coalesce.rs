//! Per-industry generation locks. Concurrent `resolve` calls for the same
//! industry serialize through one lock so only one of them pays for the
//! model call; calls for different industries never block each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-industry lock handles, created lazily on first use and
/// kept for the life of the process. The registry mutex is held only long
/// enough to clone the per-key handle — never across a model call.
pub struct IndustryCoalescer {
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IndustryCoalescer {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the generation lock for `industry`. The returned guard is
    /// RAII: dropping it (on success, error, or timeout) releases the lock.
    pub async fn acquire(&self, industry: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(industry.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

impl Default for IndustryCoalescer {
    fn default() -> Self {
        Self::new()
    }
}
