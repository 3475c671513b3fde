use std::sync::atomic::{AtomicU64, Ordering};

use kodebate_models::BudgetConfig;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::warn;

use crate::error::AgentError;

/// Inference budget shared by every pipeline in the process.
///
/// Bounds calls in flight with a semaphore and counts total calls.
/// The in-flight slot is released when the returned permit drops.
pub struct InferenceBudget {
    slots: Semaphore,
    max_concurrent: usize,
    max_total: Option<u64>,
    used: AtomicU64,
}

/// Held for the duration of one inference call.
pub struct BudgetPermit<'a> {
    _slot: SemaphorePermit<'a>,
}

impl InferenceBudget {
    pub fn new(max_concurrent: u32, max_total: Option<u64>) -> Self {
        Self::with_slots(max_concurrent.max(1) as usize, max_total)
    }

    fn with_slots(max_concurrent: usize, max_total: Option<u64>) -> Self {
        Self {
            slots: Semaphore::new(max_concurrent),
            max_concurrent,
            max_total,
            used: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &BudgetConfig) -> Self {
        Self::new(config.max_concurrent_calls, config.max_total_calls)
    }

    pub fn unlimited() -> Self {
        Self::with_slots(Semaphore::MAX_PERMITS, None)
    }

    /// Reserve one call. Waits for a free slot; fails once the total budget is spent.
    ///
    /// The call is counted only after a slot is held, so a wait abandoned
    /// by a timeout costs nothing.
    pub async fn acquire(&self) -> Result<BudgetPermit<'_>, AgentError> {
        let slot = self.slots.acquire().await.map_err(|_| {
            AgentError::ProviderUnavailable("inference budget closed".to_string())
        })?;

        let used = self.used.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(max) = self.max_total {
            if used > max {
                self.used.fetch_sub(1, Ordering::SeqCst);
                warn!(max_total = max, "Inference call budget exhausted");
                return Err(AgentError::ProviderUnavailable(format!(
                    "inference call budget of {max} exhausted"
                )));
            }
        }

        Ok(BudgetPermit { _slot: slot })
    }

    /// Calls reserved so far.
    pub fn calls_made(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.slots.available_permits()
    }
}
