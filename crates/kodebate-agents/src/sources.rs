use async_trait::async_trait;
use kodebate_models::{ChartHandle, MarketDataSnapshot};

use crate::error::AgentError;

/// Market data retrieval collaborator. May retry or fall back internally.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<MarketDataSnapshot, AgentError>;
}

/// Optional chart rendering collaborator. `None` means text-only analysis.
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render_chart(&self, symbol: &str) -> Option<ChartHandle>;
}
