use serde_json::Value;
use tracing::info;

pub const AGENT_ATTEMPT: &str = "agent_attempt";
pub const CONFIDENCE_CLAMPED: &str = "confidence_clamped";
pub const FORCED_DIRECTION_CONFLICT: &str = "forced_direction_conflict";
pub const PIPELINE_TRANSITION: &str = "pipeline_transition";
pub const PIPELINE_FAILED: &str = "pipeline_failed";

/// External observability sink. The engine only emits; delivery is the sink's business.
pub trait EventSink: Send + Sync {
    fn record_event(&self, name: &str, fields: Value);
}

/// Default sink: forwards every event to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record_event(&self, name: &str, fields: Value) {
        info!(event = name, fields = %fields, "engine event");
    }
}
