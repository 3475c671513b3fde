use std::sync::Arc;

use kodebate_models::{AnalysisRequest, DebateTurn, MarketDataSnapshot};

/// What one persona is allowed to see: the request, the snapshot and the
/// turns visible to it. Never mutated; `with_turn` returns a new context.
#[derive(Debug, Clone)]
pub struct DebateContext {
    request: Arc<AnalysisRequest>,
    snapshot: Arc<MarketDataSnapshot>,
    turns: Vec<DebateTurn>,
}

impl DebateContext {
    pub fn new(request: Arc<AnalysisRequest>, snapshot: Arc<MarketDataSnapshot>) -> Self {
        Self {
            request,
            snapshot,
            turns: Vec::new(),
        }
    }

    pub fn with_turn(&self, turn: DebateTurn) -> Self {
        let mut turns = Vec::with_capacity(self.turns.len() + 1);
        turns.extend_from_slice(&self.turns);
        turns.push(turn);
        Self {
            request: Arc::clone(&self.request),
            snapshot: Arc::clone(&self.snapshot),
            turns,
        }
    }

    pub fn with_turns<'a>(&self, turns: impl IntoIterator<Item = &'a DebateTurn>) -> Self {
        turns
            .into_iter()
            .fold(self.clone(), |context, turn| context.with_turn(turn.clone()))
    }

    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    pub fn snapshot(&self) -> &MarketDataSnapshot {
        &self.snapshot
    }

    pub fn turns(&self) -> &[DebateTurn] {
        &self.turns
    }
}
