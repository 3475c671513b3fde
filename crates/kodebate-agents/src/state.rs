//! Pipeline states and legal transition guards.
//!
//! Every analysis starts at `DataReady` and ends at `Done` or `Failed`.
//! Each transition is checked against the edge table and logged, so a run
//! can be reconstructed from its transition log.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Snapshot accepted, nothing invoked yet.
    DataReady,
    /// Bull/Bear rounds in progress.
    InvestmentDebate,
    /// Investment judge has set the directional signal.
    InvestmentJudged,
    /// Risky/Neutral/Safe opinions being collected.
    RiskDebate,
    /// Risk judge has answered; synthesis pending.
    RiskJudged,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataReady => write!(f, "DataReady"),
            Self::InvestmentDebate => write!(f, "InvestmentDebate"),
            Self::InvestmentJudged => write!(f, "InvestmentJudged"),
            Self::RiskDebate => write!(f, "RiskDebate"),
            Self::RiskJudged => write!(f, "RiskJudged"),
            Self::Done => write!(f, "Done"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// ```text
/// DataReady → InvestmentDebate → InvestmentJudged → RiskDebate → RiskJudged → Done
/// any non-terminal → Failed
/// ```
fn is_legal_transition(from: PipelineState, to: PipelineState) -> bool {
    use PipelineState::*;

    if to == Failed && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (DataReady, InvestmentDebate)
            | (InvestmentDebate, InvestmentJudged)
            | (InvestmentJudged, RiskDebate)
            | (RiskDebate, RiskJudged)
            | (RiskJudged, Done)
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: PipelineState,
    pub to: PipelineState,
    /// Milliseconds since the pipeline started.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Error)]
#[error("Illegal state transition: {from} → {to}")]
pub struct IllegalTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

pub struct PipelineStateMachine {
    current: PipelineState,
    started_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl PipelineStateMachine {
    pub fn new() -> Self {
        Self {
            current: PipelineState::DataReady,
            started_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> PipelineState {
        self.current
    }

    pub fn advance(
        &mut self,
        to: PipelineState,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(from = %self.current, to = %to, "Pipeline transition");

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    /// Move to `Failed`. Legal from every non-terminal state.
    pub fn fail(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(PipelineState::Failed, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    /// `DataReady → ... → current` in one line, for logs.
    pub fn summary(&self) -> String {
        let path: Vec<String> = std::iter::once(PipelineState::DataReady)
            .chain(self.transitions.iter().map(|t| t.to))
            .map(|s| s.to_string())
            .collect();
        format!(
            "{} ({}ms)",
            path.join(" → "),
            self.started_at.elapsed().as_millis()
        )
    }
}

impl Default for PipelineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
