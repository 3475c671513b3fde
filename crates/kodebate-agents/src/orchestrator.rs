use std::sync::Arc;
use std::time::{Duration, Instant};

use kodebate_models::{
    AgentsConfig, AnalysisRequest, DebateTranscript, DebateTurn, InvestmentVerdict,
    KodebateConfig, MarketDataSnapshot, Opinion, Persona, RiskVerdict, TradeDecision,
};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::budget::InferenceBudget;
use crate::context::DebateContext;
use crate::error::AgentError;
use crate::events::{self, EventSink};
use crate::inference::InferenceProvider;
use crate::invoker::{AgentInvoker, RetryPolicy};
use crate::sources::{ChartRenderer, SnapshotSource};
use crate::state::{PipelineState, PipelineStateMachine, TransitionRecord};
use crate::synthesizer::DecisionSynthesizer;

/// Everything an orchestrator needs, constructed by the caller.
pub struct EngineContext {
    pub provider: Arc<dyn InferenceProvider>,
    pub sink: Arc<dyn EventSink>,
    /// Shared across every orchestrator that should draw from the same limits.
    pub budget: Arc<InferenceBudget>,
    pub config: KodebateConfig,
}

/// A finished analysis with its debate and state history.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub decision: TradeDecision,
    pub transcript: DebateTranscript,
    pub transitions: Vec<TransitionRecord>,
}

/// Runs one analysis as a sequential pipeline:
/// investment debate, investment judge, risk debate, risk judge, synthesis.
pub struct Orchestrator {
    invoker: AgentInvoker,
    synthesizer: DecisionSynthesizer,
    sink: Arc<dyn EventSink>,
    config: AgentsConfig,
    snapshots: Option<Arc<dyn SnapshotSource>>,
    charts: Option<Arc<dyn ChartRenderer>>,
}

fn turn_from(persona: Persona, round: u32, opinion: &Opinion) -> DebateTurn {
    DebateTurn {
        persona,
        round,
        argument: opinion.argument().to_string(),
        lean: opinion.lean(),
        confidence: opinion.confidence(),
    }
}

fn shape_mismatch(persona: Persona) -> AgentError {
    AgentError::SchemaValidationFailed {
        persona,
        attempts: 1,
        last_error: "validated answer has the wrong shape".to_string(),
    }
}

fn investment_verdict(opinion: Opinion) -> Result<InvestmentVerdict, AgentError> {
    match opinion {
        Opinion::Investment(verdict) => Ok(verdict),
        _ => Err(shape_mismatch(Persona::InvestmentJudge)),
    }
}

fn risk_verdict(opinion: Opinion) -> Result<RiskVerdict, AgentError> {
    match opinion {
        Opinion::Risk(verdict) => Ok(verdict),
        _ => Err(shape_mismatch(Persona::RiskJudge)),
    }
}

impl Orchestrator {
    pub fn new(engine: EngineContext) -> Self {
        let EngineContext {
            provider,
            sink,
            budget,
            config,
        } = engine;

        let invoker = AgentInvoker::new(
            provider,
            Arc::clone(&sink),
            budget,
            RetryPolicy::from_config(&config.retry),
            Duration::from_secs(config.agents.call_timeout_seconds),
        );
        let synthesizer = DecisionSynthesizer::new(
            config.synthesis.clone(),
            config.knockout.clone(),
            Arc::clone(&sink),
        );

        Self {
            invoker,
            synthesizer,
            sink,
            config: config.agents,
            snapshots: None,
            charts: None,
        }
    }

    pub fn with_snapshot_source(mut self, source: Arc<dyn SnapshotSource>) -> Self {
        self.snapshots = Some(source);
        self
    }

    pub fn with_chart_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.charts = Some(renderer);
        self
    }

    /// Analyze `request` against a snapshot the caller already holds.
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        snapshot: MarketDataSnapshot,
    ) -> TradeDecision {
        self.run_traced(request, snapshot).await.decision
    }

    /// Like [`run`](Self::run), also returning the transcript and transition log.
    ///
    /// Never fails: every error becomes an IGNORE decision with `error_reason` set.
    pub async fn run_traced(
        &self,
        request: &AnalysisRequest,
        snapshot: MarketDataSnapshot,
    ) -> AnalysisRun {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("analysis", %run_id, symbol = %request.symbol);

        async {
            let start = Instant::now();
            info!(
                forced = ?request.forced_direction,
                language = ?request.language,
                "Starting analysis"
            );

            let request = Arc::new(request.clone());
            let snapshot = Arc::new(snapshot);
            let mut machine = PipelineStateMachine::new();
            let mut transcript = DebateTranscript::default();
            let timeout = Duration::from_secs(self.config.request_timeout_seconds);

            let outcome = tokio::time::timeout(
                timeout,
                self.debate(&request, &snapshot, &mut machine, &mut transcript),
            )
            .await;

            let decision = match outcome {
                Ok(Ok(decision)) => decision,
                Ok(Err(err)) => self.abort(&mut machine, &request, &err),
                Err(_) => self.abort(
                    &mut machine,
                    &request,
                    &AgentError::Timeout(timeout.as_secs()),
                ),
            };

            info!(
                signal = %decision.signal,
                confidence = %decision.confidence,
                path = %machine.summary(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Analysis complete"
            );

            AnalysisRun {
                decision,
                transcript,
                transitions: machine.into_transitions(),
            }
        }
        .instrument(span)
        .await
    }

    /// Fetch the snapshot (and a chart, if a renderer is set), then run.
    pub async fn analyze(&self, request: &AnalysisRequest) -> TradeDecision {
        let symbol = request.symbol.as_str();
        let Some(source) = &self.snapshots else {
            let err = AgentError::DataUnavailable("no snapshot source configured".to_string());
            return self.abort(&mut PipelineStateMachine::new(), request, &err);
        };

        let timeout = Duration::from_secs(self.config.snapshot_timeout_seconds);
        let fetched = tokio::time::timeout(timeout, source.fetch_snapshot(symbol)).await;
        let mut snapshot = match fetched {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => return self.abort(&mut PipelineStateMachine::new(), request, &err),
            Err(_) => {
                let err = AgentError::DataUnavailable(format!(
                    "snapshot fetch timed out after {}s",
                    timeout.as_secs()
                ));
                return self.abort(&mut PipelineStateMachine::new(), request, &err);
            }
        };

        if snapshot.chart.is_none() {
            if let Some(renderer) = &self.charts {
                match tokio::time::timeout(timeout, renderer.render_chart(symbol)).await {
                    Ok(chart) => snapshot.chart = chart,
                    Err(_) => warn!(%symbol, "Chart rendering timed out, continuing text-only"),
                }
            }
        }

        self.run(request, snapshot).await
    }

    async fn debate(
        &self,
        request: &Arc<AnalysisRequest>,
        snapshot: &Arc<MarketDataSnapshot>,
        machine: &mut PipelineStateMachine,
        transcript: &mut DebateTranscript,
    ) -> Result<TradeDecision, AgentError> {
        let missing = snapshot.missing_fields();
        if !missing.is_empty() {
            return Err(AgentError::DataUnavailable(format!(
                "snapshot for {} is missing {}",
                request.symbol,
                missing.join(", ")
            )));
        }

        let base = DebateContext::new(Arc::clone(request), Arc::clone(snapshot));

        // Investment debate: strict Bull/Bear alternation, each sees everything so far.
        self.advance(machine, PipelineState::InvestmentDebate, None)?;
        let mut context = base.clone();
        for round in 1..=self.config.investment_rounds.max(1) {
            for persona in [Persona::Bull, Persona::Bear] {
                let opinion = self.invoker.invoke(persona, &context).await?;
                let turn = turn_from(persona, round, &opinion);
                transcript.push(turn.clone());
                context = context.with_turn(turn);
            }
        }

        let opinion = self.invoker.invoke(Persona::InvestmentJudge, &context).await?;
        let judge_turn = turn_from(Persona::InvestmentJudge, 0, &opinion);
        let verdict = investment_verdict(opinion)?;
        transcript.push(judge_turn.clone());
        info!(signal = %verdict.signal, "Investment judge decided");
        self.advance(
            machine,
            PipelineState::InvestmentJudged,
            Some(&format!("signal {}", verdict.signal)),
        )?;

        // Risk debate: the three analysts see the judgement, never each other.
        self.advance(machine, PipelineState::RiskDebate, None)?;
        let risk_context = base.with_turn(judge_turn);
        for persona in Persona::RISK_ANALYSTS {
            let opinion = self.invoker.invoke(persona, &risk_context).await?;
            transcript.push(turn_from(persona, 0, &opinion));
        }

        let judge_context = risk_context.with_turns(&transcript.risk);
        let opinion = self.invoker.invoke(Persona::RiskJudge, &judge_context).await?;
        transcript.push(turn_from(Persona::RiskJudge, 0, &opinion));
        let verdict = risk_verdict(opinion)?;
        self.advance(
            machine,
            PipelineState::RiskJudged,
            Some(&format!("signal {}", verdict.signal)),
        )?;

        let decision = self
            .synthesizer
            .synthesize(transcript, &verdict, request, snapshot);
        self.advance(machine, PipelineState::Done, None)?;
        Ok(decision)
    }

    fn advance(
        &self,
        machine: &mut PipelineStateMachine,
        to: PipelineState,
        reason: Option<&str>,
    ) -> Result<(), AgentError> {
        let from = machine.current();
        machine.advance(to, reason)?;
        self.sink.record_event(
            events::PIPELINE_TRANSITION,
            serde_json::json!({
                "from": from.to_string(),
                "to": to.to_string(),
                "reason": reason,
            }),
        );
        Ok(())
    }

    fn abort(
        &self,
        machine: &mut PipelineStateMachine,
        request: &AnalysisRequest,
        err: &AgentError,
    ) -> TradeDecision {
        let state = machine.current();
        let reason = err.to_string();
        error!(
            symbol = %request.symbol,
            %state,
            kind = err.kind(),
            error = %reason,
            "Analysis failed"
        );

        if let Err(illegal) = machine.fail(&reason) {
            warn!(error = %illegal, "Pipeline already terminal");
        }
        self.sink.record_event(
            events::PIPELINE_FAILED,
            serde_json::json!({
                "symbol": request.symbol,
                "state": state.to_string(),
                "kind": err.kind(),
                "reason": reason,
            }),
        );

        TradeDecision::ignored(request.symbol.clone(), reason)
    }
}
