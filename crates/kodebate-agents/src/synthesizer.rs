//! Folds a finished debate into the final [`TradeDecision`].

use std::sync::Arc;

use kodebate_models::{
    AnalysisRequest, DebateTranscript, HoldAlternative, KnockoutConfig, MarketDataSnapshot,
    Persona, RawZone, RiskVerdict, Signal, SynthesisConfig, Timeframes, TradeDecision,
    OUTPUT_SCHEMA_VERSION,
};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::events::{self, EventSink};
use crate::knockout;
use crate::language::LanguageProfile;

pub struct DecisionSynthesizer {
    synthesis: SynthesisConfig,
    knockout: KnockoutConfig,
    sink: Arc<dyn EventSink>,
}

/// Positive, deduplicated zone prices. Support runs descending, resistance ascending.
fn clean_zones(zones: &[RawZone], descending: bool) -> Vec<Decimal> {
    let mut levels: Vec<Decimal> = zones
        .iter()
        .map(RawZone::level)
        .filter(|level| *level > Decimal::ZERO)
        .collect();
    levels.sort();
    levels.dedup();
    if descending {
        levels.reverse();
    }
    levels
}

fn horizon(signal: Signal) -> Signal {
    match signal {
        Signal::Ignore => Signal::Hold,
        other => other,
    }
}

fn clean_timeframes(timeframes: Timeframes) -> Timeframes {
    Timeframes {
        short_term: horizon(timeframes.short_term),
        medium_term: horizon(timeframes.medium_term),
        long_term: horizon(timeframes.long_term),
    }
}

impl DecisionSynthesizer {
    pub fn new(
        synthesis: SynthesisConfig,
        knockout: KnockoutConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            synthesis,
            knockout,
            sink,
        }
    }

    fn clamp_confidence(&self, symbol: &str, raw: Decimal) -> Decimal {
        let clamped = raw.clamp(Decimal::ZERO, Decimal::ONE);
        if clamped != raw {
            warn!(%symbol, %raw, %clamped, "Risk judge confidence out of range");
            self.sink.record_event(
                events::CONFIDENCE_CLAMPED,
                serde_json::json!({
                    "symbol": symbol,
                    "raw": raw.to_string(),
                    "clamped": clamped.to_string(),
                }),
            );
        }
        clamped
    }

    /// Confidence after overriding `judged` with `forced`. Never higher than before.
    fn penalized(&self, confidence: Decimal, forced: Signal, judged: Signal) -> Decimal {
        let penalty = if judged.opposite() == Some(forced) {
            self.synthesis.opposite_conflict_penalty
        } else {
            self.synthesis.neutral_conflict_penalty
        };
        let keep = Decimal::ONE - penalty.clamp(Decimal::ZERO, Decimal::ONE);
        (confidence * keep).min(confidence)
    }

    /// Build the decision from the risk judge's verdict and the full transcript.
    pub fn synthesize(
        &self,
        transcript: &DebateTranscript,
        verdict: &RiskVerdict,
        request: &AnalysisRequest,
        snapshot: &MarketDataSnapshot,
    ) -> TradeDecision {
        let symbol = request.symbol.as_str();
        let language = LanguageProfile::for_language(request.language);
        let settings = request.effective_profile().settings();

        let mut confidence = self.clamp_confidence(symbol, verdict.confidence);
        let mut detailed_analysis = verdict.detailed_analysis.trim().to_string();
        let mut error_reason = None;

        let judged = if verdict.unable_to_assess {
            Signal::Ignore
        } else {
            verdict.signal
        };

        let signal = match Signal::from_forced(request.forced_direction) {
            Some(forced) if forced != judged => {
                let before = confidence;
                confidence = self.penalized(confidence, forced, judged);
                let note = language.conflict_note(forced, judged);
                info!(
                    %symbol,
                    %forced,
                    %judged,
                    %before,
                    after = %confidence,
                    "Forced direction overrides judge"
                );
                self.sink.record_event(
                    events::FORCED_DIRECTION_CONFLICT,
                    serde_json::json!({
                        "symbol": symbol,
                        "forced": forced.to_string(),
                        "judged": judged.to_string(),
                        "confidence_before": before.to_string(),
                        "confidence_after": confidence.to_string(),
                    }),
                );
                detailed_analysis = if detailed_analysis.is_empty() {
                    note
                } else {
                    format!("{note}\n\n{detailed_analysis}")
                };
                forced
            }
            Some(forced) => forced,
            None if judged == Signal::Ignore => {
                confidence = Decimal::ZERO;
                error_reason = Some(
                    verdict
                        .unable_to_assess_reason
                        .clone()
                        .filter(|reason| !reason.trim().is_empty())
                        .unwrap_or_else(|| "risk judge was unable to assess the asset".to_string()),
                );
                Signal::Ignore
            }
            None => judged,
        };

        let support_zones = clean_zones(&verdict.support_zones, true);
        let resistance_zones = clean_zones(&verdict.resistance_zones, false);

        let levels_for = |direction: Signal| {
            knockout::compute(
                snapshot.price,
                direction,
                &support_zones,
                &resistance_zones,
                &settings,
                &self.knockout,
            )
        };

        let strategies = levels_for(signal);
        if strategies.is_none() && signal.is_directional() && error_reason.is_none() {
            warn!(%symbol, %signal, price = %snapshot.price, "No valid knockout levels");
            error_reason = Some(format!(
                "no valid knockout levels for {signal} at price {}",
                snapshot.price
            ));
        }
        let position = match (request.budget, &strategies) {
            (Some(budget), Some(strategies)) => {
                knockout::size_position(budget, strategies, &settings, &self.knockout)
            }
            _ => None,
        };

        let hold_alternative = if signal == Signal::Hold {
            self.hold_alternative(transcript, verdict)
                .map(|(direction, rationale)| HoldAlternative {
                    direction,
                    rationale,
                    strategies: levels_for(direction),
                })
        } else {
            None
        };

        TradeDecision {
            schema_version: OUTPUT_SCHEMA_VERSION,
            symbol: symbol.to_string(),
            signal,
            confidence,
            timeframes: clean_timeframes(verdict.timeframes),
            strategies,
            support_zones,
            resistance_zones,
            detailed_analysis,
            hold_alternative,
            position,
            error_reason,
        }
    }

    /// Direction for a caller who trades a HOLD anyway: the judge's suggestion,
    /// else the investment judge's lean.
    fn hold_alternative(
        &self,
        transcript: &DebateTranscript,
        verdict: &RiskVerdict,
    ) -> Option<(Signal, String)> {
        if let Some(alt) = verdict
            .hold_alternative
            .as_ref()
            .filter(|alt| alt.direction.is_directional())
        {
            return Some((alt.direction, alt.rationale.trim().to_string()));
        }

        transcript
            .last_by(Persona::InvestmentJudge)
            .and_then(|turn| turn.lean.filter(|lean| lean.is_directional()))
            .map(|lean| (lean, format!("Investment judge leaned {lean}.")))
    }
}
