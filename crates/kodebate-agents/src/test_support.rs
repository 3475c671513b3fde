//! Test doubles and fixtures shared by unit and integration tests.
//!
//! `ScriptedProvider` answers per persona from a script, `RecordingSink`
//! keeps every event, and the fixture functions build snapshots and
//! well-formed persona answers.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use kodebate_models::{AnalysisRequest, Language, MarketDataSnapshot, Persona, Signal};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::context::DebateContext;
use crate::error::InferenceError;
use crate::events::EventSink;
use crate::inference::{InferenceProvider, Prompt};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One scripted provider answer.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(InferenceError),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    pub fn fail(err: InferenceError) -> Self {
        Reply::Fail(err)
    }

    fn into_result(self) -> Result<String, InferenceError> {
        match self {
            Reply::Text(text) => Ok(text),
            Reply::Fail(err) => Err(err),
        }
    }
}

/// Inference provider answering from a per-persona script.
///
/// Queued replies are consumed first; after that the persona's standing
/// reply repeats. A persona with neither fails fatally.
#[derive(Default)]
pub struct ScriptedProvider {
    queued: Mutex<HashMap<Persona, VecDeque<Reply>>>,
    standing: HashMap<Persona, Reply>,
    calls: Mutex<Vec<(Prompt, Language)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standing text reply for `persona`.
    pub fn reply(mut self, persona: Persona, text: impl Into<String>) -> Self {
        self.standing.insert(persona, Reply::text(text));
        self
    }

    /// Standing failure for `persona`.
    pub fn fail(mut self, persona: Persona, err: InferenceError) -> Self {
        self.standing.insert(persona, Reply::fail(err));
        self
    }

    /// One-shot reply, consumed before the standing one.
    pub fn queue(self, persona: Persona, reply: Reply) -> Self {
        lock(&self.queued).entry(persona).or_default().push_back(reply);
        self
    }

    /// Debate that ends LONG with support at 245/250/255.
    pub fn bullish() -> Self {
        Self::new()
            .reply(Persona::Bull, bull_json())
            .reply(Persona::Bear, bear_json())
            .reply(Persona::InvestmentJudge, investment_judge_json(Signal::Long))
            .reply(Persona::Risky, debater_json("Tight stops, press the trend", Signal::Long))
            .reply(Persona::Neutral, debater_json("Size moderately", Signal::Long))
            .reply(Persona::Safe, debater_json("Keep knockouts wide", Signal::Hold))
            .reply(
                Persona::RiskJudge,
                risk_judge_json(
                    Signal::Long,
                    "0.72",
                    &["245.00", "250.00", "255.00"],
                    &["268.00", "275.00"],
                ),
            )
    }

    /// Debate that ends SHORT with resistance above 30.10.
    pub fn bearish() -> Self {
        Self::new()
            .reply(Persona::Bull, bull_json())
            .reply(Persona::Bear, bear_json())
            .reply(Persona::InvestmentJudge, investment_judge_json(Signal::Short))
            .reply(Persona::Risky, debater_json("Short the breakdown now", Signal::Short))
            .reply(Persona::Neutral, debater_json("Half size below resistance", Signal::Short))
            .reply(Persona::Safe, debater_json("Wait for a retest", Signal::Hold))
            .reply(
                Persona::RiskJudge,
                risk_judge_json(Signal::Short, "0.64", &["28.90"], &["31.20", "32.50", "34.00"]),
            )
    }

    pub fn prompts_for(&self, persona: Persona) -> Vec<Prompt> {
        lock(&self.calls)
            .iter()
            .filter(|(prompt, _)| prompt.persona == persona)
            .map(|(prompt, _)| prompt.clone())
            .collect()
    }

    pub fn calls_for(&self, persona: Persona) -> usize {
        self.prompts_for(persona).len()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Personas in call order.
    pub fn call_order(&self) -> Vec<Persona> {
        lock(&self.calls).iter().map(|(prompt, _)| prompt.persona).collect()
    }
}

#[async_trait]
impl InferenceProvider for ScriptedProvider {
    async fn complete_structured(
        &self,
        prompt: &Prompt,
        language: Language,
    ) -> Result<String, InferenceError> {
        lock(&self.calls).push((prompt.clone(), language));

        let queued = lock(&self.queued)
            .get_mut(&prompt.persona)
            .and_then(VecDeque::pop_front);
        match queued.or_else(|| self.standing.get(&prompt.persona).cloned()) {
            Some(reply) => reply.into_result(),
            None => Err(InferenceError::Fatal(format!(
                "no scripted reply for {}",
                prompt.persona
            ))),
        }
    }
}

/// Event sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(String, Value)> {
        lock(&self.events).clone()
    }

    pub fn events_named(&self, name: &str) -> Vec<Value> {
        lock(&self.events)
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, fields)| fields.clone())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn record_event(&self, name: &str, fields: Value) {
        lock(&self.events).push((name.to_string(), fields));
    }
}

pub fn snapshot_with_price(symbol: &str, price: Decimal) -> MarketDataSnapshot {
    MarketDataSnapshot {
        symbol: symbol.to_string(),
        asset_name: None,
        asset_type: None,
        price,
        technical: "RSI 58, price above the 50-day average, MACD line above signal".to_string(),
        fundamental: "Forward P/E 29, services revenue growing double digits".to_string(),
        news: "Product event next week; analysts raised targets".to_string(),
        chart: None,
        as_of: None,
    }
}

/// Snapshot priced at 260.25.
pub fn sample_snapshot(symbol: &str) -> MarketDataSnapshot {
    snapshot_with_price(symbol, Decimal::new(26025, 2))
}

pub fn sample_context() -> DebateContext {
    DebateContext::new(
        Arc::new(AnalysisRequest::new("AAPL")),
        Arc::new(sample_snapshot("AAPL")),
    )
}

pub fn debater_json(argument: &str, lean: Signal) -> String {
    serde_json::json!({
        "argument": argument,
        "lean": lean.to_string(),
        "confidence": 0.6,
    })
    .to_string()
}

pub fn bull_json() -> String {
    debater_json("Momentum and earnings revisions point higher", Signal::Long)
}

pub fn bear_json() -> String {
    debater_json("Valuation is stretched and volume is fading", Signal::Short)
}

pub fn investment_judge_json(signal: Signal) -> String {
    serde_json::json!({
        "argument": format!("The stronger evidence supports {signal}"),
        "signal": signal.to_string(),
        "confidence": 0.7,
    })
    .to_string()
}

/// Risk judge answer. Zone prices are given as strings to keep them exact.
pub fn risk_judge_json(
    signal: Signal,
    confidence: &str,
    support: &[&str],
    resistance: &[&str],
) -> String {
    let zones = |levels: &[&str]| -> Vec<Value> {
        levels
            .iter()
            .map(|level| serde_json::json!({"level_usd": level, "description": "scripted"}))
            .collect()
    };
    let body = serde_json::json!({
        "signal": signal.to_string(),
        "confidence": confidence,
        "unable_to_assess": false,
        "timeframes": {
            "short_term": "HOLD",
            "medium_term": signal.to_string(),
            "long_term": signal.to_string(),
        },
        "support_zones": zones(support),
        "resistance_zones": zones(resistance),
        "detailed_analysis": format!("The debate favours {signal}."),
        "hold_alternative": null,
    });
    format!("```json\n{body:#}\n```")
}
