//! kodebate - multi-persona debate engine for trade decisions
//!
//! Runs a Bull/Bear investment debate and a Risky/Neutral/Safe risk debate
//! over a market snapshot, then synthesizes a single structured decision
//! with knockout levels.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kodebate::agents::InferenceBudget;
//! use kodebate::models::{AnalysisRequest, KodebateConfig};
//!
//! # async fn demo(snapshot: kodebate::models::MarketDataSnapshot) {
//! let config = KodebateConfig::default();
//! let budget = Arc::new(InferenceBudget::from_config(&config.budget));
//! let orchestrator = kodebate::build_orchestrator(&config, budget);
//! let decision = orchestrator.run(&AnalysisRequest::new("AAPL"), snapshot).await;
//! # }
//! ```

pub use kodebate_agents as agents;
pub use kodebate_models as models;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use kodebate_agents::{
    ClaudeCliProvider, EngineContext, InferenceBudget, Orchestrator, TracingEventSink,
};
use kodebate_models::{AnalysisRequest, KodebateConfig, MarketDataSnapshot, TradeDecision};
use serde::{Deserialize, Serialize};

/// One unit of work: what to analyze and the data to analyze it with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisInput {
    pub request: AnalysisRequest,
    pub snapshot: MarketDataSnapshot,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Inputs {
    One(AnalysisInput),
    Many(Vec<AnalysisInput>),
}

/// Parse a single input object or an array of them.
pub fn parse_inputs(json: &str) -> Result<Vec<AnalysisInput>> {
    let inputs: Inputs = serde_json::from_str(json).context("Failed to parse AnalysisInput JSON")?;
    Ok(match inputs {
        Inputs::One(input) => vec![input],
        Inputs::Many(inputs) => inputs,
    })
}

pub fn parse_config(toml_str: &str) -> Result<KodebateConfig> {
    toml::from_str(toml_str).context("Failed to parse config")
}

/// Load configuration from `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<KodebateConfig> {
    match path {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            parse_config(&config_str)
        }
        None => Ok(KodebateConfig::default()),
    }
}

/// Build an Orchestrator backed by the Claude CLI.
///
/// Orchestrators built with the same `budget` share its concurrency and call limits.
pub fn build_orchestrator(config: &KodebateConfig, budget: Arc<InferenceBudget>) -> Orchestrator {
    Orchestrator::new(EngineContext {
        provider: Arc::new(ClaudeCliProvider::from_config(&config.agents)),
        sink: Arc::new(TracingEventSink),
        budget,
        config: config.clone(),
    })
}

/// Analyze one input. Never fails; errors are reported in the decision.
pub async fn analyze(orchestrator: &Orchestrator, input: AnalysisInput) -> TradeDecision {
    orchestrator.run(&input.request, input.snapshot).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodebate_models::{ForcedDirection, Language, RiskProfile};

    const INPUT: &str = r#"{
        "request": {
            "symbol": "SAP",
            "language": "de",
            "forced_direction": "short",
            "risk_profile": "aggressive"
        },
        "snapshot": {
            "symbol": "SAP",
            "price": "231.40",
            "technical": "RSI 44",
            "fundamental": "Cloud backlog up",
            "news": "Earnings next week"
        }
    }"#;

    #[test]
    fn parses_single_input() {
        let inputs = parse_inputs(INPUT).unwrap();
        assert_eq!(inputs.len(), 1);
        let request = &inputs[0].request;
        assert_eq!(request.symbol, "SAP");
        assert_eq!(request.language, Language::De);
        assert_eq!(request.forced_direction, ForcedDirection::Short);
        assert_eq!(request.risk_profile, Some(RiskProfile::Aggressive));
        assert_eq!(inputs[0].snapshot.price.to_string(), "231.40");
        assert!(inputs[0].snapshot.chart.is_none());
    }

    #[test]
    fn parses_input_array() {
        let inputs = parse_inputs(&format!("[{INPUT}, {INPUT}]")).unwrap();
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn rejects_input_without_snapshot() {
        let err = parse_inputs(r#"{"request": {"symbol": "SAP"}}"#).unwrap_err();
        assert!(err.to_string().contains("AnalysisInput"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            [agents]
            investment_rounds = 3

            [budget]
            max_concurrent_calls = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.agents.investment_rounds, 3);
        assert_eq!(config.agents.request_timeout_seconds, 90);
        assert_eq!(config.budget.max_concurrent_calls, 2);
        assert_eq!(config.retry, KodebateConfig::default().retry);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let config = parse_config(include_str!("../../../config/kodebate.toml")).unwrap();
        assert_eq!(config, KodebateConfig::default());
    }

    #[test]
    fn missing_config_path_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/kodebate.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
        assert_eq!(load_config(None).unwrap(), KodebateConfig::default());
    }
}
