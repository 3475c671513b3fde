use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level configuration for kodebate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct KodebateConfig {
    pub agents: AgentsConfig,
    pub retry: RetryConfig,
    pub budget: BudgetConfig,
    pub knockout: KnockoutConfig,
    pub synthesis: SynthesisConfig,
}

/// Debate shape, models and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    /// Bull/Bear rounds before the investment judge speaks.
    pub investment_rounds: u32,
    /// Soft timeout for one whole analysis in seconds.
    pub request_timeout_seconds: u64,
    /// Timeout for one inference call in seconds.
    pub call_timeout_seconds: u64,
    /// Timeout for the snapshot fetch in seconds.
    pub snapshot_timeout_seconds: u64,
    /// Model used by the two judges.
    pub judge_model: String,
    /// Model used by the five debaters.
    pub debater_model: String,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            investment_rounds: 2,
            request_timeout_seconds: 90,
            call_timeout_seconds: 45,
            snapshot_timeout_seconds: 20,
            judge_model: "claude-sonnet-4-5-20250929".to_string(),
            debater_model: "claude-3-5-haiku-latest".to_string(),
        }
    }
}

/// Retry policy shared by the validation and provider retry paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Schema validation attempts per persona turn.
    pub max_attempts: u32,
    /// Backoff retries after rate limiting or transient provider failures.
    pub max_provider_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_provider_retries: 3,
            initial_backoff_ms: 5_000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2,
        }
    }
}

/// Shared inference budget across concurrently running analyses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BudgetConfig {
    /// Inference calls allowed in flight at once.
    pub max_concurrent_calls: u32,
    /// Total inference calls allowed for the process. None = unlimited.
    pub max_total_calls: Option<u64>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 4,
            max_total_calls: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KnockoutConfig {
    /// Minimum spacing in percent of price between adjacent levels and between
    /// price and the nearest level.
    pub min_spacing_pct: Decimal,
    /// Share of the budget used as stake when sizing a position.
    pub stake_fraction: Decimal,
}

impl Default for KnockoutConfig {
    fn default() -> Self {
        Self {
            min_spacing_pct: Decimal::new(5, 1),
            stake_fraction: Decimal::new(3, 1),
        }
    }
}

/// Confidence penalties applied when a forced direction overrides the judge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Fraction of confidence removed when the judge chose the opposite direction.
    pub opposite_conflict_penalty: Decimal,
    /// Fraction of confidence removed when the judge chose HOLD or IGNORE.
    pub neutral_conflict_penalty: Decimal,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            opposite_conflict_penalty: Decimal::new(5, 1),
            neutral_conflict_penalty: Decimal::new(25, 2),
        }
    }
}
