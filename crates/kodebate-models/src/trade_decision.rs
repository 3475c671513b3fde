use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::request::ForcedDirection;

pub const OUTPUT_SCHEMA_VERSION: u32 = 1;

/// Final directional call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    #[serde(alias = "long", alias = "Long")]
    Long,
    #[serde(alias = "short", alias = "Short")]
    Short,
    #[default]
    #[serde(alias = "hold", alias = "Hold")]
    Hold,
    #[serde(alias = "ignore", alias = "Ignore")]
    Ignore,
}

impl Signal {
    /// LONG or SHORT.
    pub fn is_directional(self) -> bool {
        matches!(self, Signal::Long | Signal::Short)
    }

    pub fn opposite(self) -> Option<Signal> {
        match self {
            Signal::Long => Some(Signal::Short),
            Signal::Short => Some(Signal::Long),
            Signal::Hold | Signal::Ignore => None,
        }
    }

    pub fn from_forced(direction: ForcedDirection) -> Option<Signal> {
        match direction {
            ForcedDirection::None => None,
            ForcedDirection::Long => Some(Signal::Long),
            ForcedDirection::Short => Some(Signal::Short),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Long => write!(f, "LONG"),
            Signal::Short => write!(f, "SHORT"),
            Signal::Hold => write!(f, "HOLD"),
            Signal::Ignore => write!(f, "IGNORE"),
        }
    }
}

/// Per-horizon signals. Horizons may disagree with the main signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Timeframes {
    /// Days to weeks.
    #[serde(default)]
    pub short_term: Signal,
    /// Weeks to months.
    #[serde(default)]
    pub medium_term: Signal,
    /// Months to years.
    #[serde(default)]
    pub long_term: Signal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// One knockout barrier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct KnockoutLevel {
    pub level: Decimal,
    /// Distance from the current price in percent, always positive.
    pub distance_pct: Decimal,
    pub risk: RiskTier,
}

/// The three knockout tiers. Conservative is farthest from price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Strategies {
    pub conservative: KnockoutLevel,
    pub moderate: KnockoutLevel,
    pub aggressive: KnockoutLevel,
}

impl Strategies {
    pub fn levels(&self) -> [Decimal; 3] {
        [
            self.conservative.level,
            self.moderate.level,
            self.aggressive.level,
        ]
    }
}

/// Direction to take if the caller insists on trading a HOLD.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldAlternative {
    pub direction: Signal,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategies: Option<Strategies>,
}

/// Sizing derived from the caller's budget and the moderate tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PositionPlan {
    pub stake: Decimal,
    /// A knockout means total loss of the stake.
    pub max_loss: Decimal,
    pub recommended_leverage: u32,
}

/// The sole output of one analysis.
///
/// Contains no timestamps or random identifiers: identical inputs produce
/// byte-identical serializations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeDecision {
    pub schema_version: u32,
    pub symbol: String,
    pub signal: Signal,
    /// 0.0 to 1.0.
    pub confidence: Decimal,
    pub timeframes: Timeframes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategies: Option<Strategies>,
    /// Nearest first.
    pub support_zones: Vec<Decimal>,
    /// Nearest first.
    pub resistance_zones: Vec<Decimal>,
    pub detailed_analysis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_alternative: Option<HoldAlternative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl TradeDecision {
    /// The structurally valid decision returned for every failure kind.
    pub fn ignored(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            schema_version: OUTPUT_SCHEMA_VERSION,
            symbol: symbol.into(),
            signal: Signal::Ignore,
            confidence: Decimal::ZERO,
            timeframes: Timeframes::default(),
            strategies: None,
            support_zones: Vec::new(),
            resistance_zones: Vec::new(),
            detailed_analysis: format!("Analysis aborted: {reason}"),
            hold_alternative: None,
            position: None,
            error_reason: Some(reason),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_reason.is_some()
    }
}
