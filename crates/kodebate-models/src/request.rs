use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Output language for every persona and the final analysis text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

/// Caller-imposed direction for the final signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForcedDirection {
    #[default]
    None,
    Long,
    Short,
}

/// Risk appetite of the caller. Drives knockout buffers and leverage caps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
    Yolo,
}

/// Numeric settings attached to a [`RiskProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskSettings {
    pub max_leverage: u32,
    /// Stop-loss tolerance in percent of price.
    pub stop_loss_pct: Decimal,
    /// Extra distance in percent placed beyond a support/resistance zone.
    pub knockout_buffer_pct: Decimal,
}

impl RiskProfile {
    pub fn settings(self) -> RiskSettings {
        match self {
            RiskProfile::Conservative => RiskSettings {
                max_leverage: 2,
                stop_loss_pct: Decimal::from(5),
                knockout_buffer_pct: Decimal::from(8),
            },
            RiskProfile::Moderate => RiskSettings {
                max_leverage: 5,
                stop_loss_pct: Decimal::from(8),
                knockout_buffer_pct: Decimal::from(5),
            },
            RiskProfile::Aggressive => RiskSettings {
                max_leverage: 10,
                stop_loss_pct: Decimal::from(15),
                knockout_buffer_pct: Decimal::from(3),
            },
            RiskProfile::Yolo => RiskSettings {
                max_leverage: 20,
                stop_loss_pct: Decimal::from(25),
                knockout_buffer_pct: Decimal::from(2),
            },
        }
    }
}

/// A single analysis job. Immutable for the lifetime of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    pub symbol: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub forced_direction: ForcedDirection,
    #[serde(default)]
    pub risk_profile: Option<RiskProfile>,
    /// Position budget in EUR. Enables position sizing in the decision.
    #[serde(default)]
    pub budget: Option<Decimal>,
}

impl AnalysisRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            language: Language::default(),
            forced_direction: ForcedDirection::default(),
            risk_profile: None,
            budget: None,
        }
    }

    /// The requested profile, falling back to `moderate`.
    pub fn effective_profile(&self) -> RiskProfile {
        self.risk_profile.unwrap_or_default()
    }
}
