//! Structured shapes each persona must answer with.
//!
//! Debaters answer with a free argument plus an optional lean, the investment
//! judge must commit to a direction, and the risk judge returns the raw
//! decision fields that the synthesizer later finalizes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::debate::Persona;
use crate::trade_decision::{Signal, Timeframes};

/// Bull, Bear, Risky, Neutral and Safe answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebaterOpinion {
    #[serde(alias = "reasoning")]
    pub argument: String,
    #[serde(default)]
    pub lean: Option<Signal>,
    #[serde(default)]
    pub confidence: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestmentVerdict {
    #[serde(alias = "reasoning")]
    pub argument: String,
    /// LONG, SHORT or HOLD.
    pub signal: Signal,
    #[serde(default)]
    pub confidence: Option<Decimal>,
}

/// A price zone, either a bare number or the described object form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawZone {
    Price(Decimal),
    Described {
        #[serde(alias = "level")]
        level_usd: Decimal,
        #[serde(default)]
        description: Option<String>,
    },
}

impl RawZone {
    pub fn level(&self) -> Decimal {
        match self {
            RawZone::Price(level) => *level,
            RawZone::Described { level_usd, .. } => *level_usd,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawHoldAlternative {
    pub direction: Signal,
    #[serde(default)]
    pub rationale: String,
}

/// Raw risk judge output, before reconciliation and level computation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskVerdict {
    pub signal: Signal,
    /// May be out of range; the synthesizer clamps it.
    pub confidence: Decimal,
    #[serde(default)]
    pub unable_to_assess: bool,
    #[serde(default)]
    pub unable_to_assess_reason: Option<String>,
    #[serde(default)]
    pub timeframes: Timeframes,
    #[serde(default)]
    pub support_zones: Vec<RawZone>,
    #[serde(default)]
    pub resistance_zones: Vec<RawZone>,
    pub detailed_analysis: String,
    #[serde(default)]
    pub hold_alternative: Option<RawHoldAlternative>,
}

/// A validated persona answer, tagged by the shape it was validated against.
#[derive(Debug, Clone, PartialEq)]
pub enum Opinion {
    Debater(DebaterOpinion),
    Investment(InvestmentVerdict),
    Risk(RiskVerdict),
}

/// The shape a persona is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpinionShape {
    Debater,
    InvestmentVerdict,
    RiskVerdict,
}

impl OpinionShape {
    pub fn for_persona(persona: Persona) -> Self {
        match persona {
            Persona::InvestmentJudge => OpinionShape::InvestmentVerdict,
            Persona::RiskJudge => OpinionShape::RiskVerdict,
            _ => OpinionShape::Debater,
        }
    }
}

impl Opinion {
    pub fn argument(&self) -> &str {
        match self {
            Opinion::Debater(o) => &o.argument,
            Opinion::Investment(v) => &v.argument,
            Opinion::Risk(v) => &v.detailed_analysis,
        }
    }

    pub fn lean(&self) -> Option<Signal> {
        match self {
            Opinion::Debater(o) => o.lean,
            Opinion::Investment(v) => Some(v.signal),
            Opinion::Risk(v) => Some(v.signal),
        }
    }

    pub fn confidence(&self) -> Option<Decimal> {
        match self {
            Opinion::Debater(o) => o.confidence,
            Opinion::Investment(v) => v.confidence,
            Opinion::Risk(v) => Some(v.confidence),
        }
    }
}
