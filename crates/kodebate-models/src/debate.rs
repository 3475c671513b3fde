use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::trade_decision::Signal;

/// Which half of the debate a persona belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    Investment,
    Risk,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Bull,
    Bear,
    Risky,
    Neutral,
    Safe,
    InvestmentJudge,
    RiskJudge,
}

impl Persona {
    pub const RISK_ANALYSTS: [Persona; 3] = [Persona::Risky, Persona::Neutral, Persona::Safe];

    pub fn phase(self) -> DebatePhase {
        match self {
            Persona::Bull | Persona::Bear | Persona::InvestmentJudge => DebatePhase::Investment,
            Persona::Risky | Persona::Neutral | Persona::Safe | Persona::RiskJudge => {
                DebatePhase::Risk
            }
        }
    }

    pub fn is_judge(self) -> bool {
        matches!(self, Persona::InvestmentJudge | Persona::RiskJudge)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Bull => "bull",
            Persona::Bear => "bear",
            Persona::Risky => "risky",
            Persona::Neutral => "neutral",
            Persona::Safe => "safe",
            Persona::InvestmentJudge => "investment_judge",
            Persona::RiskJudge => "risk_judge",
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persona contribution. Never edited once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebateTurn {
    pub persona: Persona,
    /// 1-based for Bull/Bear rounds, 0 for single-shot personas.
    pub round: u32,
    pub argument: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lean: Option<Signal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Decimal>,
}

/// Ordered turns of one analysis, split by phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DebateTranscript {
    pub investment: Vec<DebateTurn>,
    pub risk: Vec<DebateTurn>,
}

impl DebateTranscript {
    pub fn push(&mut self, turn: DebateTurn) {
        match turn.persona.phase() {
            DebatePhase::Investment => self.investment.push(turn),
            DebatePhase::Risk => self.risk.push(turn),
        }
    }

    pub fn len(&self) -> usize {
        self.investment.len() + self.risk.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent turn by `persona`, searching both phases.
    pub fn last_by(&self, persona: Persona) -> Option<&DebateTurn> {
        self.investment
            .iter()
            .chain(self.risk.iter())
            .rev()
            .find(|t| t.persona == persona)
    }
}
