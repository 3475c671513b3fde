pub mod config;
pub mod debate;
pub mod opinion;
pub mod request;
pub mod snapshot;
pub mod trade_decision;

pub use config::{
    AgentsConfig, BudgetConfig, KnockoutConfig, KodebateConfig, RetryConfig, SynthesisConfig,
};
pub use debate::{DebatePhase, DebateTranscript, DebateTurn, Persona};
pub use opinion::{
    DebaterOpinion, InvestmentVerdict, Opinion, OpinionShape, RawHoldAlternative, RawZone,
    RiskVerdict,
};
pub use request::{AnalysisRequest, ForcedDirection, Language, RiskProfile, RiskSettings};
pub use snapshot::{AssetType, ChartHandle, MarketDataSnapshot};
pub use trade_decision::{
    HoldAlternative, KnockoutLevel, PositionPlan, RiskTier, Signal, Strategies, Timeframes,
    TradeDecision, OUTPUT_SCHEMA_VERSION,
};
