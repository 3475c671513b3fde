pub mod budget;
pub mod claude_cli;
pub mod context;
pub mod error;
pub mod events;
pub mod inference;
pub mod invoker;
pub mod knockout;
pub mod language;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod sources;
pub mod state;
pub mod synthesizer;

pub mod test_support;

pub use budget::InferenceBudget;
pub use claude_cli::ClaudeCliProvider;
pub use error::{AgentError, InferenceError};
pub use events::{EventSink, TracingEventSink};
pub use inference::{InferenceProvider, Prompt};
pub use orchestrator::{AnalysisRun, EngineContext, Orchestrator};
pub use sources::{ChartRenderer, SnapshotSource};
pub use state::{PipelineState, TransitionRecord};
