//! The autonomous `AgentRunner` state machine: one instance per panelist,
//! driven by the session's event bus and a shared LLM/TTS backend.

pub mod error;
pub mod heuristic;
pub mod observation;
pub mod prompts;
pub mod runner;
pub mod state;

pub use error::AgentError;
pub use heuristic::{evaluate_should_ask, AskReason, ShouldAskInput, ShouldAskOutcome};
pub use observation::{AgentObservation, OtherAgentQuestion};
pub use runner::{AgentRunner, EvaluationOutcome, FollowUp};
pub use state::AgentRunnerState;
