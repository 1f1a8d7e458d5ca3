//! Capability traits an `AgentRunner` depends on. Concrete backends (a
//! hosted chat-completion API, a local model server, a TTS vendor) live
//! outside this crate and are injected at session construction time.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, TtsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationVerdict {
    Satisfied,
    FollowUp,
    Escalate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub verdict: EvaluationVerdict,
    pub reasoning: String,
    pub follow_up_question: Option<String>,
}

pub type TextStream<'a> = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'a>>;

/// The language-model capability an agent needs: drafting a question,
/// judging whether a presenter's answer resolves it, and drafting the
/// closing debrief.
#[async_trait]
pub trait Llm: Send + Sync {
    async fn generate_question(&self, prompt: &str) -> Result<String, LlmError>;

    /// Token-by-token variant used so sentence-complete chunks can be fired
    /// at TTS as soon as they're available, rather than waiting on the
    /// full question.
    fn generate_question_streaming<'a>(&'a self, prompt: &'a str) -> TextStream<'a>;

    async fn evaluate_response(&self, prompt: &str) -> Result<EvaluationResult, LlmError>;

    async fn generate_debrief(&self, prompt: &str) -> Result<String, LlmError>;

    /// Generic completion, used where the caller just needs raw text back
    /// (claim extraction's JSON-producing prompt, for instance) rather than
    /// one of the named domain operations above.
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

/// Text-to-speech capability. Returns a URL the client can fetch the
/// synthesized clip from, matching `CandidateQuestion::audio_urls`.
#[async_trait]
pub trait Tts: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<String, TtsError>;
}
