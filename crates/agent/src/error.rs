use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("unknown persona for agent id {0}")]
    UnknownPersona(String),
    #[error("llm call failed: {0}")]
    Llm(#[from] boardroom_llm::LlmError),
    #[error("tts call failed: {0}")]
    Tts(#[from] boardroom_llm::TtsError),
}
