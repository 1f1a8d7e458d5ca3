use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("response parsing failed: {0}")]
    Parse(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("synthesis failed: {0}")]
    Synthesis(String),
}
