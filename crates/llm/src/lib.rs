pub mod claims;
pub mod claude;
pub mod error;
pub mod sentence_splitter;
pub mod throttle;
pub mod traits;
pub mod tts;

pub use claims::{extract_claims_concurrently, ClaimExtractor, SlideContent};
pub use claude::{ClaudeConfig, ClaudeLlm};
pub use error::{LlmError, TtsError};
pub use sentence_splitter::{split_sentences, SentenceSplitter};
pub use throttle::LlmThrottle;
pub use traits::{EvaluationResult, EvaluationVerdict, Llm, TextStream, Tts};
pub use tts::{HttpTts, HttpTtsConfig};
