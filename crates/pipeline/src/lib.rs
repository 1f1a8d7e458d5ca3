pub mod context_window;
pub mod http_stt;
pub mod stt;
pub mod vad;

pub use context_window::{AgentPromptContext, ContextWindow, SlideInfo, TranscriptSegment};
pub use http_stt::{HttpBatchSttTransport, HttpSttConfig};
pub use stt::{
    filter_segment, BatchSttTransport, SttError, SttGate, SttSegment, StreamingSttTransport,
    SttTransport,
};
pub use vad::{VadSignal, VadState, VadTransition, VoiceActivityGate};
