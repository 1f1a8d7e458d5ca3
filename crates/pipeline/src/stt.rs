//! Backend-agnostic speech-to-text gate: wraps the VAD state machine around
//! either a streaming cloud transport or a local batch transcriber, applies
//! text post-filters, and manages reconnects.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vad::{VadSignal, VadState, VadTransition, VoiceActivityGate};

const RECONNECT_COOLDOWN: Duration = Duration::from_secs(3);
const MAX_RECONNECTS: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSegment {
    pub is_final: bool,
    pub text: String,
    pub confidence: f64,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

#[derive(Debug, Error)]
pub enum SttError {
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport closed")]
    Closed,
    #[error("reconnect cap of {0} exceeded, gate stopped")]
    ReconnectCapExceeded(u32),
}

/// Long-lived session to an external STT: emits activity_start/end signals
/// and receives interim + final tokens as they arrive.
#[async_trait]
pub trait StreamingSttTransport: Send + Sync {
    async fn connect(&mut self) -> Result<(), SttError>;
    async fn send(&mut self, pcm: &[i16]) -> Result<(), SttError>;
    async fn start_activity(&mut self) -> Result<(), SttError>;
    async fn end_activity(&mut self) -> Result<(), SttError>;
    async fn recv(&mut self) -> Option<Result<SttSegment, SttError>>;
}

/// Accumulates PCM during SPEAKING and transcribes the full utterance once
/// the VAD transitions back to silence.
#[async_trait]
pub trait BatchSttTransport: Send + Sync {
    async fn transcribe(&self, pcm_block: &[i16]) -> Result<String, SttError>;
}

pub enum SttTransport {
    Streaming(Box<dyn StreamingSttTransport>),
    Batch(Box<dyn BatchSttTransport>),
}

/// Drives one session's VAD + STT transport. Single-owned by the session's
/// STTGate task, so reconnect attempts are serialized for free.
pub struct SttGate {
    vad: VoiceActivityGate,
    transport: SttTransport,
    batch_buffer: Vec<i16>,
    reconnect_attempts: u32,
    last_error_at: Option<Instant>,
    needs_reconnect: bool,
    stopped: bool,
}

impl SttGate {
    pub fn new(transport: SttTransport) -> Self {
        Self {
            vad: VoiceActivityGate::new(),
            transport,
            batch_buffer: Vec::new(),
            reconnect_attempts: 0,
            last_error_at: None,
            needs_reconnect: false,
            stopped: false,
        }
    }

    pub fn vad_state(&self) -> VadState {
        self.vad.state()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Feed one PCM frame. Returns any final segments produced synchronously
    /// (the batch backend's only delivery path); the streaming backend's
    /// tokens arrive via `poll_streaming_segment` on a separate receive loop.
    pub async fn ingest_frame(&mut self, pcm: &[i16]) -> Result<Vec<SttSegment>, SttError> {
        if self.stopped {
            return Ok(Vec::new());
        }
        let (signal, transition) = self.vad.process_frame(pcm);
        let mut segments = Vec::new();

        if transition == VadTransition::ActivityStart && self.needs_reconnect {
            self.reconnect().await?;
        }

        match (&mut self.transport, transition) {
            (SttTransport::Streaming(t), VadTransition::ActivityStart) => {
                if let Err(e) = t.start_activity().await {
                    self.on_transport_error();
                    return Err(e);
                }
            }
            (SttTransport::Streaming(t), VadTransition::ActivityEnd) => {
                if let Err(e) = t.end_activity().await {
                    self.on_transport_error();
                    return Err(e);
                }
            }
            (SttTransport::Batch(t), VadTransition::ActivityEnd) => {
                if !self.batch_buffer.is_empty() {
                    match t.transcribe(&self.batch_buffer).await {
                        Ok(text) => {
                            if let Some(filtered) = filter_segment(&text) {
                                segments.push(SttSegment {
                                    is_final: true,
                                    text: filtered,
                                    confidence: 1.0,
                                    start_time: None,
                                    end_time: None,
                                });
                            }
                        }
                        Err(_) => self.on_transport_error(),
                    }
                }
                self.batch_buffer.clear();
            }
            _ => {}
        }

        if signal == VadSignal::Forward {
            match &mut self.transport {
                SttTransport::Streaming(t) => {
                    if let Err(e) = t.send(pcm).await {
                        self.on_transport_error();
                        return Err(e);
                    }
                }
                SttTransport::Batch(_) => self.batch_buffer.extend_from_slice(pcm),
            }
        }

        Ok(segments)
    }

    /// One iteration of the streaming backend's long-running receive loop.
    /// Filters are applied here too, so every segment leaving the gate —
    /// batch or streaming — has been through the same post-filter pass.
    pub async fn poll_streaming_segment(&mut self) -> Option<Result<SttSegment, SttError>> {
        let SttTransport::Streaming(t) = &mut self.transport else {
            return None;
        };
        match t.recv().await {
            Some(Ok(mut seg)) => match filter_segment(&seg.text) {
                Some(filtered) => {
                    seg.text = filtered;
                    Some(Ok(seg))
                }
                None => None,
            },
            Some(Err(e)) => {
                self.on_transport_error();
                Some(Err(e))
            }
            None => None,
        }
    }

    fn on_transport_error(&mut self) {
        self.vad.reset();
        self.needs_reconnect = true;
        self.last_error_at = Some(Instant::now());
    }

    async fn reconnect(&mut self) -> Result<(), SttError> {
        if self.reconnect_attempts >= MAX_RECONNECTS {
            self.stopped = true;
            return Err(SttError::ReconnectCapExceeded(MAX_RECONNECTS));
        }
        if let Some(last) = self.last_error_at {
            let elapsed = last.elapsed();
            if elapsed < RECONNECT_COOLDOWN {
                tokio::time::sleep(RECONNECT_COOLDOWN - elapsed).await;
            }
        }
        self.reconnect_attempts += 1;
        if let SttTransport::Streaming(t) = &mut self.transport {
            t.connect().await?;
        }
        self.needs_reconnect = false;
        Ok(())
    }
}

static NOISE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[<(\[]\s*(noise|silence)\s*[>)\]]").unwrap());

static BLACKLIST: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["ok", "um", "uh", "hmm", "ah"].into_iter().collect());

/// Rejects short/noise/blacklisted transcripts and strips noise tokens.
/// Idempotent: `filter(filter(x)) == filter(x)`.
pub fn filter_segment(text: &str) -> Option<String> {
    let stripped = NOISE_TOKEN_RE.replace_all(text, "").trim().to_string();
    if stripped.is_empty() {
        return None;
    }
    if contains_non_latin_script(&stripped) {
        return None;
    }
    let alpha_count = stripped.chars().filter(|c| c.is_alphabetic()).count();
    if alpha_count < 4 {
        return None;
    }
    if BLACKLIST.contains(stripped.to_lowercase().as_str()) {
        return None;
    }
    Some(stripped)
}

fn contains_non_latin_script(text: &str) -> bool {
    text.chars().any(|c| {
        let cp = c as u32;
        matches!(cp,
            0x0600..=0x06FF   // Arabic
            | 0x0E00..=0x0E7F // Thai
            | 0x4E00..=0x9FFF // CJK
            | 0x3040..=0x309F // Hiragana
            | 0x30A0..=0x30FF // Katakana
            | 0xAC00..=0xD7A3 // Hangul
            | 0x0400..=0x04FF // Cyrillic
            | 0x0900..=0x097F // Devanagari
            | 0x0980..=0x09FF // Bengali
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_rejects_short_text() {
        assert_eq!(filter_segment("ab"), None);
    }

    #[test]
    fn filter_rejects_blacklist() {
        assert_eq!(filter_segment("um"), None);
        assert_eq!(filter_segment("  Uh  "), None);
    }

    #[test]
    fn filter_strips_noise_tokens() {
        assert_eq!(
            filter_segment("<noise> the market grew nicely").as_deref(),
            Some("the market grew nicely")
        );
    }

    #[test]
    fn filter_rejects_non_latin_script() {
        assert_eq!(filter_segment("こんにちは世界"), None);
        assert_eq!(filter_segment("привет мир"), None);
    }

    #[test]
    fn filter_is_idempotent() {
        let once = filter_segment("(noise) the revenue grew substantially").unwrap();
        let twice = filter_segment(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn filter_accepts_normal_speech() {
        assert_eq!(
            filter_segment("the market is large").as_deref(),
            Some("the market is large")
        );
    }
}
