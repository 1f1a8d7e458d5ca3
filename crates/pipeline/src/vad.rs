//! RMS-threshold voice-activity state machine gating raw PCM frames.

use parking_lot::Mutex;

const SPEECH_THRESHOLD: f64 = 500.0;
const SILENCE_THRESHOLD: f64 = 300.0;
const SILENCE_CHUNKS_FOR_END: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadState {
    Silent,
    Speaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadSignal {
    /// Frame should be forwarded to the transcription backend.
    Forward,
    /// Frame should be dropped; still silent.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadTransition {
    None,
    ActivityStart,
    ActivityEnd,
}

struct Inner {
    state: VadState,
    silence_count: u32,
}

/// Owns the VAD state machine for one session's audio stream. The lock is
/// held for the whole of `process_frame` — the transition decision and the
/// state mutation must be atomic with respect to concurrent frame delivery.
pub struct VoiceActivityGate {
    inner: Mutex<Inner>,
}

impl Default for VoiceActivityGate {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceActivityGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: VadState::Silent,
                silence_count: 0,
            }),
        }
    }

    pub fn state(&self) -> VadState {
        self.inner.lock().state
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = VadState::Silent;
        inner.silence_count = 0;
    }

    /// Feed one 16-bit PCM frame (as signed samples); returns whether it
    /// should be forwarded and whether a state transition fired.
    pub fn process_frame(&self, samples: &[i16]) -> (VadSignal, VadTransition) {
        let rms = rms_of(samples);
        let mut inner = self.inner.lock();

        match inner.state {
            VadState::Silent => {
                if rms > SPEECH_THRESHOLD {
                    inner.state = VadState::Speaking;
                    inner.silence_count = 0;
                    (VadSignal::Forward, VadTransition::ActivityStart)
                } else {
                    (VadSignal::Drop, VadTransition::None)
                }
            }
            VadState::Speaking => {
                if rms < SILENCE_THRESHOLD {
                    inner.silence_count += 1;
                } else {
                    inner.silence_count = 0;
                }

                if inner.silence_count >= SILENCE_CHUNKS_FOR_END {
                    inner.state = VadState::Silent;
                    inner.silence_count = 0;
                    (VadSignal::Forward, VadTransition::ActivityEnd)
                } else {
                    (VadSignal::Forward, VadTransition::None)
                }
            }
        }
    }
}

fn rms_of(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence_frame() -> Vec<i16> {
        vec![0; 160]
    }

    fn loud_frame() -> Vec<i16> {
        vec![20000; 160]
    }

    #[test]
    fn silent_drops_quiet_frames() {
        let gate = VoiceActivityGate::new();
        let (signal, transition) = gate.process_frame(&silence_frame());
        assert_eq!(signal, VadSignal::Drop);
        assert_eq!(transition, VadTransition::None);
        assert_eq!(gate.state(), VadState::Silent);
    }

    #[test]
    fn loud_frame_starts_activity() {
        let gate = VoiceActivityGate::new();
        let (signal, transition) = gate.process_frame(&loud_frame());
        assert_eq!(signal, VadSignal::Forward);
        assert_eq!(transition, VadTransition::ActivityStart);
        assert_eq!(gate.state(), VadState::Speaking);
    }

    #[test]
    fn sustained_silence_after_speech_ends_activity() {
        let gate = VoiceActivityGate::new();
        gate.process_frame(&loud_frame());

        for _ in 0..(SILENCE_CHUNKS_FOR_END - 1) {
            let (signal, transition) = gate.process_frame(&silence_frame());
            assert_eq!(signal, VadSignal::Forward);
            assert_eq!(transition, VadTransition::None);
        }

        let (signal, transition) = gate.process_frame(&silence_frame());
        assert_eq!(signal, VadSignal::Forward);
        assert_eq!(transition, VadTransition::ActivityEnd);
        assert_eq!(gate.state(), VadState::Silent);
    }

    #[test]
    fn brief_dip_resets_silence_counter() {
        let gate = VoiceActivityGate::new();
        gate.process_frame(&loud_frame());
        for _ in 0..5 {
            gate.process_frame(&silence_frame());
        }
        gate.process_frame(&loud_frame()); // resets silence_count
        for _ in 0..(SILENCE_CHUNKS_FOR_END - 1) {
            gate.process_frame(&silence_frame());
        }
        assert_eq!(gate.state(), VadState::Speaking);
    }
}
