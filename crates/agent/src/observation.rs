//! Per-agent accumulated observation of the session: the agent's own view
//! of slide position, transcript, other panelists' questions, and whether
//! an exchange (anyone's) is currently in progress.

use boardroom_pipeline::TranscriptSegment;

#[derive(Debug, Clone)]
pub struct OtherAgentQuestion {
    pub agent_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct AgentObservation {
    pub current_slide: usize,
    pub transcript_segments: Vec<TranscriptSegment>,
    pub other_agent_questions: Vec<OtherAgentQuestion>,
    pub exchange_active: bool,
    pub exchange_agent: Option<String>,
    pub last_eval_transcript_count: usize,
}

impl AgentObservation {
    pub fn add_transcript(&mut self, segment: TranscriptSegment) {
        self.transcript_segments.push(segment);
    }

    pub fn set_slide(&mut self, index: usize) {
        self.current_slide = index;
    }

    pub fn set_exchange_active(&mut self, active: bool, agent_id: Option<String>) {
        self.exchange_active = active;
        self.exchange_agent = agent_id;
    }

    pub fn add_other_agent_question(&mut self, own_agent_id: &str, question: OtherAgentQuestion) {
        if question.agent_id != own_agent_id {
            self.other_agent_questions.push(question);
        }
    }

    /// Context-based readiness check: requires meaningful transcript content
    /// regardless of slide number, since a presenter may linger on one slide
    /// or skip through several quickly.
    pub fn has_sufficient_context(&self, min_words: usize) -> bool {
        self.total_words() >= min_words
    }

    pub fn total_words(&self) -> usize {
        self.transcript_segments
            .iter()
            .map(|s| s.text.split_whitespace().count())
            .sum()
    }

    pub fn get_transcript_text(&self, last_n: usize) -> String {
        let start = self.transcript_segments.len().saturating_sub(last_n);
        self.transcript_segments[start..]
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str) -> TranscriptSegment {
        TranscriptSegment {
            text: text.to_string(),
            start_time: 0.0,
            end_time: 1.0,
        }
    }

    #[test]
    fn sufficient_context_counts_words_across_segments() {
        let mut obs = AgentObservation::default();
        obs.add_transcript(seg("one two three"));
        obs.add_transcript(seg("four five"));
        assert!(!obs.has_sufficient_context(10));
        obs.add_transcript(seg("six seven eight nine ten"));
        assert!(obs.has_sufficient_context(10));
    }

    #[test]
    fn other_agent_question_from_self_is_dropped() {
        let mut obs = AgentObservation::default();
        obs.add_other_agent_question(
            "skeptic",
            OtherAgentQuestion {
                agent_id: "skeptic".into(),
                text: "my own question".into(),
            },
        );
        assert!(obs.other_agent_questions.is_empty());
    }
}
