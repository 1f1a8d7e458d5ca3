//! The hand-raise selection formula, pulled out as a pure function so the
//! tiebreak arithmetic can be tested without a running queue.

const FAIRNESS_PENALTY: f64 = 0.3;

pub struct ScoringInput {
    pub relevance_score: f64,
    pub total_questions: usize,
    pub seconds_since_raised: f64,
}

pub fn score(input: &ScoringInput) -> f64 {
    input.relevance_score - FAIRNESS_PENALTY * input.total_questions as f64
        + 1.0 / (input.seconds_since_raised + 1.0)
}

/// Highest score wins; a single-entry queue is taken without scoring.
pub fn select_winner(candidates: &[(String, ScoringInput)]) -> Option<String> {
    if candidates.len() == 1 {
        return Some(candidates[0].0.clone());
    }
    candidates
        .iter()
        .max_by(|(_, a), (_, b)| score(a).partial_cmp(&score(b)).expect("scores are never NaN"))
        .map(|(agent_id, _)| agent_id.clone())
}
