//! The shared domain model: exchanges, claims, presenter profile, and the
//! per-session context tying them together.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Agent,
    Presenter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeTurn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ExchangeTurn {
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Agent,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn presenter(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Presenter,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeOutcome {
    Satisfied,
    FollowUp,
    Escalate,
    ModeratorIntervened,
    TurnLimit,
    Timeout,
}

impl ExchangeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeOutcome::Satisfied => "satisfied",
            ExchangeOutcome::FollowUp => "follow_up",
            ExchangeOutcome::Escalate => "escalate",
            ExchangeOutcome::ModeratorIntervened => "moderator_intervened",
            ExchangeOutcome::TurnLimit => "turn_limit",
            ExchangeOutcome::Timeout => "timeout",
        }
    }
}

/// A prepared question + pre-synthesized audio an agent stages before raising
/// its hand, so delivery is immediate once the moderator calls on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateQuestion {
    pub agent_id: String,
    pub text: String,
    pub target_claim: Option<String>,
    pub slide_index: usize,
    pub audio_urls: Vec<String>,
    pub relevance_score: f64,
}

/// A single bounded multi-turn dialogue between one agent and the presenter.
/// Mutated only by the Coordinator; frozen once `resolved_at` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub id: Uuid,
    pub agent_id: String,
    pub question_text: String,
    pub target_claim: Option<String>,
    pub slide_index: usize,
    pub turns: Vec<ExchangeTurn>,
    pub outcome: Option<ExchangeOutcome>,
    pub started_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub evaluation_reasoning: Option<String>,
}

impl Exchange {
    pub fn new(
        agent_id: impl Into<String>,
        question_text: impl Into<String>,
        target_claim: Option<String>,
        slide_index: usize,
    ) -> Self {
        let agent_id = agent_id.into();
        let question_text = question_text.into();
        Self {
            id: Uuid::new_v4(),
            agent_id,
            turns: vec![ExchangeTurn::agent(question_text.clone())],
            question_text,
            target_claim,
            slide_index,
            outcome: None,
            started_at: Utc::now(),
            resolved_at: None,
            evaluation_reasoning: None,
        }
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn presenter_turn_count(&self) -> usize {
        self.turns.iter().filter(|t| t.speaker == Speaker::Presenter).count()
    }

    pub fn agent_turn_count(&self) -> usize {
        self.turns.iter().filter(|t| t.speaker == Speaker::Agent).count()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataReadiness {
    Strong,
    Moderate,
    Weak,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    PushHarder,
    Standard,
    Supportive,
}

/// Deterministically updated by the Coordinator at exchange resolution; read
/// by the owning agent to tailor its next question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenterProfile {
    pub response_patterns: Vec<String>,
    pub data_readiness: DataReadiness,
    pub behavioral_notes: Vec<String>,
    pub recommended_strategy: Strategy,
}

impl Default for PresenterProfile {
    fn default() -> Self {
        Self {
            response_patterns: Vec::new(),
            data_readiness: DataReadiness::Unknown,
            behavioral_notes: Vec::new(),
            recommended_strategy: Strategy::Standard,
        }
    }
}

impl PresenterProfile {
    /// Render a compact prompt fragment: only the last 5 entries of each
    /// list, to bound prompt size as the session accumulates history.
    pub fn to_text(&self) -> String {
        let readiness = match self.data_readiness {
            DataReadiness::Strong => "strong",
            DataReadiness::Moderate => "moderate",
            DataReadiness::Weak => "weak",
            DataReadiness::Unknown => "unknown",
        };
        let strategy = match self.recommended_strategy {
            Strategy::PushHarder => "push_harder",
            Strategy::Standard => "standard",
            Strategy::Supportive => "supportive",
        };

        let patterns = tail(&self.response_patterns, 5).join("; ");
        let notes = tail(&self.behavioral_notes, 5).join("; ");

        let mut out = format!("Data readiness: {readiness}. Recommended strategy: {strategy}.");
        if !patterns.is_empty() {
            out.push_str(&format!(" Response patterns: {patterns}."));
        }
        if !notes.is_empty() {
            out.push_str(&format!(" Behavioral notes: {notes}."));
        }
        out
    }
}

fn tail(items: &[String], n: usize) -> &[String] {
    let start = items.len().saturating_sub(n);
    &items[start..]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Financial,
    Market,
    Timeline,
    Capability,
    Competitive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub confidence: f64,
}

/// One panelist's accumulated history: its own exchanges, the presenter
/// profile it has built up, and which claims it has already challenged.
/// Owned by the matching AgentRunner; read (and updated at resolution) by
/// the Coordinator through the shared `Arc<RwLock<_>>` handed out by
/// `SessionContext::get_agent_context`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSessionContext {
    pub agent_id: String,
    pub exchanges: Vec<Exchange>,
    pub presenter_profile: PresenterProfile,
    pub challenged_claims: Vec<String>,
}

impl AgentSessionContext {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            exchanges: Vec::new(),
            presenter_profile: PresenterProfile::default(),
            challenged_claims: Vec::new(),
        }
    }

    pub fn total_questions(&self) -> usize {
        self.exchanges.len()
    }

    pub fn satisfied_count(&self) -> usize {
        self.exchanges
            .iter()
            .filter(|e| e.outcome == Some(ExchangeOutcome::Satisfied))
            .count()
    }

    /// Defensive accessor: exchanges should always be resolved before being
    /// appended here, so this should be empty in steady state.
    pub fn unresolved_exchanges(&self) -> Vec<&Exchange> {
        self.exchanges.iter().filter(|e| !e.is_resolved()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Presenting,
    QaTrigger,
    Exchange,
    Resolving,
}

/// Shared mutable session state. Global fields (`state`, `active_exchange`,
/// `completed_exchanges`, `claims_by_slide`) are mutated only by the
/// Coordinator; each `AgentSessionContext` is mutated only by its owning
/// AgentRunner, except at exchange resolution where the Coordinator is the
/// serialization point for both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub state: SessionState,
    pub active_exchange: Option<Exchange>,
    #[serde(skip)]
    pub agent_contexts: HashMap<String, Arc<RwLock<AgentSessionContext>>>,
    pub completed_exchanges: Vec<Exchange>,
    pub claims_by_slide: HashMap<usize, Vec<Claim>>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: SessionState::Presenting,
            active_exchange: None,
            agent_contexts: HashMap::new(),
            completed_exchanges: Vec::new(),
            claims_by_slide: HashMap::new(),
        }
    }

    /// Auto-creates an entry on first read; repeated calls for the same
    /// `agent_id` return clones of the same `Arc`, i.e. the same instance.
    pub fn get_agent_context(&mut self, agent_id: &str) -> Arc<RwLock<AgentSessionContext>> {
        self.agent_contexts
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(AgentSessionContext::new(agent_id))))
            .clone()
    }

    /// Completed exchanges where the moderator had to step in or the turn
    /// limit was hit — candidates for a coaching report (built externally).
    pub fn unresolved_challenges(&self) -> Vec<&Exchange> {
        self.completed_exchanges
            .iter()
            .filter(|e| {
                matches!(
                    e.outcome,
                    Some(ExchangeOutcome::ModeratorIntervened) | Some(ExchangeOutcome::TurnLimit)
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_agent_context_returns_same_instance() {
        let mut ctx = SessionContext::new("s1");
        let a = ctx.get_agent_context("skeptic");
        a.write().challenged_claims.push("claim-1".into());

        let b = ctx.get_agent_context("skeptic");
        assert_eq!(b.read().challenged_claims, vec!["claim-1".to_string()]);
    }

    #[test]
    fn exchange_derives_turn_counts() {
        let mut exchange = Exchange::new("skeptic", "What's your TAM?", Some("TAM is $5B".into()), 2);
        exchange.turns.push(ExchangeTurn::presenter("It's $5B based on..."));
        exchange.turns.push(ExchangeTurn::agent("How did you validate that?"));

        assert_eq!(exchange.turn_count(), 3);
        assert_eq!(exchange.agent_turn_count(), 2);
        assert_eq!(exchange.presenter_turn_count(), 1);
        assert!(!exchange.is_resolved());
    }

    #[test]
    fn presenter_profile_to_text_truncates_to_last_five() {
        let mut profile = PresenterProfile::default();
        for i in 0..8 {
            profile.response_patterns.push(format!("pattern-{i}"));
        }
        let text = profile.to_text();
        assert!(text.contains("pattern-7"));
        assert!(!text.contains("pattern-2"));
    }
}
