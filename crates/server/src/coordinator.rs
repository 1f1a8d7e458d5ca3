//! The moderator: arbitrates the hand-raise queue, calls on panelists, and
//! drives each exchange from the presenter's first answer to resolution.
//!
//! Single-writer discipline: only the Coordinator ever mutates
//! `SessionContext::{state, active_exchange, completed_exchanges,
//! claims_by_slide}` or the hand-raise queue. AgentRunners own their own
//! `AgentSessionContext` and are read-only with respect to everything else.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use boardroom_agent::AgentRunner;
use boardroom_config::{PersonaTemplate, SessionConfig};
use boardroom_core::{
    CandidateQuestion, DataReadiness, Event, EventBus, EventSubscriber, EventType, Exchange,
    ExchangeOutcome, ExchangeTurn, SessionContext, SessionState, Strategy,
};
use boardroom_llm::Tts;
use boardroom_pipeline::TranscriptSegment;

use crate::metrics::{record_exchange_resolved, record_hand_raised};
use crate::scoring::{select_winner, ScoringInput};
use crate::sink::Sink;

const MODERATOR_TICK: std::time::Duration = std::time::Duration::from_secs(2);
const POST_RESOLUTION_COOLDOWN: std::time::Duration = std::time::Duration::from_secs(5);
const EXCHANGE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(45);
const DEBOUNCE_SILENCE: std::time::Duration = std::time::Duration::from_secs(3);
const EXCHANGE_MIN_WORDS: usize = 6;
const FOLLOW_UP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);
const BEHAVIORAL_NOTE_TRUNCATE_CHARS: usize = 80;

const DEFAULT_TRANSITION_PHRASE: &str = "Let's bring in another voice here.";

fn bridge_back_phrase(outcome: ExchangeOutcome) -> &'static str {
    match outcome {
        ExchangeOutcome::Satisfied => "Good, that's settled. Let's continue.",
        ExchangeOutcome::FollowUp => "Let's keep moving.",
        ExchangeOutcome::Escalate => "Let's come back to that later. Please continue.",
        ExchangeOutcome::ModeratorIntervened => "Let's move on for now.",
        ExchangeOutcome::TurnLimit => "We'll leave it there for now. Please continue.",
        ExchangeOutcome::Timeout => "Let's pick this back up. Please continue.",
    }
}

struct QueuedCandidate {
    candidate: CandidateQuestion,
    raised_at: Instant,
}

#[derive(Default)]
struct DebounceState {
    buffer: String,
}

pub struct Coordinator {
    session_id: String,
    session_config: SessionConfig,
    agents: HashMap<String, Arc<AgentRunner>>,
    session_context: Arc<RwLock<SessionContext>>,
    event_bus: Arc<EventBus>,
    sink: Arc<dyn Sink>,
    tts: Arc<dyn Tts>,

    queue: Mutex<HashMap<String, QueuedCandidate>>,
    exchange_generation: AtomicU64,
    debounce: Mutex<DebounceState>,
    debounce_generation: AtomicU64,
    assessing: AtomicBool,
    last_resolution_at: Mutex<Option<Instant>>,

    session_start: Instant,
    warned_80: AtomicBool,
    warned_90: AtomicBool,
    stopped: AtomicBool,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: impl Into<String>,
        session_config: SessionConfig,
        agents: HashMap<String, Arc<AgentRunner>>,
        session_context: Arc<RwLock<SessionContext>>,
        event_bus: Arc<EventBus>,
        sink: Arc<dyn Sink>,
        tts: Arc<dyn Tts>,
    ) -> Arc<Self> {
        Arc::new(Self {
            session_id: session_id.into(),
            session_config,
            agents,
            session_context,
            event_bus,
            sink,
            tts,
            queue: Mutex::new(HashMap::new()),
            exchange_generation: AtomicU64::new(0),
            debounce: Mutex::new(DebounceState::default()),
            debounce_generation: AtomicU64::new(0),
            assessing: AtomicBool::new(false),
            last_resolution_at: Mutex::new(None),
            session_start: Instant::now(),
            warned_80: AtomicBool::new(false),
            warned_90: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// The moderator loop: wakes every 2s, skips while an exchange is live
    /// or within the post-resolution cooldown, and calls on the
    /// highest-scoring queued agent.
    pub async fn run(self: Arc<Self>) {
        while !self.is_stopped() {
            tokio::time::sleep(MODERATOR_TICK).await;
            if self.is_stopped() {
                break;
            }

            if self.session_context.read().state == SessionState::Exchange {
                continue;
            }
            if let Some(last) = *self.last_resolution_at.lock() {
                if last.elapsed() < POST_RESOLUTION_COOLDOWN {
                    continue;
                }
            }

            let Some(winner) = self.select_from_queue() else {
                continue;
            };
            self.call_on_agent(winner).await;
        }
    }

    fn select_from_queue(&self) -> Option<QueuedCandidate> {
        let mut queue = self.queue.lock();
        if queue.is_empty() {
            return None;
        }
        let scored: Vec<(String, ScoringInput)> = queue
            .iter()
            .map(|(agent_id, q)| {
                let total_questions = self
                    .session_context
                    .write()
                    .get_agent_context(agent_id)
                    .read()
                    .total_questions();
                (
                    agent_id.clone(),
                    ScoringInput {
                        relevance_score: q.candidate.relevance_score,
                        total_questions,
                        seconds_since_raised: q.raised_at.elapsed().as_secs_f64(),
                    },
                )
            })
            .collect();
        let winner_id = select_winner(&scored)?;
        let entry = queue.remove(&winner_id)?;
        drop(queue);
        self.emit_queue_snapshot();
        Some(entry)
    }

    fn emit_queue_snapshot(&self) {
        let queue = self.queue.lock();
        let snapshot: Vec<_> = queue
            .iter()
            .map(|(agent_id, q)| {
                serde_json::json!({
                    "agent_id": agent_id,
                    "relevance_score": q.candidate.relevance_score,
                })
            })
            .collect();
        drop(queue);
        let sink = self.sink.clone();
        tokio::spawn(async move {
            sink.emit("hand_raise_queue", serde_json::json!({ "queue": snapshot })).await;
        });
    }

    fn persona_for(&self, agent_id: &str) -> Option<&'static PersonaTemplate> {
        boardroom_config::get_agent_templates(agent_id)
    }

    async fn call_on_agent(self: &Arc<Self>, queued: QueuedCandidate) {
        let candidate = queued.candidate;
        let agent_id = candidate.agent_id.clone();

        self.session_context.write().state = SessionState::QaTrigger;

        let transition = self
            .persona_for(&agent_id)
            .and_then(|p| p.moderator_transition_phrases.choose(&mut rand::thread_rng()))
            .cloned()
            .unwrap_or_else(|| DEFAULT_TRANSITION_PHRASE.to_string());
        let transition_audio = self.tts.synthesize(&transition).await.ok();
        self.sink
            .emit(
                "moderator_message",
                serde_json::json!({ "text": transition, "audio_url": transition_audio }),
            )
            .await;

        self.sink
            .emit(
                "agent_question",
                serde_json::json!({
                    "agent_id": agent_id,
                    "text": candidate.text,
                    "audio_urls": candidate.audio_urls,
                    "target_claim": candidate.target_claim,
                }),
            )
            .await;

        self.event_bus.publish(Event::agent_called_on(&agent_id)).await;
        self.event_bus.publish(Event::agent_spoke(&agent_id, &candidate.text)).await;

        let exchange = Exchange::new(
            agent_id.clone(),
            candidate.text.clone(),
            candidate.target_claim.clone(),
            candidate.slide_index,
        );
        let exchange_id = exchange.id.to_string();
        {
            let mut ctx = self.session_context.write();
            ctx.active_exchange = Some(exchange);
            ctx.state = SessionState::Exchange;
        }

        self.event_bus.publish(Event::exchange_started(&agent_id, &exchange_id)).await;
        self.sink
            .emit(
                "session_state",
                serde_json::json!({
                    "state": "exchange",
                    "agent_id": agent_id,
                    "exchange_id": exchange_id,
                    "max_turns": self.session_config.max_turns(),
                }),
            )
            .await;

        self.arm_exchange_timer();
    }

    fn arm_exchange_timer(self: &Arc<Self>) {
        let generation = self.exchange_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(EXCHANGE_TIMEOUT).await;
            if this.exchange_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if this.session_context.read().active_exchange.is_some() {
                warn!(session_id = %this.session_id, "exchange timed out after 45s of inactivity");
                this.resolve_exchange(ExchangeOutcome::Timeout, None).await;
            }
        });
    }

    fn cancel_exchange_timer(&self) {
        self.exchange_generation.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel_debounce(&self) {
        self.debounce_generation.fetch_add(1, Ordering::SeqCst);
        self.assessing.store(false, Ordering::SeqCst);
        self.debounce.lock().buffer.clear();
    }

    /// A final transcript segment arrived while an exchange is live: reset
    /// the exchange timeout, buffer the text, and (unless an assessment is
    /// already in flight) arm a fresh debounce.
    async fn on_presenter_segment(self: &Arc<Self>, text: &str) {
        if self.session_context.read().state != SessionState::Exchange {
            return;
        }
        self.arm_exchange_timer();

        self.debounce.lock().buffer.push_str(text);
        self.debounce.lock().buffer.push(' ');

        if self.assessing.load(Ordering::SeqCst) {
            return;
        }
        let generation = self.debounce_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE_SILENCE).await;
            this.fire_debounce(generation).await;
        });
    }

    async fn fire_debounce(self: &Arc<Self>, generation: u64) {
        if self.debounce_generation.load(Ordering::SeqCst) != generation {
            return; // superseded by a newer segment
        }
        let buffered = self.debounce.lock().buffer.trim().to_string();
        if buffered.split_whitespace().count() < EXCHANGE_MIN_WORDS {
            return; // below the minimum; wait for more speech
        }
        if self
            .assessing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.debounce.lock().buffer.clear();
        self.process_presenter_turn(buffered).await;
        self.assessing.store(false, Ordering::SeqCst);
    }

    async fn process_presenter_turn(self: &Arc<Self>, text: String) {
        let Some((agent_id, exchange, presenter_turn_count)) = ({
            let mut ctx = self.session_context.write();
            match ctx.active_exchange.as_mut() {
                Some(exchange) => {
                    exchange.turns.push(ExchangeTurn::presenter(text));
                    Some((exchange.agent_id.clone(), exchange.clone(), exchange.presenter_turn_count()))
                }
                None => None,
            }
        }) else {
            return;
        };

        if presenter_turn_count >= self.session_config.max_turns() {
            self.resolve_exchange(ExchangeOutcome::TurnLimit, None).await;
            return;
        }

        let Some(runner) = self.agents.get(&agent_id).cloned() else {
            self.resolve_exchange(ExchangeOutcome::ModeratorIntervened, None).await;
            return;
        };

        self.sink.emit("agent_thinking", serde_json::json!({ "agent_id": agent_id })).await;

        let outcome = tokio::time::timeout(FOLLOW_UP_TIMEOUT, runner.handle_exchange_follow_up(&exchange))
            .await
            .unwrap_or(None);

        match outcome {
            None => self.resolve_exchange(ExchangeOutcome::Satisfied, None).await,
            Some(outcome) => match outcome.follow_up {
                None => self.resolve_exchange(ExchangeOutcome::Satisfied, Some(outcome.reasoning)).await,
                Some(follow_up) => {
                    {
                        let mut ctx = self.session_context.write();
                        if let Some(active) = ctx.active_exchange.as_mut() {
                            active.turns.push(ExchangeTurn::agent(follow_up.text.clone()));
                        }
                    }
                    self.sink
                        .emit(
                            "agent_follow_up",
                            serde_json::json!({ "agent_id": agent_id, "text": follow_up.text }),
                        )
                        .await;
                    for url in &follow_up.audio_urls {
                        self.sink
                            .emit(
                                "agent_follow_up_audio",
                                serde_json::json!({ "agent_id": agent_id, "audio_url": url }),
                            )
                            .await;
                    }

                    if follow_up.escalate {
                        self.resolve_exchange(ExchangeOutcome::Escalate, Some(outcome.reasoning)).await;
                    } else {
                        self.arm_exchange_timer();
                    }
                }
            },
        }
    }

    async fn resolve_exchange(self: &Arc<Self>, outcome: ExchangeOutcome, reasoning: Option<String>) {
        self.cancel_exchange_timer();
        self.cancel_debounce();

        let Some(mut exchange) = self.session_context.write().active_exchange.take() else {
            warn!(session_id = %self.session_id, "resolve_exchange called with no active exchange");
            self.session_context.write().state = SessionState::Presenting;
            self.sink.emit("session_state", serde_json::json!({ "state": "presenting" })).await;
            return;
        };
        exchange.outcome = Some(outcome);
        exchange.resolved_at = Some(chrono::Utc::now());
        exchange.evaluation_reasoning = reasoning;

        let agent_context = self.session_context.write().get_agent_context(&exchange.agent_id);
        {
            let mut agent_ctx = agent_context.write();
            if let Some(claim) = &exchange.target_claim {
                agent_ctx.challenged_claims.push(claim.clone());
            }
            Self::update_presenter_profile(&mut agent_ctx.presenter_profile, &exchange, outcome);
            agent_ctx.exchanges.push(exchange.clone());
        }

        {
            let mut ctx = self.session_context.write();
            ctx.completed_exchanges.push(exchange.clone());
            ctx.state = SessionState::Resolving;
        }

        record_exchange_resolved(outcome.as_str());
        self.sink
            .emit(
                "exchange_resolved",
                serde_json::json!({
                    "exchange_id": exchange.id.to_string(),
                    "agent_id": exchange.agent_id,
                    "outcome": outcome.as_str(),
                }),
            )
            .await;

        self.session_context.write().state = SessionState::Presenting;
        self.sink.emit("session_state", serde_json::json!({ "state": "presenting" })).await;

        self.event_bus
            .publish(Event::exchange_resolved(&exchange.agent_id, &exchange.id.to_string(), outcome.as_str()))
            .await;

        *self.last_resolution_at.lock() = Some(Instant::now());

        let sink = self.sink.clone();
        let tts = self.tts.clone();
        tokio::spawn(async move {
            let phrase = bridge_back_phrase(outcome);
            let audio_url = tts.synthesize(phrase).await.ok();
            sink.emit("moderator_message", serde_json::json!({ "text": phrase, "audio_url": audio_url }))
                .await;
        });
    }

    fn update_presenter_profile(
        profile: &mut boardroom_core::PresenterProfile,
        exchange: &Exchange,
        outcome: ExchangeOutcome,
    ) {
        match outcome {
            ExchangeOutcome::Satisfied if exchange.presenter_turn_count() <= 1 => {
                profile.response_patterns.push("strong direct answer".to_string());
                profile.data_readiness = DataReadiness::Strong;
            }
            ExchangeOutcome::Satisfied => {
                profile.response_patterns.push("eventually answered".to_string());
                profile.data_readiness = DataReadiness::Moderate;
            }
            ExchangeOutcome::ModeratorIntervened | ExchangeOutcome::TurnLimit => {
                profile.response_patterns.push("could not address".to_string());
                profile.data_readiness = DataReadiness::Weak;
                let mut question = exchange.question_text.clone();
                if question.chars().count() > BEHAVIORAL_NOTE_TRUNCATE_CHARS {
                    question = question.chars().take(BEHAVIORAL_NOTE_TRUNCATE_CHARS).collect::<String>() + "...";
                }
                profile.behavioral_notes.push(format!("could not resolve: \"{question}\""));
            }
            ExchangeOutcome::Escalate => {
                profile.recommended_strategy = Strategy::PushHarder;
            }
            ExchangeOutcome::Timeout => {
                profile.response_patterns.push("no response".to_string());
                profile.data_readiness = DataReadiness::Weak;
            }
            ExchangeOutcome::FollowUp => {}
        }
    }

    fn check_time_warnings(&self, slide_index: usize) {
        let elapsed = self.session_start.elapsed().as_secs_f64();
        let duration = self.session_config.duration_secs.max(1) as f64;
        let fraction = elapsed / duration;

        if fraction >= 0.9 && !self.warned_90.swap(true, Ordering::SeqCst) {
            self.emit_time_warning(slide_index, 90);
        } else if fraction >= 0.8 && !self.warned_80.swap(true, Ordering::SeqCst) {
            self.emit_time_warning(slide_index, 80);
        }
    }

    fn emit_time_warning(&self, slide_index: usize, percent: u32) {
        let sink = self.sink.clone();
        let text = format!("We're at {percent}% of the allotted time.");
        debug!(slide_index, percent, "emitting session time warning");
        tokio::spawn(async move {
            sink.emit("moderator_message", serde_json::json!({ "text": text, "audio_url": null })).await;
        });
    }

    /// Wraps this coordinator in a bus-facing subscriber, mirroring
    /// `AgentRunner::event_handler` — the coordinator needs `Arc<Self>` to
    /// spawn self-referencing timer tasks from event handling, which a plain
    /// `&self` trait method can't provide.
    pub fn event_handler(self: &Arc<Self>) -> Arc<dyn EventSubscriber> {
        Arc::new(CoordinatorEventHandler { coordinator: self.clone() })
    }

    async fn handle_event(self: &Arc<Self>, event: Event) {
        match event.event_type {
            EventType::HandRaised => {
                let Some(agent_id) = event.data.get("agent_id").and_then(|v| v.as_str()) else { return };
                let Some(candidate) = event
                    .data
                    .get("question")
                    .and_then(|v| serde_json::from_value::<CandidateQuestion>(v.clone()).ok())
                else {
                    return;
                };
                let mut queue = self.queue.lock();
                queue.entry(agent_id.to_string()).or_insert_with(|| QueuedCandidate {
                    candidate,
                    raised_at: Instant::now(),
                });
                drop(queue);
                record_hand_raised();
                self.emit_queue_snapshot();
            }
            EventType::HandLowered => {
                let Some(agent_id) = event.data.get("agent_id").and_then(|v| v.as_str()) else { return };
                let mut queue = self.queue.lock();
                queue.remove(agent_id);
                drop(queue);
                self.emit_queue_snapshot();
            }
            EventType::TranscriptUpdate => {
                let Ok(segment) = serde_json::from_value::<TranscriptSegment>(event.data) else { return };
                self.on_presenter_segment(&segment.text).await;
            }
            EventType::SlideChanged => {
                let slide_index = event.data.get("slide_index").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
                self.check_time_warnings(slide_index);
            }
            EventType::SessionEnding => {
                self.stop();
                self.cancel_exchange_timer();
                self.cancel_debounce();
            }
            _ => {}
        }
    }
}

struct CoordinatorEventHandler {
    coordinator: Arc<Coordinator>,
}

#[async_trait]
impl EventSubscriber for CoordinatorEventHandler {
    async fn on_event(&self, event: Event) {
        self.coordinator.handle_event(event).await;
    }
}
