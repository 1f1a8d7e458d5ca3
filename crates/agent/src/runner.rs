//! The per-panelist state machine: listens to the session's event bus,
//! decides when to interrupt, drafts and stages a question ahead of raising
//! its hand, and judges the presenter's answers once called on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::time::Duration;
use tracing::{debug, warn};

use boardroom_config::{PersonaTemplate, SessionConfig};
use boardroom_core::{
    AgentSessionContext, CandidateQuestion, Claim, Event, EventBus, EventSubscriber, EventType,
    Exchange,
};
use boardroom_llm::{EvaluationVerdict, Llm, LlmThrottle, SentenceSplitter, Tts};
use boardroom_pipeline::{ContextWindow, SlideInfo, TranscriptSegment};

use crate::heuristic::{evaluate_should_ask, ShouldAskInput};
use crate::observation::{AgentObservation, OtherAgentQuestion};
use crate::prompts::{
    build_agent_prompt, build_evaluation_prompt, get_fallback_question, get_target_claim,
    AgentPromptInputs, EvaluationPromptInputs,
};
use crate::state::AgentRunnerState;

const EVAL_INTERVALS: [f64; 10] = [8.0, 10.0, 12.0, 9.0, 11.0, 7.0, 13.0, 8.5, 10.5, 11.5];
const CLAIMS_READY_TIMEOUT: Duration = Duration::from_secs(30);
const WARMUP_POLL_INTERVAL: Duration = Duration::from_secs(3);
const HAND_RAISE_MAX_WAIT: Duration = Duration::from_secs(120);
const HAND_RAISE_POLL_INTERVAL: Duration = Duration::from_secs(2);
const POST_EXCHANGE_COOLDOWN: Duration = Duration::from_secs(5);
const DEFAULT_RELEVANCE_SCORE: f64 = 0.8;

/// Follow-up drafted by `handle_exchange_follow_up`, ready for the moderator
/// to play back to the presenter.
pub struct FollowUp {
    pub text: String,
    pub audio_urls: Vec<String>,
    pub escalate: bool,
    pub reasoning: String,
}

/// Result of assessing a presenter's answer: the model's reasoning always
/// comes back (stored on the exchange regardless of verdict), paired with a
/// follow-up to play back when the verdict isn't SATISFIED.
pub struct EvaluationOutcome {
    pub reasoning: String,
    pub follow_up: Option<FollowUp>,
}

pub struct AgentRunner {
    agent_id: String,
    persona: &'static PersonaTemplate,
    session_config: SessionConfig,
    slides: Vec<SlideInfo>,
    eval_interval: f64,

    event_bus: Arc<EventBus>,
    llm: Arc<dyn Llm>,
    tts: Arc<dyn Tts>,
    throttle: LlmThrottle,
    session_context: Arc<RwLock<AgentSessionContext>>,

    observation: Mutex<AgentObservation>,
    context_window: Mutex<ContextWindow>,
    claims_by_slide: RwLock<HashMap<usize, Vec<Claim>>>,
    state: Mutex<AgentRunnerState>,
    buffered_question: Mutex<Option<CandidateQuestion>>,

    question_count: AtomicUsize,
    last_question_elapsed: Mutex<Option<f64>>,
    session_start: Instant,

    claims_ready: Notify,
    called_on: Notify,
    called_on_flag: AtomicBool,
    stop_notify: Notify,
    stopped: AtomicBool,
}

impl AgentRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent_id: impl Into<String>,
        agent_index: usize,
        persona: &'static PersonaTemplate,
        session_config: SessionConfig,
        slides: Vec<SlideInfo>,
        session_context: Arc<RwLock<AgentSessionContext>>,
        event_bus: Arc<EventBus>,
        llm: Arc<dyn Llm>,
        tts: Arc<dyn Tts>,
        throttle: LlmThrottle,
    ) -> Self {
        let eval_interval = EVAL_INTERVALS[agent_index % EVAL_INTERVALS.len()];
        Self {
            agent_id: agent_id.into(),
            persona,
            session_config,
            slides,
            eval_interval,
            event_bus,
            llm,
            tts,
            throttle,
            session_context,
            observation: Mutex::new(AgentObservation::default()),
            context_window: Mutex::new(ContextWindow::new()),
            claims_by_slide: RwLock::new(HashMap::new()),
            state: Mutex::new(AgentRunnerState::Loading),
            buffered_question: Mutex::new(None),
            question_count: AtomicUsize::new(0),
            last_question_elapsed: Mutex::new(None),
            session_start: Instant::now(),
            claims_ready: Notify::new(),
            called_on: Notify::new(),
            called_on_flag: AtomicBool::new(false),
            stop_notify: Notify::new(),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn state(&self) -> AgentRunnerState {
        *self.state.lock()
    }

    pub fn buffered_question(&self) -> Option<CandidateQuestion> {
        self.buffered_question.lock().clone()
    }

    /// Wraps this runner in a bus-facing subscriber. The runner itself is not
    /// the subscriber (it isn't `Send`-safe to hand around as a trait object
    /// while also being driven by `run`), so callers register this instead.
    pub fn event_handler(self: &Arc<Self>) -> Arc<dyn EventSubscriber> {
        Arc::new(AgentEventHandler { runner: self.clone() })
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_notify.notify_waiters();
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: AgentRunnerState) {
        debug!(agent_id = %self.agent_id, ?state, "agent state transition");
        *self.state.lock() = state;
    }

    /// Drives the full LOADING -> WARMING_UP -> LISTENING/EVALUATING/
    /// GENERATING/READY -> IN_EXCHANGE/COOLDOWN cycle until the session ends.
    pub async fn run(self: Arc<Self>) {
        self.set_state(AgentRunnerState::Loading);
        self.wait_for_claims_ready().await;
        if self.is_stopped() {
            return;
        }

        self.set_state(AgentRunnerState::WarmingUp);
        self.warm_up().await;

        self.set_state(AgentRunnerState::Listening);
        while !self.is_stopped() {
            tokio::time::sleep(Duration::from_secs_f64(self.eval_interval)).await;
            if self.is_stopped() {
                break;
            }

            if self.another_agent_is_in_exchange() {
                continue;
            }

            self.set_state(AgentRunnerState::Evaluating);
            if !self.should_ask_now() {
                self.set_state(AgentRunnerState::Listening);
                continue;
            }

            self.set_state(AgentRunnerState::Generating);
            let question = self.generate_question().await;

            // A slide change mid-generation invalidates the candidate: once
            // queued (READY) the question survives a later slide change, but
            // one that lands before it's even queued means it's moot.
            if self.observation.lock().current_slide != question.slide_index {
                debug!(agent_id = %self.agent_id, "dropping candidate question invalidated by slide change");
                self.set_state(AgentRunnerState::Listening);
                continue;
            }

            *self.buffered_question.lock() = Some(question.clone());
            self.set_state(AgentRunnerState::Ready);

            let question_value = serde_json::to_value(&question).unwrap_or(serde_json::Value::Null);
            self.event_bus
                .publish(Event::hand_raised(&self.agent_id, question_value, question.relevance_score))
                .await;

            if self.wait_for_call_on().await {
                self.question_count.fetch_add(1, Ordering::SeqCst);
                *self.last_question_elapsed.lock() = Some(self.session_start.elapsed().as_secs_f64());
                self.set_state(AgentRunnerState::InExchange);
                self.wait_for_exchange_resolution().await;
                self.set_state(AgentRunnerState::Cooldown);
                tokio::time::sleep(POST_EXCHANGE_COOLDOWN).await;
            } else {
                self.event_bus
                    .publish(Event::hand_lowered(&self.agent_id, "timed_out"))
                    .await;
            }

            *self.buffered_question.lock() = None;
            self.set_state(AgentRunnerState::Listening);
        }
    }

    async fn wait_for_claims_ready(&self) {
        tokio::select! {
            _ = self.claims_ready.notified() => {}
            _ = tokio::time::sleep(CLAIMS_READY_TIMEOUT) => {
                warn!(agent_id = %self.agent_id, "timed out waiting for claim extraction; proceeding without claims");
            }
        }
    }

    async fn warm_up(&self) {
        let min_words = self.session_config.agent_warmup_words;
        while !self.is_stopped() {
            if self.observation.lock().has_sufficient_context(min_words) {
                return;
            }
            tokio::time::sleep(WARMUP_POLL_INTERVAL).await;
        }
    }

    fn another_agent_is_in_exchange(&self) -> bool {
        let obs = self.observation.lock();
        obs.exchange_active && obs.exchange_agent.as_deref() != Some(self.agent_id.as_str())
    }

    fn should_ask_now(&self) -> bool {
        let mut obs = self.observation.lock();
        let current_count = obs.transcript_segments.len();
        let growth = current_count as i64 - obs.last_eval_transcript_count as i64;
        obs.last_eval_transcript_count = current_count;
        let current_slide = obs.current_slide;
        let has_any_transcript = current_count > 0;
        drop(obs);

        let unchallenged = {
            let claims_by_slide = self.claims_by_slide.read();
            let challenged = &self.session_context.read().challenged_claims;
            claims_by_slide
                .get(&current_slide)
                .map(|claims| claims.iter().filter(|c| !challenged.contains(&c.text)).count())
                .unwrap_or(0)
        };

        let input = ShouldAskInput {
            elapsed_secs: self.session_start.elapsed().as_secs_f64(),
            last_question_time: *self.last_question_elapsed.lock(),
            transcript_growth: growth,
            has_any_transcript,
            unchallenged_claim_count: unchallenged,
            session_duration_secs: self.session_config.duration_secs as f64,
            question_count: self.question_count.load(Ordering::SeqCst),
        };

        evaluate_should_ask(&input).should_ask
    }

    /// Waits up to `HAND_RAISE_MAX_WAIT` of *actively idle* time for a call-on
    /// event addressed to this agent. Time spent while another agent's
    /// exchange is in progress doesn't count against the wait, so a long
    /// exchange elsewhere never starves a queued hand.
    async fn wait_for_call_on(&self) -> bool {
        let mut waited = Duration::ZERO;
        loop {
            if self.called_on_flag.swap(false, Ordering::SeqCst) {
                return true;
            }
            if self.is_stopped() {
                return false;
            }

            let blocked_elsewhere = self.another_agent_is_in_exchange();
            tokio::select! {
                _ = self.called_on.notified() => {
                    if self.called_on_flag.swap(false, Ordering::SeqCst) {
                        return true;
                    }
                }
                _ = tokio::time::sleep(HAND_RAISE_POLL_INTERVAL) => {}
            }

            if !blocked_elsewhere {
                waited += HAND_RAISE_POLL_INTERVAL;
            }
            if waited >= HAND_RAISE_MAX_WAIT {
                return false;
            }
        }
    }

    async fn wait_for_exchange_resolution(&self) {
        while !self.is_stopped() {
            if !self.observation.lock().exchange_active {
                return;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn generate_question(&self) -> CandidateQuestion {
        let _permit = self.throttle.acquire().await;

        let (current_slide, cross_agent_questions, challenged, exchange_history, presenter_profile_text) = {
            let obs = self.observation.lock();
            let slide = obs.current_slide;
            let cross_agent = obs.other_agent_questions.clone();
            drop(obs);
            let ctx = self.session_context.read();
            (
                slide,
                cross_agent,
                ctx.challenged_claims.clone(),
                ctx.exchanges.clone(),
                ctx.presenter_profile.to_text(),
            )
        };

        let claims_for_slide = self.claims_by_slide.read().get(&current_slide).cloned().unwrap_or_default();
        let target_claim = get_target_claim(&claims_for_slide, &challenged);
        let previous_questions: Vec<String> =
            exchange_history.iter().map(|e| e.question_text.clone()).collect();

        let context = {
            let mut window = self.context_window.lock();
            window.get_context_for_agent(current_slide, &self.slides, self.session_start.elapsed().as_secs_f64())
        };

        let prompt = build_agent_prompt(&AgentPromptInputs {
            persona: self.persona,
            session_config: &self.session_config,
            context: &context,
            exchange_history: &exchange_history,
            cross_agent_questions: &cross_agent_questions,
            presenter_profile_text: &presenter_profile_text,
            target_claim: target_claim.as_deref(),
            previous_questions: &previous_questions,
        });

        let (text, audio_urls, streamed_ok) = self.stream_question(&prompt).await;

        let (text, audio_urls) = if streamed_ok && !text.trim().is_empty() {
            (text.trim().to_string(), audio_urls)
        } else {
            let fallback =
                get_fallback_question(Some(self.persona), self.question_count.load(Ordering::SeqCst));
            let mut urls = Vec::new();
            match self.tts.synthesize(&fallback).await {
                Ok(url) => urls.push(url),
                Err(e) => warn!(agent_id = %self.agent_id, error = %e, "fallback tts synthesis failed"),
            }
            (fallback, urls)
        };

        CandidateQuestion {
            agent_id: self.agent_id.clone(),
            text,
            target_claim,
            slide_index: current_slide,
            audio_urls,
            relevance_score: DEFAULT_RELEVANCE_SCORE,
        }
    }

    /// Streams the question from the LLM, firing TTS per completed sentence
    /// as soon as the splitter emits it so playback can start before the
    /// rest of the answer finishes generating.
    async fn stream_question(&self, prompt: &str) -> (String, Vec<String>, bool) {
        let splitter = SentenceSplitter::new();
        let audio_urls = Arc::new(Mutex::new(Vec::new()));
        let mut full_text = String::new();
        let mut tasks = Vec::new();
        let mut ok = true;

        let mut stream = self.llm.generate_question_streaming(prompt);
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(text) => {
                    full_text.push_str(&text);
                    for sentence in splitter.push(&text) {
                        tasks.push(self.spawn_tts(sentence, audio_urls.clone()));
                    }
                }
                Err(e) => {
                    warn!(agent_id = %self.agent_id, error = %e, "question stream failed");
                    ok = false;
                    break;
                }
            }
        }
        drop(stream);

        if ok {
            if let Some(sentence) = splitter.flush() {
                tasks.push(self.spawn_tts(sentence, audio_urls.clone()));
            }
        }
        for task in tasks {
            let _ = task.await;
        }

        let urls = audio_urls.lock().clone();
        (full_text, urls, ok)
    }

    fn spawn_tts(&self, sentence: String, audio_urls: Arc<Mutex<Vec<String>>>) -> tokio::task::JoinHandle<()> {
        let tts = self.tts.clone();
        let agent_id = self.agent_id.clone();
        tokio::spawn(async move {
            match tts.synthesize(&sentence).await {
                Ok(url) => audio_urls.lock().push(url),
                Err(e) => warn!(agent_id = %agent_id, error = %e, "sentence tts synthesis failed"),
            }
        })
    }

    /// Called by the session coordinator after each presenter turn within an
    /// exchange this agent owns. A `None` `follow_up` means satisfied — the
    /// exchange can close without another turn. Returns `None` outright only
    /// when the LLM call itself fails (treated as satisfied with no reasoning
    /// to record).
    pub async fn handle_exchange_follow_up(&self, exchange: &Exchange) -> Option<EvaluationOutcome> {
        let _permit = self.throttle.acquire().await;
        let prompt = build_evaluation_prompt(&EvaluationPromptInputs {
            persona: self.persona,
            question_text: &exchange.question_text,
            exchange,
            max_turns: self.session_config.max_turns(),
        });

        let result = match self.llm.evaluate_response(&prompt).await {
            Ok(result) => result,
            Err(e) => {
                warn!(agent_id = %self.agent_id, error = %e, "evaluation failed; defaulting to satisfied");
                return None;
            }
        };

        let follow_up = match result.verdict {
            EvaluationVerdict::Satisfied => None,
            EvaluationVerdict::FollowUp | EvaluationVerdict::Escalate => {
                let text = result.follow_up_question.unwrap_or_else(|| {
                    get_fallback_question(Some(self.persona), self.question_count.load(Ordering::SeqCst))
                });
                let mut audio_urls = Vec::new();
                match self.tts.synthesize(&text).await {
                    Ok(url) => audio_urls.push(url),
                    Err(e) => warn!(agent_id = %self.agent_id, error = %e, "follow-up tts failed"),
                }
                Some(FollowUp {
                    text,
                    audio_urls,
                    escalate: matches!(result.verdict, EvaluationVerdict::Escalate),
                    reasoning: result.reasoning.clone(),
                })
            }
        };

        Some(EvaluationOutcome { reasoning: result.reasoning, follow_up })
    }

    fn handle_event(&self, event: Event) {
        match event.event_type {
            EventType::TranscriptUpdate => {
                if let Ok(segment) = serde_json::from_value::<TranscriptSegment>(event.data) {
                    self.context_window.lock().add_segment(segment.clone());
                    self.observation.lock().add_transcript(segment);
                }
            }
            EventType::SlideChanged => {
                if let Some(index) = event.data.get("slide_index").and_then(|v| v.as_u64()) {
                    let index = index as usize;
                    self.context_window.lock().on_slide_change(index, &self.slides);
                    self.observation.lock().set_slide(index);
                }
            }
            EventType::ClaimsReady => {
                if let Some(raw) = event.data.get("claims_by_slide") {
                    if let Ok(parsed) = serde_json::from_value::<HashMap<String, Vec<Claim>>>(raw.clone()) {
                        let mut by_slide = HashMap::with_capacity(parsed.len());
                        for (slide, claims) in parsed {
                            if let Ok(index) = slide.parse::<usize>() {
                                by_slide.insert(index, claims);
                            }
                        }
                        *self.claims_by_slide.write() = by_slide;
                    }
                }
                self.claims_ready.notify_one();
            }
            EventType::ExchangeStarted => {
                if let Some(agent_id) = event.data.get("agent_id").and_then(|v| v.as_str()) {
                    self.observation.lock().set_exchange_active(true, Some(agent_id.to_string()));
                }
            }
            EventType::ExchangeResolved => {
                self.observation.lock().set_exchange_active(false, None);
            }
            EventType::AgentCalledOn => {
                if event.data.get("agent_id").and_then(|v| v.as_str()) == Some(self.agent_id.as_str()) {
                    self.called_on_flag.store(true, Ordering::SeqCst);
                    self.called_on.notify_one();
                }
            }
            EventType::AgentSpoke => {
                let agent_id = event.data.get("agent_id").and_then(|v| v.as_str());
                let text = event.data.get("text").and_then(|v| v.as_str());
                if let (Some(agent_id), Some(text)) = (agent_id, text) {
                    self.observation.lock().add_other_agent_question(
                        &self.agent_id,
                        OtherAgentQuestion {
                            agent_id: agent_id.to_string(),
                            text: text.to_string(),
                        },
                    );
                }
            }
            EventType::SessionEnding => {
                self.stop();
            }
            EventType::TranscriptInterim | EventType::HandRaised | EventType::HandLowered => {}
        }
    }
}

struct AgentEventHandler {
    runner: Arc<AgentRunner>,
}

#[async_trait]
impl EventSubscriber for AgentEventHandler {
    async fn on_event(&self, event: Event) {
        self.runner.handle_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardroom_llm::{EvaluationResult, LlmError, TextStream, TtsError};
    use boardroom_pipeline::SlideInfo;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    struct StubLlm {
        question: String,
        evaluation: Mutex<Option<EvaluationResult>>,
    }

    #[async_trait]
    impl Llm for StubLlm {
        async fn generate_question(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.question.clone())
        }

        fn generate_question_streaming<'a>(&'a self, _prompt: &'a str) -> TextStream<'a> {
            let text = self.question.clone();
            Box::pin(futures::stream::once(async move { Ok(text) }))
        }

        async fn evaluate_response(&self, _prompt: &str) -> Result<EvaluationResult, LlmError> {
            Ok(self.evaluation.lock().take().unwrap_or(EvaluationResult {
                verdict: EvaluationVerdict::Satisfied,
                reasoning: String::new(),
                follow_up_question: None,
            }))
        }

        async fn generate_debrief(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(String::new())
        }

        async fn generate_text(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(String::new())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubTts {
        calls: StdAtomicUsize,
    }

    #[async_trait]
    impl Tts for StubTts {
        async fn synthesize(&self, _text: &str) -> Result<String, TtsError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://tts.test/clip-{n}.mp3"))
        }
    }

    fn test_persona() -> &'static PersonaTemplate {
        boardroom_config::get_agent_templates("skeptic").expect("bundled skeptic persona present")
    }

    fn make_runner(llm: Arc<dyn Llm>, tts: Arc<dyn Tts>) -> Arc<AgentRunner> {
        let session_config = SessionConfig {
            interaction_mode: "voice".into(),
            intensity: boardroom_config::Intensity::Moderate,
            agents: vec!["skeptic".into()],
            focus_areas: vec![],
            duration_secs: 600,
            agent_warmup_words: 5,
        };
        let session_context = Arc::new(RwLock::new(AgentSessionContext::new("skeptic")));
        let event_bus = Arc::new(EventBus::new("test-session"));
        Arc::new(AgentRunner::new(
            "skeptic",
            0,
            test_persona(),
            session_config,
            vec![SlideInfo { title: "Market".into(), ..Default::default() }],
            session_context,
            event_bus,
            llm,
            tts,
            LlmThrottle::new(2),
        ))
    }

    #[tokio::test]
    async fn generate_question_uses_streamed_llm_text_and_stages_audio() {
        let llm = Arc::new(StubLlm {
            question: "What evidence backs that figure?".to_string(),
            evaluation: Mutex::new(None),
        });
        let tts = Arc::new(StubTts { calls: StdAtomicUsize::new(0) });
        let runner = make_runner(llm, tts);

        let question = runner.generate_question().await;
        assert_eq!(question.text, "What evidence backs that figure?");
        assert!(!question.audio_urls.is_empty());
        assert_eq!(question.agent_id, "skeptic");
    }

    #[tokio::test]
    async fn handle_exchange_follow_up_returns_none_when_satisfied() {
        let llm = Arc::new(StubLlm {
            question: String::new(),
            evaluation: Mutex::new(Some(EvaluationResult {
                verdict: EvaluationVerdict::Satisfied,
                reasoning: "the presenter cited a named third-party source".to_string(),
                follow_up_question: None,
            })),
        });
        let tts = Arc::new(StubTts { calls: StdAtomicUsize::new(0) });
        let runner = make_runner(llm, tts);

        let exchange = Exchange::new("skeptic", "What's your TAM?", None, 0);
        let outcome = runner
            .handle_exchange_follow_up(&exchange)
            .await
            .expect("evaluation outcome expected");
        assert!(outcome.follow_up.is_none());
        assert_eq!(outcome.reasoning, "the presenter cited a named third-party source");
    }

    #[tokio::test]
    async fn handle_exchange_follow_up_synthesizes_audio_when_not_satisfied() {
        let llm = Arc::new(StubLlm {
            question: String::new(),
            evaluation: Mutex::new(Some(EvaluationResult {
                verdict: EvaluationVerdict::FollowUp,
                reasoning: "the figure was asserted without a source".to_string(),
                follow_up_question: Some("But what's the source of that number?".to_string()),
            })),
        });
        let tts = Arc::new(StubTts { calls: StdAtomicUsize::new(0) });
        let runner = make_runner(llm, tts);

        let exchange = Exchange::new("skeptic", "What's your TAM?", None, 0);
        let outcome = runner.handle_exchange_follow_up(&exchange).await.expect("evaluation outcome expected");
        assert_eq!(outcome.reasoning, "the figure was asserted without a source");
        let follow_up = outcome.follow_up.expect("follow-up expected");
        assert_eq!(follow_up.text, "But what's the source of that number?");
        assert!(!follow_up.audio_urls.is_empty());
        assert!(!follow_up.escalate);
    }

    #[tokio::test]
    async fn event_handler_updates_observation_from_transcript_event() {
        let llm = Arc::new(StubLlm { question: String::new(), evaluation: Mutex::new(None) });
        let tts = Arc::new(StubTts { calls: StdAtomicUsize::new(0) });
        let runner = make_runner(llm, tts);
        let handler = runner.event_handler();

        let segment = TranscriptSegment { text: "revenue grew forty percent".into(), start_time: 0.0, end_time: 1.0 };
        let data = serde_json::to_value(&segment).unwrap();
        handler.on_event(Event::transcript_update(data, "presenter")).await;

        assert_eq!(runner.observation.lock().transcript_segments.len(), 1);
    }
}
