//! Wires one boardroom session together: the event bus, shared session
//! context, one `AgentRunner` per configured panelist, the `Coordinator`,
//! the outbound `Sink`, and the STT gate feeding it presenter speech.
//!
//! A `SessionManager` is the process-wide in-memory registry the HTTP/WS
//! layer looks sessions up through — modeled on the teacher's
//! `SessionManager`, minus the distributed-store machinery this domain has
//! no use for.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::info;

use boardroom_agent::AgentRunner;
use boardroom_config::{get_agent_templates, SessionConfig};
use boardroom_core::{Event, EventBus, SessionContext};
use boardroom_llm::{extract_claims_concurrently, Llm, LlmThrottle, SlideContent, Tts};
use boardroom_pipeline::{SlideInfo, SttGate, SttTransport};

use crate::coordinator::Coordinator;
use crate::error::ServerError;
use crate::sink::{BroadcastSink, Sink};
use crate::store::Store;

/// Everything needed to stand a session up, independent of how the caller
/// assembled it (REST handler, test harness, ...).
pub struct SessionDeps {
    pub llm: Arc<dyn Llm>,
    pub tts: Arc<dyn Tts>,
    pub stt_transport: SttTransport,
    pub store: Arc<dyn Store>,
    pub slides: Vec<SlideInfo>,
}

/// A single live session: the bus, the agents, the moderator, and the
/// background tasks driving all of them.
pub struct SessionRuntime {
    pub session_id: String,
    pub session_context: Arc<RwLock<SessionContext>>,
    pub event_bus: Arc<EventBus>,
    pub sink: Arc<BroadcastSink>,
    pub store: Arc<dyn Store>,
    coordinator: Arc<Coordinator>,
    agents: HashMap<String, Arc<AgentRunner>>,
    stt_gate: tokio::sync::Mutex<SttGate>,
    shutdown: watch::Sender<bool>,
}

impl SessionRuntime {
    pub async fn start(
        session_id: impl Into<String>,
        session_config: SessionConfig,
        deps: SessionDeps,
    ) -> Result<Arc<Self>, ServerError> {
        let session_id = session_id.into();
        let event_bus = Arc::new(EventBus::new(session_id.clone()));
        let session_context = Arc::new(RwLock::new(SessionContext::new(session_id.clone())));
        let sink: Arc<BroadcastSink> = Arc::new(BroadcastSink::new(256));
        let throttle = LlmThrottle::default();

        let mut agents = HashMap::new();
        for (index, agent_id) in session_config.agents.iter().enumerate() {
            let persona = get_agent_templates(agent_id)
                .ok_or_else(|| ServerError::UnknownPersona(agent_id.clone()))?;
            let agent_context = session_context.write().get_agent_context(agent_id);
            let runner = Arc::new(AgentRunner::new(
                agent_id.clone(),
                index,
                persona,
                session_config.clone(),
                deps.slides.clone(),
                agent_context,
                event_bus.clone(),
                deps.llm.clone(),
                deps.tts.clone(),
                throttle.clone(),
            ));
            event_bus.subscribe_all(runner.event_handler());
            agents.insert(agent_id.clone(), runner);
        }

        let coordinator = Coordinator::new(
            session_id.clone(),
            session_config.clone(),
            agents.clone(),
            session_context.clone(),
            event_bus.clone(),
            sink.clone() as Arc<dyn Sink>,
            deps.tts.clone(),
        );
        event_bus.subscribe_all(coordinator.event_handler());

        let (shutdown_tx, _) = watch::channel(false);

        let runtime = Arc::new(Self {
            session_id: session_id.clone(),
            session_context,
            event_bus,
            sink,
            store: deps.store,
            coordinator,
            agents,
            stt_gate: tokio::sync::Mutex::new(SttGate::new(deps.stt_transport)),
            shutdown: shutdown_tx,
        });

        runtime.spawn_background_tasks(deps.llm, deps.slides);
        Ok(runtime)
    }

    fn spawn_background_tasks(self: &Arc<Self>, llm: Arc<dyn Llm>, slides: Vec<SlideInfo>) {
        for runner in self.agents.values() {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run().await });
        }

        let coordinator = self.coordinator.clone();
        tokio::spawn(async move { coordinator.run().await });

        let event_bus = self.event_bus.clone();
        let session_id = self.session_id.clone();
        tokio::spawn(async move {
            let slide_contents: Vec<SlideContent> = slides
                .iter()
                .enumerate()
                .map(|(index, s)| SlideContent {
                    index,
                    title: s.title.clone(),
                    body_text: s.body_text.clone(),
                })
                .collect();
            let claims = extract_claims_concurrently(llm, slide_contents).await;
            let claims_value = serde_json::to_value(&claims).unwrap_or(serde_json::Value::Null);
            info!(session_id = %session_id, slide_count = claims.len(), "initial claim extraction complete");
            event_bus.publish(Event::claims_ready(claims_value)).await;
        });
    }

    /// Feeds one PCM frame of presenter audio into the STT gate and
    /// publishes any finalized segments onto the bus.
    pub async fn ingest_audio_frame(&self, pcm: &[i16]) {
        let mut gate = self.stt_gate.lock().await;
        match gate.ingest_frame(pcm).await {
            Ok(segments) => {
                for segment in segments {
                    if let Some(text) = boardroom_pipeline::filter_segment(&segment.text) {
                        let transcript = boardroom_pipeline::TranscriptSegment {
                            text,
                            start_time: segment.start_time.unwrap_or(0.0),
                            end_time: segment.end_time.unwrap_or(0.0),
                        };
                        let value = serde_json::to_value(&transcript).unwrap_or(serde_json::Value::Null);
                        self.event_bus.publish(Event::transcript_update(value, "presenter")).await;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(session_id = %self.session_id, error = %err, "stt ingest failed");
            }
        }
    }

    pub async fn shutdown(&self) {
        self.event_bus.publish(Event::session_ending()).await;
        for runner in self.agents.values() {
            runner.stop();
        }
        self.coordinator.stop();
        let _ = self.shutdown.send(true);
    }
}

/// Process-wide registry of live sessions.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<SessionRuntime>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, runtime: Arc<SessionRuntime>) {
        self.sessions.write().insert(runtime.session_id.clone(), runtime);
    }

    pub fn get(&self, session_id: &str) -> Result<Arc<SessionRuntime>, ServerError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| ServerError::SessionNotFound(session_id.to_string()))
    }

    pub async fn end(&self, session_id: &str) -> Result<(), ServerError> {
        let runtime = self.get(session_id)?;
        runtime.shutdown().await;
        self.sessions.write().remove(session_id);
        Ok(())
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_starts_empty() {
        let manager = SessionManager::new();
        assert!(manager.list().is_empty());
        assert!(manager.get("missing").is_err());
    }
}
