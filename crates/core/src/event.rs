//! Per-session event bus: typed events, fan-out subscribers, diagnostic history.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_HISTORY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TranscriptUpdate,
    TranscriptInterim,
    SlideChanged,
    ExchangeStarted,
    ExchangeResolved,
    AgentSpoke,
    HandRaised,
    HandLowered,
    AgentCalledOn,
    SessionEnding,
    ClaimsReady,
}

impl EventType {
    pub const ALL: [EventType; 11] = [
        EventType::TranscriptUpdate,
        EventType::TranscriptInterim,
        EventType::SlideChanged,
        EventType::ExchangeStarted,
        EventType::ExchangeResolved,
        EventType::AgentSpoke,
        EventType::HandRaised,
        EventType::HandLowered,
        EventType::AgentCalledOn,
        EventType::SessionEnding,
        EventType::ClaimsReady,
    ];
}

/// Immutable event record. `data` stays an untyped JSON map per the design notes —
/// callers build it with the constructor helpers below rather than by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    /// "system", "moderator", or an agent_id.
    pub source: String,
}

impl Event {
    pub fn new(event_type: EventType, data: Value, source: impl Into<String>) -> Self {
        Self {
            event_type,
            data,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    pub fn transcript_update(segment: Value, source: impl Into<String>) -> Self {
        Self::new(EventType::TranscriptUpdate, segment, source)
    }

    pub fn transcript_interim(segment: Value, source: impl Into<String>) -> Self {
        Self::new(EventType::TranscriptInterim, segment, source)
    }

    pub fn slide_changed(slide_index: usize) -> Self {
        Self::new(
            EventType::SlideChanged,
            serde_json::json!({ "slide_index": slide_index }),
            "system",
        )
    }

    pub fn hand_raised(agent_id: &str, candidate: Value, priority: f64) -> Self {
        Self::new(
            EventType::HandRaised,
            serde_json::json!({ "agent_id": agent_id, "question": candidate, "priority": priority }),
            agent_id,
        )
    }

    pub fn hand_lowered(agent_id: &str, reason: &str) -> Self {
        Self::new(
            EventType::HandLowered,
            serde_json::json!({ "agent_id": agent_id, "reason": reason }),
            agent_id,
        )
    }

    pub fn agent_called_on(agent_id: &str) -> Self {
        Self::new(
            EventType::AgentCalledOn,
            serde_json::json!({ "agent_id": agent_id }),
            "moderator",
        )
    }

    pub fn agent_spoke(agent_id: &str, text: &str) -> Self {
        Self::new(
            EventType::AgentSpoke,
            serde_json::json!({ "agent_id": agent_id, "text": text }),
            agent_id,
        )
    }

    pub fn exchange_started(agent_id: &str, exchange_id: &str) -> Self {
        Self::new(
            EventType::ExchangeStarted,
            serde_json::json!({ "agent_id": agent_id, "exchange_id": exchange_id }),
            "moderator",
        )
    }

    pub fn exchange_resolved(agent_id: &str, exchange_id: &str, outcome: &str) -> Self {
        Self::new(
            EventType::ExchangeResolved,
            serde_json::json!({ "agent_id": agent_id, "exchange_id": exchange_id, "outcome": outcome }),
            "moderator",
        )
    }

    pub fn claims_ready(claims_by_slide: Value) -> Self {
        Self::new(
            EventType::ClaimsReady,
            serde_json::json!({ "claims_by_slide": claims_by_slide }),
            "system",
        )
    }

    pub fn session_ending() -> Self {
        Self::new(EventType::SessionEnding, Value::Null, "system")
    }
}

/// Implemented by anything that wants to observe the bus. One registration per
/// subscriber regardless of how many event types it cares about — mirrors
/// `subscribe_all` dispatching every variant to the same handler.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn on_event(&self, event: Event);
}

/// In-process pub/sub for a single session. Delivery is non-blocking: each
/// handler invocation runs in its own task, so a panicking handler can't take
/// down a sibling or the publisher, and per-subscriber ordering matches
/// publish order even though tasks may interleave across subscribers.
pub struct EventBus {
    session_id: String,
    subscribers: RwLock<HashMap<EventType, Vec<Arc<dyn EventSubscriber>>>>,
    history: RwLock<VecDeque<Event>>,
}

impl EventBus {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            subscribers: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::with_capacity(MAX_HISTORY)),
        }
    }

    pub fn subscribe(&self, event_type: EventType, handler: Arc<dyn EventSubscriber>) {
        self.subscribers
            .write()
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    pub fn subscribe_all(&self, handler: Arc<dyn EventSubscriber>) {
        for event_type in EventType::ALL {
            self.subscribe(event_type, handler.clone());
        }
    }

    pub async fn publish(&self, event: Event) {
        {
            let mut history = self.history.write();
            history.push_back(event.clone());
            if history.len() > MAX_HISTORY {
                history.pop_front();
            }
        }

        let handlers = {
            let subs = self.subscribers.read();
            subs.get(&event.event_type).cloned().unwrap_or_default()
        };

        for handler in handlers {
            let ev = event.clone();
            let session_id = self.session_id.clone();
            let event_type = ev.event_type;
            // Fire-and-forget: each handler gets its own task so a panic or a
            // slow handler can never block the publisher or a sibling.
            tokio::spawn(async move {
                handler.on_event(ev).await;
            });
            tracing::trace!(session_id = %session_id, ?event_type, "dispatched event to handler");
        }
    }

    pub fn get_recent_events(&self, event_type: Option<EventType>, limit: usize) -> Vec<Event> {
        let history = self.history.read();
        let filtered: Vec<Event> = match event_type {
            Some(t) => history.iter().filter(|e| e.event_type == t).cloned().collect(),
            None => history.iter().cloned().collect(),
        };
        let start = filtered.len().saturating_sub(limit);
        filtered[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl EventSubscriber for Counter {
        async fn on_event(&self, _event: Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn subscribe_all_delivers_every_variant() {
        let bus = EventBus::new("s1");
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe_all(Arc::new(Counter(count.clone())));

        bus.publish(Event::slide_changed(1)).await;
        bus.publish(Event::session_ending()).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn history_caps_at_200() {
        let bus = EventBus::new("s1");
        for i in 0..250 {
            bus.publish(Event::slide_changed(i)).await;
        }
        assert_eq!(bus.get_recent_events(None, 1000).len(), MAX_HISTORY);
    }

    #[tokio::test]
    async fn unsubscribed_event_type_is_not_delivered() {
        let bus = EventBus::new("s1");
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(EventType::SlideChanged, Arc::new(Counter(count.clone())));

        bus.publish(Event::session_ending()).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        bus.publish(Event::slide_changed(0)).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
