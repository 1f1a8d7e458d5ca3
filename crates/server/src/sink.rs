//! The session's outbound event surface: everything the Coordinator and
//! AgentRunners want a connected client to know about goes through a
//! `Sink`, decoupling the core logic from any one transport.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// One outbound message: an event name plus its JSON payload, exactly as
/// named in the external-interfaces list (`agent_question`, `agent_thinking`,
/// `exchange_resolved`, `session_state`, ...).
#[derive(Debug, Clone, Serialize)]
pub struct SinkMessage {
    pub event: String,
    pub payload: Value,
}

#[async_trait]
pub trait Sink: Send + Sync {
    async fn emit(&self, event_name: &str, payload: Value);
}

/// Fans every emitted event out over a broadcast channel; a WebSocket
/// handler (or a test) subscribes and forwards messages to its client.
/// Lagging subscribers drop the oldest messages rather than blocking emit.
pub struct BroadcastSink {
    sender: broadcast::Sender<SinkMessage>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SinkMessage> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Sink for BroadcastSink {
    async fn emit(&self, event_name: &str, payload: Value) {
        // No receivers is the common case before a client connects; not an error.
        let _ = self.sender.send(SinkMessage {
            event: event_name.to_string(),
            payload,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_events() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();

        sink.emit("agent_question", serde_json::json!({"text": "why?"})).await;

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event, "agent_question");
        assert_eq!(msg.payload["text"], "why?");
    }

    #[tokio::test]
    async fn emit_without_subscribers_does_not_panic() {
        let sink = BroadcastSink::new(16);
        sink.emit("session_state", serde_json::json!({"state": "presenting"})).await;
    }
}
