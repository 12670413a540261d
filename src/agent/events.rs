//! Broadcast event stream for observers.
//!
//! The loop publishes state transitions, model thoughts, dispatched actions
//! and captured frames. Delivery is best effort: with no subscriber, or a
//! subscriber that has fallen behind, events are dropped rather than
//! blocking the loop.

use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Running,
    Paused,
    Done,
    Aborted,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Status {
        state: AgentStatus,
        detail: Option<String>,
    },
    Thought {
        text: String,
    },
    Action {
        kind: String,
        target: String,
    },
    Frame {
        png_base64: String,
    },
}

#[derive(Clone)]
pub struct EventSink {
    tx: broadcast::Sender<AgentEvent>,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: AgentEvent) {
        // Err means no live subscriber; the loop does not care.
        let _ = self.tx.send(event);
    }

    pub fn status(&self, state: AgentStatus, detail: Option<String>) {
        self.emit(AgentEvent::Status { state, detail });
    }

    pub fn thought(&self, text: impl Into<String>) {
        self.emit(AgentEvent::Thought { text: text.into() });
    }

    pub fn action(&self, kind: impl Into<String>, target: impl Into<String>) {
        self.emit(AgentEvent::Action {
            kind: kind.into(),
            target: target.into(),
        });
    }

    pub fn frame(&self, png_base64: impl Into<String>) {
        self.emit(AgentEvent::Frame {
            png_base64: png_base64.into(),
        });
    }
}
