//! Cross-thread interrupt surface.
//!
//! Front-ends (voice, chat, a control UI) never touch the loop directly;
//! they flip atomic flags or push steering text through a channel, and the
//! loop observes both once per iteration. Resolution latency is bounded by
//! one iteration, which a human can always ride out by re-issuing the
//! signal. No locks are held across the boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

/// Loop-side view of the interrupt state. Owned by the orchestrator.
pub struct LoopSignals {
    abort: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    skip: Arc<AtomicBool>,
    steering_rx: mpsc::UnboundedReceiver<String>,
}

/// Front-end handle. Clone freely; every method is fire-and-forget.
#[derive(Clone)]
pub struct AgentHandle {
    abort: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    skip: Arc<AtomicBool>,
    steering_tx: mpsc::UnboundedSender<String>,
}

impl LoopSignals {
    pub fn new() -> (Self, AgentHandle) {
        let abort = Arc::new(AtomicBool::new(false));
        let paused = Arc::new(AtomicBool::new(false));
        let skip = Arc::new(AtomicBool::new(false));
        let (steering_tx, steering_rx) = mpsc::unbounded_channel();
        let handle = AgentHandle {
            abort: abort.clone(),
            paused: paused.clone(),
            skip: skip.clone(),
            steering_tx,
        };
        (
            Self {
                abort,
                paused,
                skip,
                steering_rx,
            },
            handle,
        )
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Consumes a pending skip request.
    pub fn take_skip(&self) -> bool {
        self.skip.swap(false, Ordering::Relaxed)
    }

    /// Shared abort flag, handed to the inference client and stability gate
    /// so in-flight work can observe a stop.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    /// Drains all steering text queued since the last call.
    pub fn drain_steering(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(text) = self.steering_rx.try_recv() {
            out.push(text);
        }
        out
    }

    /// Clears every interrupt flag so the next task starts clean. Queued
    /// steering text is kept; guidance injected before a task starts applies
    /// to its first iteration.
    pub fn reset(&mut self) {
        self.abort.store(false, Ordering::Relaxed);
        self.paused.store(false, Ordering::Relaxed);
        self.skip.store(false, Ordering::Relaxed);
    }
}

impl AgentHandle {
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
        // Abort wins over pause; a paused loop must still see the stop.
        self.paused.store(false, Ordering::Relaxed);
        tracing::info!("abort requested");
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
        tracing::info!("pause requested");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
        tracing::info!("resume requested");
    }

    pub fn skip_step(&self) {
        self.skip.store(true, Ordering::Relaxed);
        tracing::info!("step skip requested");
    }

    /// Queues free-text guidance for the next planning prompt.
    pub fn inject_context(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(text = %text, "steering context injected");
        let _ = self.steering_tx.send(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_round_trip_across_the_handle() {
        let (mut signals, handle) = LoopSignals::new();
        assert!(!signals.is_aborted());

        handle.pause();
        assert!(signals.is_paused());
        handle.resume();
        assert!(!signals.is_paused());

        handle.skip_step();
        assert!(signals.take_skip());
        assert!(!signals.take_skip(), "skip is consumed once");

        handle.pause();
        handle.abort();
        assert!(signals.is_aborted());
        assert!(!signals.is_paused(), "abort clears pause");

        signals.reset();
        assert!(!signals.is_aborted());
    }

    #[test]
    fn steering_drains_everything_queued() {
        let (mut signals, handle) = LoopSignals::new();
        handle.inject_context("use the keyboard");
        handle.inject_context("try the second result");
        assert_eq!(
            signals.drain_steering(),
            vec!["use the keyboard", "try the second result"]
        );
        assert!(signals.drain_steering().is_empty());
    }

    #[test]
    fn reset_clears_flags_but_keeps_steering() {
        let (mut signals, handle) = LoopSignals::new();
        handle.abort();
        handle.inject_context("queued before the task");
        signals.reset();
        assert!(!signals.is_aborted());
        assert_eq!(signals.drain_steering(), vec!["queued before the task"]);
    }
}
