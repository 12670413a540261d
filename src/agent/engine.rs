//! The perceive-plan-act loop.
//!
//! Each iteration captures the screen, asks the model for one action,
//! executes it, then waits for the UI to settle. Interrupt flags are
//! observed once per iteration; nothing inside the loop is allowed to tear
//! the task down except an abort, the failsafe, or the step limit.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tokio::time::Instant;

use crate::agent::events::{AgentStatus, EventSink};
use crate::agent::history::{ActionOutcome, ActionRecord, RecentActions};
use crate::agent::journal::SessionJournal;
use crate::agent::signals::LoopSignals;
use crate::config::{AppConfig, StabilityConfig};
use crate::coordinates::CalibrationOffset;
use crate::errors::DeskPilotError;
use crate::executor::executor::ActionExecutor;
use crate::executor::intent::decode_intent;
use crate::llm::client::ModelClient;
use crate::llm::prompts::{plan_action_prompt, recovery_prompt};
use crate::perception::capture::{Frame, ScreenSource};
use crate::perception::stability::wait_for_ready;
use crate::perception::window_context::active_window_context;

/// How long the terminal status stays visible before the sink reverts to
/// idle.
const IDLE_REVERT_DELAY: Duration = Duration::from_secs(3);

/// Poll interval while paused.
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Backoff after a failed capture, so a transient source outage does not
/// burn the whole iteration budget in milliseconds.
const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Outcome of one task run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub success: bool,
    pub message: String,
    pub steps_taken: u32,
    pub duration_seconds: f64,
    pub error: Option<String>,
}

pub struct Orchestrator {
    client: Arc<dyn ModelClient>,
    screen: Arc<dyn ScreenSource>,
    executor: ActionExecutor,
    stability: StabilityConfig,
    calibration: CalibrationOffset,
    max_iterations: u32,
    ui_settle: Duration,
    idle_delay: Duration,
    signals: LoopSignals,
    events: EventSink,
    journal: Option<SessionJournal>,
    history: RecentActions,
    last_error: Option<String>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn ModelClient>,
        screen: Arc<dyn ScreenSource>,
        executor: ActionExecutor,
        config: &AppConfig,
        signals: LoopSignals,
        events: EventSink,
    ) -> Self {
        let journal = if config.agent.journal_enabled {
            match SessionJournal::new() {
                Ok(j) => Some(j),
                Err(e) => {
                    tracing::warn!(error = %e, "journal disabled: could not create session file");
                    None
                }
            }
        } else {
            None
        };

        Self {
            client,
            screen,
            executor,
            stability: config.stability.clone(),
            calibration: CalibrationOffset::from(config.calibration),
            max_iterations: config.agent.max_iterations,
            ui_settle: Duration::from_millis(config.agent.ui_settle_ms),
            idle_delay: IDLE_REVERT_DELAY,
            signals,
            events,
            journal,
            history: RecentActions::new(),
            last_error: None,
        }
    }

    /// Runs one task to a terminal outcome. Per-task state and interrupt
    /// flags are reset on entry and again on exit, so a stale pause or abort
    /// from a previous task never leaks into this one.
    pub async fn run_task(&mut self, task: &str) -> TaskResult {
        tracing::info!(task, "task started");
        self.signals.reset();
        self.history.clear();
        self.last_error = None;
        self.events.status(AgentStatus::Running, Some(task.to_string()));
        if let Some(journal) = &self.journal {
            journal.record("task_start", json!({ "task": task }));
        }

        let start = Instant::now();
        let (result, terminal) = self.iterate(task, start).await;

        self.signals.reset();
        if let Some(journal) = &self.journal {
            journal.record("task_result", &result);
        }
        self.events.status(terminal, Some(result.message.clone()));
        let events = self.events.clone();
        let idle_delay = self.idle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(idle_delay).await;
            events.status(AgentStatus::Idle, None);
        });

        tracing::info!(
            success = result.success,
            steps = result.steps_taken,
            duration_s = format!("{:.1}", result.duration_seconds),
            message = %result.message,
            "task finished"
        );
        result
    }

    async fn iterate(&mut self, task: &str, start: Instant) -> (TaskResult, AgentStatus) {
        let (screen_w, screen_h) = self.screen.screen_size();
        let abort_flag = self.signals.abort_flag();

        for step in 0..self.max_iterations {
            if self.signals.is_aborted() {
                return Self::aborted(step, start);
            }

            if self.signals.is_paused() {
                self.events.status(AgentStatus::Paused, None);
                while self.signals.is_paused() && !self.signals.is_aborted() {
                    tokio::time::sleep(PAUSE_POLL).await;
                }
                if self.signals.is_aborted() {
                    return Self::aborted(step, start);
                }
                self.events.status(AgentStatus::Running, None);
            }

            if self.signals.take_skip() {
                tracing::info!(step = step + 1, "step skipped on request");
                continue;
            }

            let frame = match self.screen.capture().await {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "screen capture failed");
                    self.last_error = Some(format!("screen capture failed: {e}"));
                    tokio::time::sleep(CAPTURE_RETRY_DELAY).await;
                    continue;
                }
            };
            let image_b64 = match frame.to_png_base64() {
                Ok(b64) => b64,
                Err(e) => {
                    self.last_error = Some(format!("frame encoding failed: {e}"));
                    tokio::time::sleep(CAPTURE_RETRY_DELAY).await;
                    continue;
                }
            };
            self.events.frame(image_b64.clone());

            let context = self.build_context(&frame, step, screen_w, screen_h);
            let prompt = plan_action_prompt(task, &context, &self.history.prompt_trace());

            let response = match self
                .client
                .send_request(&prompt, Some(&image_b64), &abort_flag)
                .await
            {
                Ok(response) => response,
                Err(DeskPilotError::Aborted) => return Self::aborted(step, start),
                Err(e) => {
                    tracing::warn!(error = %e, "planning request failed");
                    self.last_error = Some(e.to_string());
                    continue;
                }
            };

            self.emit_thoughts(&response.raw_text);

            let Some(plan) = response.plan else {
                tracing::warn!("model response contained no action JSON");
                self.last_error =
                    Some("previous response contained no usable action JSON".into());
                continue;
            };

            if plan["task_complete"].as_bool().unwrap_or(false) {
                return (
                    TaskResult {
                        success: true,
                        message: "Task complete".into(),
                        steps_taken: step + 1,
                        duration_seconds: start.elapsed().as_secs_f64(),
                        error: None,
                    },
                    AgentStatus::Done,
                );
            }

            let mut intent = match decode_intent(&plan) {
                Ok(intent) => intent,
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable plan");
                    self.last_error = Some(e.to_string());
                    continue;
                }
            };
            intent.resolve_coordinates(screen_w, screen_h, self.calibration);

            let run_len = self
                .history
                .repeat_run_len(intent.kind_name(), &intent.target);

            self.events.action(intent.kind_name(), &intent.target);

            let outcome = match self.executor.execute(&intent).await {
                Ok(true) => {
                    self.last_error = None;
                    ActionOutcome::Executed
                }
                Ok(false) => {
                    self.last_error = Some(format!(
                        "'{}' on '{}' skipped: model confidence too low",
                        intent.kind_name(),
                        intent.target
                    ));
                    ActionOutcome::Skipped
                }
                Err(DeskPilotError::FailsafeTriggered) => {
                    return (
                        TaskResult {
                            success: false,
                            message: "Failsafe triggered".into(),
                            steps_taken: step + 1,
                            duration_seconds: start.elapsed().as_secs_f64(),
                            error: Some("failsafe triggered".into()),
                        },
                        AgentStatus::Aborted,
                    );
                }
                Err(DeskPilotError::Aborted) => return Self::aborted(step + 1, start),
                Err(e) => {
                    tracing::warn!(error = %e, "action failed");
                    self.last_error = Some(format!("action failed: {e}"));
                    ActionOutcome::Failed
                }
            };

            let point = intent.primary_point().map(|p| p.rounded());
            let record = ActionRecord {
                kind: intent.kind_name().to_string(),
                target: intent.target.clone(),
                x: point.map(|(x, _)| x),
                y: point.map(|(_, y)| y),
                outcome,
            };
            if let Some(journal) = &self.journal {
                journal.record("action", &record);
            }
            self.history.push(record);

            // The nudge overrides whatever the execution left behind: the
            // action may have "succeeded" at the device level while doing
            // nothing on screen, which is exactly the case to break out of.
            if run_len >= 2 {
                tracing::warn!(
                    kind = intent.kind_name(),
                    target = %intent.target,
                    run = run_len,
                    "action repeating, injecting recovery directive"
                );
                self.last_error = Some(recovery_prompt(
                    &format!("{} on '{}'", intent.kind_name(), intent.target),
                    run_len,
                ));
            }

            if self.stability.enabled {
                let (ready, reason) =
                    wait_for_ready(self.screen.as_ref(), &self.stability, &abort_flag).await;
                if !ready {
                    tracing::debug!(%reason, "proceeding without a stable screen");
                }
            } else {
                tokio::time::sleep(self.ui_settle).await;
            }
        }

        // Exhausting the iteration budget is an expected outcome for tasks
        // the model cannot finish, not a fault.
        (
            TaskResult {
                success: false,
                message: "Step limit reached".into(),
                steps_taken: self.max_iterations,
                duration_seconds: start.elapsed().as_secs_f64(),
                error: None,
            },
            AgentStatus::Error,
        )
    }

    fn build_context(&mut self, frame: &Frame, step: u32, screen_w: u32, screen_h: u32) -> String {
        let mut lines = vec![
            format!(
                "Screen: {screen_w}x{screen_h} (capture {}x{})",
                frame.width(),
                frame.height()
            ),
            format!("Step: {}/{}", step + 1, self.max_iterations),
        ];

        let windows = active_window_context();
        if !windows.is_empty() {
            lines.push(windows);
        }
        if let Some(error) = &self.last_error {
            lines.push(format!("Previous issue: {error}"));
        }
        for text in self.signals.drain_steering() {
            lines.push(format!("User: {text}"));
        }

        lines.join("\n")
    }

    /// Surfaces the model's `<observation>` and `<reasoning>` blocks to
    /// observers. Free-form text outside the tags is dropped.
    fn emit_thoughts(&self, raw: &str) {
        for (tag, limit) in [("observation", 200), ("reasoning", 300)] {
            let Ok(re) = regex::Regex::new(&format!(r"(?s)<{tag}>(.*?)</{tag}>")) else {
                continue;
            };
            if let Some(cap) = re.captures(raw) {
                let text: String = cap[1].trim().chars().take(limit).collect();
                if !text.is_empty() {
                    tracing::info!(tag, text = %text, "model");
                    self.events.thought(text);
                }
            }
        }
    }

    fn aborted(steps: u32, start: Instant) -> (TaskResult, AgentStatus) {
        (
            TaskResult {
                success: false,
                message: "Aborted".into(),
                steps_taken: steps,
                duration_seconds: start.elapsed().as_secs_f64(),
                error: Some("aborted".into()),
            },
            AgentStatus::Aborted,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};

    use crate::errors::DeskPilotResult;
    use crate::executor::input::InputDriver;
    use crate::llm::client::{extract_json, ModelResponse};

    #[derive(Default)]
    struct TestScreen {
        captures: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ScreenSource for TestScreen {
        async fn capture(&self) -> DeskPilotResult<Frame> {
            self.captures
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Frame::new(RgbaImage::from_pixel(
                8,
                8,
                Rgba([0, 0, 0, 255]),
            )))
        }

        fn screen_size(&self) -> (u32, u32) {
            (1920, 1080)
        }
    }

    struct FailingScreen;

    #[async_trait]
    impl ScreenSource for FailingScreen {
        async fn capture(&self) -> DeskPilotResult<Frame> {
            Err(DeskPilotError::Capture("display locked".into()))
        }

        fn screen_size(&self) -> (u32, u32) {
            (1920, 1080)
        }
    }

    struct ScriptedClient {
        responses: Mutex<VecDeque<DeskPilotResult<ModelResponse>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<DeskPilotResult<ModelResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(script.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn check_health(&self) -> bool {
            true
        }

        async fn send_request(
            &self,
            prompt: &str,
            _image_base64: Option<&str>,
            _abort: &Arc<std::sync::atomic::AtomicBool>,
        ) -> DeskPilotResult<ModelResponse> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DeskPilotError::Inference("script exhausted".into())))
        }
    }

    fn reply(raw: &str) -> DeskPilotResult<ModelResponse> {
        Ok(ModelResponse {
            raw_text: raw.to_string(),
            plan: extract_json(raw),
        })
    }

    /// Runs a one-shot callback when the first planning request arrives,
    /// then delegates to the script. Lets a test interrupt the loop from
    /// "inside" an iteration without racing wall-clock timers.
    struct HookClient {
        inner: Arc<ScriptedClient>,
        hook: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl HookClient {
        fn new(inner: Arc<ScriptedClient>, hook: impl FnOnce() + Send + 'static) -> Arc<Self> {
            Arc::new(Self {
                inner,
                hook: Mutex::new(Some(Box::new(hook))),
            })
        }
    }

    #[async_trait]
    impl ModelClient for HookClient {
        async fn check_health(&self) -> bool {
            true
        }

        async fn send_request(
            &self,
            prompt: &str,
            image_base64: Option<&str>,
            abort: &Arc<std::sync::atomic::AtomicBool>,
        ) -> DeskPilotResult<ModelResponse> {
            if let Some(hook) = self.hook.lock().unwrap().take() {
                hook();
            }
            self.inner.send_request(prompt, image_base64, abort).await
        }
    }

    struct RecorderDriver {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl InputDriver for RecorderDriver {
        fn pointer_location(&mut self) -> DeskPilotResult<(i32, i32)> {
            Ok((500, 500))
        }
        fn click(&mut self, x: i32, y: i32) -> DeskPilotResult<()> {
            self.calls.lock().unwrap().push(format!("click({x},{y})"));
            Ok(())
        }
        fn double_click(&mut self, x: i32, y: i32) -> DeskPilotResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("double_click({x},{y})"));
            Ok(())
        }
        fn right_click(&mut self, x: i32, y: i32) -> DeskPilotResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("right_click({x},{y})"));
            Ok(())
        }
        fn triple_click(&mut self, x: i32, y: i32) -> DeskPilotResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("triple_click({x},{y})"));
            Ok(())
        }
        fn move_to(&mut self, x: i32, y: i32) -> DeskPilotResult<()> {
            self.calls.lock().unwrap().push(format!("move_to({x},{y})"));
            Ok(())
        }
        fn drag(
            &mut self,
            from: (i32, i32),
            to: (i32, i32),
            _duration: Duration,
        ) -> DeskPilotResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("drag({from:?},{to:?})"));
            Ok(())
        }
        fn scroll(&mut self, amount: i64, at: Option<(i32, i32)>) -> DeskPilotResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("scroll({amount},{at:?})"));
            Ok(())
        }
        fn type_text(&mut self, text: &str) -> DeskPilotResult<()> {
            self.calls.lock().unwrap().push(format!("type({text})"));
            Ok(())
        }
        fn press_key(&mut self, key: &str) -> DeskPilotResult<()> {
            self.calls.lock().unwrap().push(format!("press({key})"));
            Ok(())
        }
        fn hotkey(&mut self, keys: &[String]) -> DeskPilotResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("hotkey({})", keys.join("+")));
            Ok(())
        }
    }

    fn build_orchestrator(
        client: Arc<dyn ModelClient>,
        screen: Arc<dyn ScreenSource>,
        signals: LoopSignals,
        max_iterations: u32,
    ) -> (Orchestrator, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let driver = RecorderDriver {
            calls: calls.clone(),
        };

        let mut config = AppConfig::default();
        config.agent.max_iterations = max_iterations;
        config.agent.ui_settle_ms = 0;
        config.agent.journal_enabled = false;
        config.stability.enabled = false;
        config.executor.action_delay_ms = 0;
        config.executor.pause_before_ms = 0;

        let executor = ActionExecutor::new(Box::new(driver), 1920, 1080, &config.executor);
        let mut orch = Orchestrator::new(client, screen, executor, &config, signals, EventSink::new());
        orch.idle_delay = Duration::from_millis(0);
        (orch, calls)
    }

    fn orchestrator(
        client: Arc<ScriptedClient>,
        max_iterations: u32,
    ) -> (Orchestrator, crate::agent::signals::AgentHandle, Arc<Mutex<Vec<String>>>) {
        let (signals, handle) = LoopSignals::new();
        let (orch, calls) = build_orchestrator(
            client,
            Arc::new(TestScreen::default()),
            signals,
            max_iterations,
        );
        (orch, handle, calls)
    }

    const CLICK_CENTER: &str = r#"<observation>dialog open</observation>
<reasoning>press OK</reasoning>
```json
{"action": "CLICK", "target": "OK button", "coordinates": {"x": 500, "y": 500}, "confidence": 0.95, "task_complete": false}
```"#;

    const COMPLETE: &str = r#"<observation>done</observation>
```json
{"action": "WAIT", "task_complete": true}
```"#;

    #[tokio::test]
    async fn completes_after_clicking_where_the_model_pointed() {
        let client = ScriptedClient::new(vec![reply(CLICK_CENTER), reply(COMPLETE)]);
        let (mut orch, _handle, calls) = orchestrator(client.clone(), 10);

        let result = orch.run_task("close the dialog").await;

        assert!(result.success);
        assert_eq!(result.steps_taken, 2);
        assert!(result.error.is_none());
        // (500, 500) normalized lands at the center of a 1920x1080 screen.
        assert_eq!(*calls.lock().unwrap(), vec!["click(960,540)"]);
        assert!(client.prompts()[0].contains("TASK: close the dialog"));
        assert!(client.prompts()[0].contains("Screen: 1920x1080"));
    }

    #[tokio::test]
    async fn repeating_action_injects_recovery_into_the_next_prompt() {
        let client = ScriptedClient::new(vec![
            reply(CLICK_CENTER),
            reply(CLICK_CENTER),
            reply(CLICK_CENTER),
            reply(COMPLETE),
        ]);
        let (mut orch, _handle, _calls) = orchestrator(client.clone(), 10);

        let result = orch.run_task("close the dialog").await;
        assert!(result.success);

        let prompts = client.prompts();
        assert!(!prompts[1].contains("Do NOT repeat the same action"));
        assert!(prompts[2].contains("Previous issue:"));
        assert!(prompts[2].contains("Do NOT repeat the same action"));
        assert!(prompts[2].contains("CLICK on 'OK button'"));
    }

    #[tokio::test]
    async fn abort_from_inference_ends_the_task() {
        let client = ScriptedClient::new(vec![Err(DeskPilotError::Aborted)]);
        let (mut orch, _handle, calls) = orchestrator(client, 10);

        let result = orch.run_task("anything").await;

        assert!(!result.success);
        assert_eq!(result.message, "Aborted");
        assert_eq!(result.steps_taken, 0);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn step_limit_caps_the_run() {
        let client = ScriptedClient::new(vec![
            reply(CLICK_CENTER),
            reply(CLICK_CENTER),
            reply(CLICK_CENTER),
        ]);
        let (mut orch, _handle, calls) = orchestrator(client, 3);

        let result = orch.run_task("never finishes").await;

        assert!(!result.success);
        assert_eq!(result.message, "Step limit reached");
        assert_eq!(result.steps_taken, 3);
        assert!(result.error.is_none(), "budget exhaustion is not a fault");
        assert_eq!(calls.lock().unwrap().len(), 3);
        // The loop's ring is the single record of what happened.
        assert_eq!(orch.history.len(), 3);
        assert_eq!(
            orch.history.last().unwrap().outcome,
            ActionOutcome::Executed
        );
    }

    #[tokio::test]
    async fn unusable_response_is_reported_to_the_next_prompt() {
        let client = ScriptedClient::new(vec![
            reply("I am not sure what to do here, no JSON from me."),
            reply(COMPLETE),
        ]);
        let (mut orch, _handle, calls) = orchestrator(client.clone(), 10);

        let result = orch.run_task("open notepad").await;

        assert!(result.success);
        assert_eq!(result.steps_taken, 2);
        assert!(calls.lock().unwrap().is_empty());
        let prompts = client.prompts();
        assert!(prompts[1].contains("Previous issue: previous response contained no usable action JSON"));
    }

    #[tokio::test]
    async fn transient_inference_failure_does_not_end_the_task() {
        let client = ScriptedClient::new(vec![
            Err(DeskPilotError::Inference("server error 500".into())),
            reply(COMPLETE),
        ]);
        let (mut orch, _handle, _calls) = orchestrator(client.clone(), 10);

        let result = orch.run_task("open notepad").await;

        assert!(result.success);
        assert!(client.prompts()[1].contains("Previous issue:"));
    }

    #[tokio::test]
    async fn steering_text_lands_in_the_next_prompt() {
        let client = ScriptedClient::new(vec![reply(CLICK_CENTER), reply(COMPLETE)]);
        let (mut orch, handle, _calls) = orchestrator(client.clone(), 10);

        handle.inject_context("prefer keyboard shortcuts");
        let result = orch.run_task("open notepad").await;

        assert!(result.success);
        let prompts = client.prompts();
        assert!(prompts[0].contains("User: prefer keyboard shortcuts"));
        assert!(!prompts[1].contains("User:"), "steering is consumed once");
    }

    #[tokio::test]
    async fn skip_consumes_one_iteration_without_acting() {
        let script = ScriptedClient::new(vec![reply(CLICK_CENTER), reply(COMPLETE)]);
        let (signals, handle) = LoopSignals::new();
        let h = handle.clone();
        let client = HookClient::new(script.clone(), move || h.skip_step());
        let screen = Arc::new(TestScreen::default());
        let (mut orch, calls) =
            build_orchestrator(client, screen.clone(), signals, 10);

        let result = orch.run_task("close the dialog").await;

        assert!(result.success);
        // Iteration 2 was skipped: no capture, no planning request, no input.
        assert_eq!(result.steps_taken, 3);
        assert_eq!(script.prompts().len(), 2);
        assert_eq!(screen.captures.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pause_blocks_the_loop_until_resumed() {
        let script = ScriptedClient::new(vec![reply(CLICK_CENTER), reply(COMPLETE)]);
        let (signals, handle) = LoopSignals::new();
        let h = handle.clone();
        let client = HookClient::new(script.clone(), move || h.pause());
        let (mut orch, _calls) = build_orchestrator(
            client,
            Arc::new(TestScreen::default()),
            signals,
            10,
        );

        let resumer = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            resumer.resume();
        });

        let started = std::time::Instant::now();
        let result = orch.run_task("close the dialog").await;

        assert!(result.success);
        assert!(
            started.elapsed() >= Duration::from_millis(250),
            "loop did not block while paused"
        );
    }

    #[tokio::test]
    async fn abort_while_paused_ends_the_task() {
        let script = ScriptedClient::new(vec![reply(CLICK_CENTER), reply(COMPLETE)]);
        let (signals, handle) = LoopSignals::new();
        let h = handle.clone();
        let client = HookClient::new(script.clone(), move || h.pause());
        let (mut orch, _calls) = build_orchestrator(
            client,
            Arc::new(TestScreen::default()),
            signals,
            10,
        );

        let aborter = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            aborter.abort();
        });

        let result = orch.run_task("close the dialog").await;

        assert!(!result.success);
        assert_eq!(result.message, "Aborted");
        assert_eq!(script.prompts().len(), 1, "no planning after the abort");
    }

    #[tokio::test]
    async fn failing_capture_backs_off_instead_of_spinning() {
        let client = ScriptedClient::new(vec![]);
        let (signals, _handle) = LoopSignals::new();
        let (mut orch, _calls) =
            build_orchestrator(client.clone(), Arc::new(FailingScreen), signals, 2);

        let started = std::time::Instant::now();
        let result = orch.run_task("anything").await;

        assert!(!result.success);
        assert_eq!(result.message, "Step limit reached");
        assert!(client.prompts().is_empty(), "no planning without a frame");
        assert!(
            started.elapsed() >= Duration::from_millis(800),
            "capture failures were not delayed"
        );
    }
}
