//! Validated execution of one action intent against the host input devices.

use std::time::Duration;

use crate::config::ExecutorConfig;
use crate::coordinates::{clamp_to_screen, validate_pixel};
use crate::errors::{DeskPilotError, DeskPilotResult};
use crate::executor::input::InputDriver;
use crate::executor::intent::{ActionIntent, ActionPayload, Point};
use crate::perception::window_context::focus_window_by_title;

/// Pointer within this many pixels of a screen corner trips the failsafe.
const FAILSAFE_CORNER_MARGIN: i32 = 2;

/// Translates validated [`ActionIntent`]s into device input.
///
/// Side effects are limited to the host input devices; bookkeeping (the
/// action history, the journal) lives with the loop that owns the intent.
pub struct ActionExecutor {
    screen_w: u32,
    screen_h: u32,
    confidence_threshold: f64,
    action_delay: Duration,
    pause_before: Duration,
    failsafe_enabled: bool,
    driver: Box<dyn InputDriver>,
}

impl ActionExecutor {
    pub fn new(
        driver: Box<dyn InputDriver>,
        screen_w: u32,
        screen_h: u32,
        config: &ExecutorConfig,
    ) -> Self {
        Self {
            screen_w,
            screen_h,
            confidence_threshold: config.confidence_threshold,
            action_delay: Duration::from_millis(config.action_delay_ms),
            pause_before: Duration::from_millis(config.pause_before_ms),
            failsafe_enabled: config.failsafe_enabled,
            driver,
        }
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_w, self.screen_h)
    }

    /// Executes one intent. Returns `Ok(false)` when the confidence gate
    /// skipped it, `Ok(true)` when input was injected.
    ///
    /// Coordinates are expected in pixel space; anything out of bounds is
    /// clamped with a warning rather than rejected.
    pub async fn execute(&mut self, intent: &ActionIntent) -> DeskPilotResult<bool> {
        if intent.confidence < self.confidence_threshold {
            tracing::warn!(
                confidence = intent.confidence,
                threshold = self.confidence_threshold,
                kind = intent.kind_name(),
                target = %intent.target,
                "confidence below threshold, skipping action"
            );
            return Ok(false);
        }

        if self.failsafe_enabled && self.pointer_in_corner()? {
            tracing::error!("failsafe triggered: pointer parked in a screen corner");
            return Err(DeskPilotError::FailsafeTriggered);
        }

        tracing::info!(
            kind = intent.kind_name(),
            target = %intent.target,
            confidence = intent.confidence,
            "executing action"
        );

        tokio::time::sleep(self.pause_before).await;

        self.dispatch(intent).await?;

        tokio::time::sleep(self.action_delay).await;
        Ok(true)
    }

    async fn dispatch(&mut self, intent: &ActionIntent) -> DeskPilotResult<()> {
        match &intent.payload {
            ActionPayload::Click { at } => {
                let (x, y) = self.validated(*at);
                self.driver.click(x, y)
            }
            ActionPayload::DoubleClick { at } => {
                let (x, y) = self.validated(*at);
                self.driver.double_click(x, y)
            }
            ActionPayload::RightClick { at } => {
                let (x, y) = self.validated(*at);
                self.driver.right_click(x, y)
            }
            ActionPayload::TripleClick { at } => {
                let (x, y) = self.validated(*at);
                self.driver.triple_click(x, y)
            }
            ActionPayload::Move { at } => {
                let (x, y) = self.validated(*at);
                self.driver.move_to(x, y)
            }
            ActionPayload::Drag { from, to, duration_ms } => {
                let from = self.validated(*from);
                let to = self.validated(*to);
                self.driver
                    .drag(from, to, Duration::from_millis(*duration_ms))
            }
            ActionPayload::Scroll { amount, at } => {
                let at = at.map(|p| self.validated(p));
                self.driver.scroll(*amount, at)
            }
            ActionPayload::Type { text, focus_at } => {
                if let Some(at) = focus_at {
                    let (x, y) = self.validated(*at);
                    self.driver.click(x, y)?;
                    tokio::time::sleep(Duration::from_millis(150)).await;
                }
                self.driver.type_text(text)
            }
            ActionPayload::Press { key } => self.driver.press_key(key),
            ActionPayload::Hotkey { keys } => self.driver.hotkey(keys),
            ActionPayload::Copy => self.chord("c"),
            ActionPayload::Paste => self.chord("v"),
            ActionPayload::Cut => self.chord("x"),
            ActionPayload::SelectAll => self.chord("a"),
            ActionPayload::FocusWindow { title } => {
                if focus_window_by_title(title) {
                    Ok(())
                } else {
                    Err(DeskPilotError::Action(format!(
                        "no window matching '{title}'"
                    )))
                }
            }
            ActionPayload::Minimize => self.driver.hotkey(&["win".into(), "down".into()]),
            ActionPayload::Maximize => self.driver.hotkey(&["win".into(), "up".into()]),
            ActionPayload::CloseWindow => self.driver.hotkey(&["alt".into(), "f4".into()]),
            ActionPayload::LaunchApp { name } => self.launch_app(name).await,
            ActionPayload::OpenUrl { url } => self.open_url(url).await,
            ActionPayload::Wait { duration_ms } => {
                tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
                Ok(())
            }
        }
    }

    /// Drives the OS launcher: open search, type the app name, confirm.
    async fn launch_app(&mut self, name: &str) -> DeskPilotResult<()> {
        self.driver.press_key("win")?;
        tokio::time::sleep(Duration::from_millis(500)).await;
        self.driver.type_text(name)?;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        self.driver.press_key("enter")?;
        // Give the application a moment to start before the post-action delay.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        Ok(())
    }

    /// Opens a URL through the run dialog.
    async fn open_url(&mut self, url: &str) -> DeskPilotResult<()> {
        self.driver.hotkey(&["win".into(), "r".into()])?;
        tokio::time::sleep(Duration::from_millis(500)).await;
        self.driver.type_text(url)?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.driver.press_key("enter")?;
        tokio::time::sleep(Duration::from_millis(1000)).await;
        Ok(())
    }

    fn chord(&mut self, letter: &str) -> DeskPilotResult<()> {
        self.driver.hotkey(&["ctrl".into(), letter.into()])
    }

    fn pointer_in_corner(&mut self) -> DeskPilotResult<bool> {
        let (x, y) = self.driver.pointer_location()?;
        let near_left = x <= FAILSAFE_CORNER_MARGIN;
        let near_right = x >= self.screen_w as i32 - 1 - FAILSAFE_CORNER_MARGIN;
        let near_top = y <= FAILSAFE_CORNER_MARGIN;
        let near_bottom = y >= self.screen_h as i32 - 1 - FAILSAFE_CORNER_MARGIN;
        Ok((near_left || near_right) && (near_top || near_bottom))
    }

    fn validated(&self, p: Point) -> (i32, i32) {
        let (x, y) = p.rounded();
        if validate_pixel(x, y, self.screen_w, self.screen_h) {
            (x, y)
        } else {
            let (cx, cy) = clamp_to_screen(x, y, self.screen_w, self.screen_h);
            tracing::warn!(
                from = ?(x, y),
                to = ?(cx, cy),
                screen = ?(self.screen_w, self.screen_h),
                "coordinates out of bounds, clamping"
            );
            (cx, cy)
        }
    }
}
