//! Screen-stability gating.
//!
//! After an action executes, the loop waits for the UI to stop visibly
//! changing before the next capture, replacing a static settle delay with
//! frame-diff polling. The check is visual only; nothing here guarantees the
//! UI is semantically settled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::StabilityConfig;
use crate::errors::DeskPilotResult;
use crate::perception::capture::{Frame, ScreenSource};

/// Per-channel difference below this is ignored, absorbing compression and
/// anti-aliasing noise.
const CHANNEL_TOLERANCE: i16 = 10;

/// Fraction of pixels whose RGB difference exceeds the channel tolerance.
/// 0.0 means identical, 1.0 means every pixel changed.
pub fn frame_difference(a: &Frame, b: &Frame) -> f64 {
    let img_a = &a.image;
    let resized;
    let img_b = if b.image.dimensions() == img_a.dimensions() {
        &b.image
    } else {
        resized = image::imageops::resize(
            &b.image,
            img_a.width(),
            img_a.height(),
            image::imageops::FilterType::Lanczos3,
        );
        &resized
    };

    let total = (img_a.width() * img_a.height()) as u64;
    if total == 0 {
        return 0.0;
    }

    let mut changed = 0u64;
    for (pa, pb) in img_a.pixels().zip(img_b.pixels()) {
        let differs = pa.0[..3]
            .iter()
            .zip(&pb.0[..3])
            .any(|(&ca, &cb)| (ca as i16 - cb as i16).abs() > CHANNEL_TOLERANCE);
        if differs {
            changed += 1;
        }
    }
    changed as f64 / total as f64
}

/// Polls the capture source until `min_stable_frames` consecutive
/// comparisons land at or below the diff threshold.
///
/// Returns `(stable, elapsed)`; a timeout is reported, never raised.
pub async fn wait_for_stable(
    source: &dyn ScreenSource,
    config: &StabilityConfig,
    stop_flag: &Arc<AtomicBool>,
) -> DeskPilotResult<(bool, Duration)> {
    let start = Instant::now();
    let max_wait = Duration::from_millis(config.max_wait_ms);
    let interval = Duration::from_millis(config.check_interval_ms);

    let mut stable_count = 0u32;
    let mut prev: Option<Frame> = None;

    while start.elapsed() < max_wait {
        if stop_flag.load(Ordering::Relaxed) {
            return Ok((false, start.elapsed()));
        }

        let current = source.capture().await?;

        if let Some(ref previous) = prev {
            let diff = frame_difference(previous, &current);
            if diff <= config.threshold {
                stable_count += 1;
                tracing::debug!(
                    diff = format!("{:.3}%", diff * 100.0),
                    count = stable_count,
                    needed = config.min_stable_frames,
                    "screen stable"
                );
                if stable_count >= config.min_stable_frames {
                    let elapsed = start.elapsed();
                    tracing::debug!(?elapsed, "screen stabilized");
                    return Ok((true, elapsed));
                }
            } else {
                stable_count = 0;
                tracing::debug!(diff = format!("{:.3}%", diff * 100.0), "screen changing");
            }
        }

        prev = Some(current);
        tokio::time::sleep(interval).await;
    }

    tracing::warn!(max_wait_ms = config.max_wait_ms, "screen did not stabilize");
    Ok((false, max_wait))
}

/// Whether an OS busy/loading cursor is currently shown. A visible spinner
/// means the UI is still changing even when frame diffs momentarily flatten.
#[cfg(target_os = "windows")]
pub fn is_busy_cursor_visible() -> bool {
    use windows::Win32::UI::WindowsAndMessaging::{
        GetCursorInfo, LoadCursorW, CURSORINFO, IDC_APPSTARTING, IDC_WAIT,
    };

    unsafe {
        let mut info = CURSORINFO {
            cbSize: std::mem::size_of::<CURSORINFO>() as u32,
            ..Default::default()
        };
        if GetCursorInfo(&mut info).is_err() {
            return false;
        }
        let wait = LoadCursorW(None, IDC_WAIT).ok();
        let appstarting = LoadCursorW(None, IDC_APPSTARTING).ok();
        [wait, appstarting]
            .into_iter()
            .flatten()
            .any(|h| h == info.hCursor)
    }
}

#[cfg(not(target_os = "windows"))]
pub fn is_busy_cursor_visible() -> bool {
    false
}

/// Composes the busy-cursor probe and frame-diff polling into one readiness
/// check. Never errors the loop: a timeout is a normal, reported outcome.
pub async fn wait_for_ready(
    source: &dyn ScreenSource,
    config: &StabilityConfig,
    stop_flag: &Arc<AtomicBool>,
) -> (bool, String) {
    if config.check_cursor && is_busy_cursor_visible() {
        tracing::debug!("busy cursor visible, waiting for it to clear");
        let start = Instant::now();
        let max_wait = Duration::from_millis(config.max_wait_ms);
        loop {
            if !is_busy_cursor_visible() {
                break;
            }
            if start.elapsed() >= max_wait {
                return (false, "busy cursor timeout".into());
            }
            if stop_flag.load(Ordering::Relaxed) {
                return (false, "stopped while waiting on busy cursor".into());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    match wait_for_stable(source, config, stop_flag).await {
        Ok((true, elapsed)) => (true, format!("ready after {:.2}s", elapsed.as_secs_f64())),
        Ok((false, _)) => (false, "screen did not stabilize".into()),
        Err(e) => (false, format!("capture failed during stability wait: {e}")),
    }
}
