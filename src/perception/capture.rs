//! Primary-monitor screen capture.
//!
//! Capture is pinned to the primary monitor so that the coordinate transform
//! always works in one pixel frame; virtual-screen offsets from secondary
//! monitors never leak into the rest of the system.

use std::io::Cursor;

use async_trait::async_trait;
use base64::Engine as _;
use image::RgbaImage;

use crate::errors::{DeskPilotError, DeskPilotResult};

/// One screen capture plus its pixel dimensions. Transient; only the most
/// recent frame is ever retained.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// PNG-encodes the frame and returns it base64 encoded, ready for a
    /// data URI or the live-view event sink.
    pub fn to_png_base64(&self) -> DeskPilotResult<String> {
        let mut buf = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(&buf))
    }
}

/// Screen-capture capability consumed by the stability gate and the agent
/// loop. Mocked in tests.
#[async_trait]
pub trait ScreenSource: Send + Sync {
    async fn capture(&self) -> DeskPilotResult<Frame>;

    /// Pixel dimensions of the primary monitor.
    fn screen_size(&self) -> (u32, u32);
}

/// xcap-backed capture of the primary monitor.
pub struct PrimaryMonitorCapture {
    width: u32,
    height: u32,
}

impl PrimaryMonitorCapture {
    pub fn new() -> DeskPilotResult<Self> {
        let monitor = primary_monitor()?;
        Ok(Self {
            width: monitor.width(),
            height: monitor.height(),
        })
    }
}

fn primary_monitor() -> DeskPilotResult<xcap::Monitor> {
    let monitors =
        xcap::Monitor::all().map_err(|e| DeskPilotError::Capture(format!("enumerate monitors: {e}")))?;
    monitors
        .into_iter()
        .find(|m| m.is_primary())
        .ok_or_else(|| DeskPilotError::Capture("no primary monitor found".into()))
}

#[async_trait]
impl ScreenSource for PrimaryMonitorCapture {
    async fn capture(&self) -> DeskPilotResult<Frame> {
        // Monitor handles are not held across captures; re-resolve each time
        // so display reconfiguration cannot invalidate a cached handle.
        let monitor = primary_monitor()?;
        let image = monitor
            .capture_image()
            .map_err(|e| DeskPilotError::Capture(format!("capture failed: {e}")))?;
        Ok(Frame::new(image))
    }

    fn screen_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
