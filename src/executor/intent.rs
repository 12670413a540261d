//! Decoding of model action JSON into typed intents.
//!
//! The wire schema is one JSON object per iteration:
//! `{"action": "CLICK", "target": "...", "coordinates": {"x": 0..1000,
//! "y": 0..1000}, ...}` with kind-specific optional fields. Unknown action
//! kinds and pointer kinds without coordinates are hard decode errors;
//! everything else defaults.

use serde::Serialize;
use serde_json::Value;

use crate::coordinates::{to_pixels, BoundingBox, CalibrationOffset};
use crate::errors::{DeskPilotError, DeskPilotResult};

/// A 2D point. Decoded in the model's normalized space, rewritten in place
/// to pixel space by [`ActionIntent::resolve_coordinates`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn rounded(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// One constructor per action kind the model may request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    Click { at: Point },
    DoubleClick { at: Point },
    RightClick { at: Point },
    TripleClick { at: Point },
    Move { at: Point },
    Drag { from: Point, to: Point, duration_ms: u64 },
    Scroll { amount: i64, at: Option<Point> },
    Type { text: String, focus_at: Option<Point> },
    Press { key: String },
    Hotkey { keys: Vec<String> },
    Copy,
    Paste,
    Cut,
    SelectAll,
    FocusWindow { title: String },
    Minimize,
    Maximize,
    CloseWindow,
    LaunchApp { name: String },
    OpenUrl { url: String },
    Wait { duration_ms: u64 },
}

/// The decoded instruction from one model response. Created fresh each
/// iteration and consumed immediately.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionIntent {
    pub payload: ActionPayload,
    pub target: String,
    pub confidence: f64,
    pub thought: String,
}

impl ActionIntent {
    /// Wire name of the action kind, as the model spelled it.
    pub fn kind_name(&self) -> &'static str {
        match self.payload {
            ActionPayload::Click { .. } => "CLICK",
            ActionPayload::DoubleClick { .. } => "DOUBLE_CLICK",
            ActionPayload::RightClick { .. } => "RIGHT_CLICK",
            ActionPayload::TripleClick { .. } => "TRIPLE_CLICK",
            ActionPayload::Move { .. } => "MOVE",
            ActionPayload::Drag { .. } => "DRAG",
            ActionPayload::Scroll { .. } => "SCROLL",
            ActionPayload::Type { .. } => "TYPE",
            ActionPayload::Press { .. } => "PRESS",
            ActionPayload::Hotkey { .. } => "HOTKEY",
            ActionPayload::Copy => "COPY",
            ActionPayload::Paste => "PASTE",
            ActionPayload::Cut => "CUT",
            ActionPayload::SelectAll => "SELECT_ALL",
            ActionPayload::FocusWindow { .. } => "FOCUS_WINDOW",
            ActionPayload::Minimize => "MINIMIZE",
            ActionPayload::Maximize => "MAXIMIZE",
            ActionPayload::CloseWindow => "CLOSE_WINDOW",
            ActionPayload::LaunchApp { .. } => "LAUNCH_APP",
            ActionPayload::OpenUrl { .. } => "OPEN_URL",
            ActionPayload::Wait { .. } => "WAIT",
        }
    }

    /// Primary coordinate of the action, if it has one.
    pub fn primary_point(&self) -> Option<Point> {
        match &self.payload {
            ActionPayload::Click { at }
            | ActionPayload::DoubleClick { at }
            | ActionPayload::RightClick { at }
            | ActionPayload::TripleClick { at }
            | ActionPayload::Move { at } => Some(*at),
            ActionPayload::Drag { from, .. } => Some(*from),
            ActionPayload::Scroll { at, .. } => *at,
            ActionPayload::Type { focus_at, .. } => *focus_at,
            _ => None,
        }
    }

    /// Rewrites every normalized coordinate to primary-monitor pixels,
    /// adding the calibration offset after scaling.
    pub fn resolve_coordinates(
        &mut self,
        screen_w: u32,
        screen_h: u32,
        offset: CalibrationOffset,
    ) {
        let resolve = |p: &mut Point| {
            let (px, py) = to_pixels(p.x, p.y, screen_w, screen_h);
            let (px, py) = offset.apply(px, py);
            p.x = px as f64;
            p.y = py as f64;
        };
        match &mut self.payload {
            ActionPayload::Click { at }
            | ActionPayload::DoubleClick { at }
            | ActionPayload::RightClick { at }
            | ActionPayload::TripleClick { at }
            | ActionPayload::Move { at } => resolve(at),
            ActionPayload::Drag { from, to, .. } => {
                resolve(from);
                resolve(to);
            }
            ActionPayload::Scroll { at: Some(at), .. } => resolve(at),
            ActionPayload::Type { focus_at: Some(at), .. } => resolve(at),
            _ => {}
        }
    }
}

fn point_from(value: &Value, key: &str) -> Option<Point> {
    // Coordinates appear either nested under `coordinates` / `end_coordinates`
    // or as top-level x/y fields; some models answer with a region instead.
    let nested = &value[key];
    let (x, y) = if nested.is_object() {
        (nested["x"].as_f64(), nested["y"].as_f64())
    } else {
        (None, None)
    };
    let x = x.or_else(|| value["x"].as_f64());
    let y = y.or_else(|| value["y"].as_f64());
    match (x, y) {
        (Some(x), Some(y)) => Some(Point { x, y }),
        _ => bbox_center(value),
    }
}

/// Region forms (`bbox` / `bbox_2d`, `[x1, y1, x2, y2]`) resolve to the
/// center of the box.
fn bbox_center(value: &Value) -> Option<Point> {
    let arr = value["bbox"]
        .as_array()
        .or_else(|| value["bbox_2d"].as_array())?;
    let nums: Vec<f64> = arr.iter().filter_map(Value::as_f64).collect();
    if nums.len() != 4 {
        return None;
    }
    let (x, y) = BoundingBox::new(nums[0], nums[1], nums[2], nums[3]).center();
    Some(Point { x, y })
}

fn end_point_from(value: &Value) -> Option<Point> {
    let nested = &value["end_coordinates"];
    let x = value["end_x"].as_f64().or_else(|| nested["x"].as_f64());
    let y = value["end_y"].as_f64().or_else(|| nested["y"].as_f64());
    match (x, y) {
        (Some(x), Some(y)) => Some(Point { x, y }),
        _ => None,
    }
}

fn require_point(value: &Value, kind: &str, target: &str) -> DeskPilotResult<Point> {
    point_from(value, "coordinates").ok_or_else(|| {
        DeskPilotError::Action(format!(
            "model gave no coordinates for {kind} on '{target}'"
        ))
    })
}

fn text_field(value: &Value) -> Option<String> {
    for key in ["value", "text", "url", "app_name"] {
        if let Some(s) = value[key].as_str() {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

fn duration_ms(value: &Value) -> u64 {
    let secs = value["duration"].as_f64().unwrap_or(0.5);
    (secs.max(0.0) * 1000.0) as u64
}

/// Decodes one plan object into an [`ActionIntent`], still in normalized
/// coordinate space.
pub fn decode_intent(value: &Value) -> DeskPilotResult<ActionIntent> {
    let kind = value["action"]
        .as_str()
        .map(str::to_uppercase)
        .unwrap_or_default();
    let target = value["target"].as_str().unwrap_or("").to_string();

    let payload = match kind.as_str() {
        "CLICK" => ActionPayload::Click { at: require_point(value, &kind, &target)? },
        "DOUBLE_CLICK" => ActionPayload::DoubleClick { at: require_point(value, &kind, &target)? },
        "RIGHT_CLICK" => ActionPayload::RightClick { at: require_point(value, &kind, &target)? },
        "TRIPLE_CLICK" => ActionPayload::TripleClick { at: require_point(value, &kind, &target)? },
        "MOVE" => ActionPayload::Move { at: require_point(value, &kind, &target)? },
        "DRAG" => {
            let from = require_point(value, &kind, &target)?;
            let to = end_point_from(value).ok_or_else(|| {
                DeskPilotError::Action(format!("model gave no end coordinates for DRAG on '{target}'"))
            })?;
            ActionPayload::Drag { from, to, duration_ms: duration_ms(value) }
        }
        "SCROLL" => {
            let amount = value["scroll"]
                .as_i64()
                .or_else(|| value["scroll_amount"].as_i64())
                .unwrap_or(-3);
            ActionPayload::Scroll { amount, at: point_from(value, "coordinates") }
        }
        "TYPE" => {
            let text = text_field(value).ok_or_else(|| {
                DeskPilotError::Action(format!("model gave no text for TYPE on '{target}'"))
            })?;
            ActionPayload::Type { text, focus_at: point_from(value, "coordinates") }
        }
        "PRESS" => {
            let key = value["key"].as_str().unwrap_or_default().to_string();
            if key.is_empty() {
                return Err(DeskPilotError::Action("model gave no key for PRESS".into()));
            }
            ActionPayload::Press { key }
        }
        "HOTKEY" => {
            let keys: Vec<String> = value["keys"]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|k| k.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            if keys.is_empty() {
                return Err(DeskPilotError::Action("model gave no keys for HOTKEY".into()));
            }
            ActionPayload::Hotkey { keys }
        }
        "COPY" => ActionPayload::Copy,
        "PASTE" => ActionPayload::Paste,
        "CUT" => ActionPayload::Cut,
        "SELECT_ALL" => ActionPayload::SelectAll,
        "FOCUS_WINDOW" => {
            let title = if !target.is_empty() {
                target.clone()
            } else {
                text_field(value).unwrap_or_default()
            };
            if title.is_empty() {
                return Err(DeskPilotError::Action(
                    "model gave no window title for FOCUS_WINDOW".into(),
                ));
            }
            ActionPayload::FocusWindow { title }
        }
        "MINIMIZE" => ActionPayload::Minimize,
        "MAXIMIZE" => ActionPayload::Maximize,
        "CLOSE_WINDOW" => ActionPayload::CloseWindow,
        "LAUNCH_APP" => {
            let name = text_field(value).or_else(|| {
                (!target.is_empty()).then(|| target.clone())
            });
            let name = name.ok_or_else(|| {
                DeskPilotError::Action("model gave no app name for LAUNCH_APP".into())
            })?;
            ActionPayload::LaunchApp { name }
        }
        "OPEN_URL" => {
            let url = text_field(value).ok_or_else(|| {
                DeskPilotError::Action("model gave no URL for OPEN_URL".into())
            })?;
            ActionPayload::OpenUrl { url }
        }
        "WAIT" => ActionPayload::Wait { duration_ms: duration_ms(value) },
        other => {
            return Err(DeskPilotError::Action(format!("unknown action kind: '{other}'")));
        }
    };

    Ok(ActionIntent {
        payload,
        target,
        confidence: value["confidence"].as_f64().unwrap_or(1.0),
        thought: value["thought"].as_str().unwrap_or("").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn click_decodes_with_nested_coordinates() {
        let intent = decode_intent(&json!({
            "action": "CLICK",
            "target": "OK button",
            "coordinates": {"x": 500, "y": 300},
            "confidence": 0.95,
            "thought": "press ok"
        }))
        .unwrap();
        assert_eq!(intent.kind_name(), "CLICK");
        assert_eq!(intent.target, "OK button");
        assert_eq!(intent.primary_point(), Some(Point { x: 500.0, y: 300.0 }));
        assert!((intent.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn click_accepts_top_level_coordinates() {
        let intent = decode_intent(&json!({"action": "click", "x": 10, "y": 20})).unwrap();
        assert_eq!(intent.primary_point(), Some(Point { x: 10.0, y: 20.0 }));
    }

    #[test]
    fn click_resolves_a_region_to_its_center() {
        let intent = decode_intent(&json!({
            "action": "CLICK",
            "target": "OK button",
            "bbox_2d": [400, 200, 600, 400]
        }))
        .unwrap();
        assert_eq!(intent.primary_point(), Some(Point { x: 500.0, y: 300.0 }));
    }

    #[test]
    fn pointer_kind_without_coordinates_is_a_hard_error() {
        let err = decode_intent(&json!({"action": "CLICK", "target": "X"})).unwrap_err();
        assert!(matches!(err, DeskPilotError::Action(_)));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = decode_intent(&json!({"action": "TELEPORT"})).unwrap_err();
        assert!(err.to_string().contains("unknown action kind"));
    }

    #[test]
    fn drag_reads_both_endpoints_and_duration() {
        let intent = decode_intent(&json!({
            "action": "DRAG",
            "coordinates": {"x": 100, "y": 100},
            "end_x": 200, "end_y": 250,
            "duration": 1.5
        }))
        .unwrap();
        match intent.payload {
            ActionPayload::Drag { from, to, duration_ms } => {
                assert_eq!(from, Point { x: 100.0, y: 100.0 });
                assert_eq!(to, Point { x: 200.0, y: 250.0 });
                assert_eq!(duration_ms, 1500);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn defaults_apply_for_optional_fields() {
        let intent = decode_intent(&json!({
            "action": "WAIT"
        }))
        .unwrap();
        assert_eq!(intent.payload, ActionPayload::Wait { duration_ms: 500 });
        assert!((intent.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn type_pulls_text_from_value_aliases() {
        let intent = decode_intent(&json!({
            "action": "TYPE", "value": "hello", "coordinates": {"x": 1, "y": 2}
        }))
        .unwrap();
        match intent.payload {
            ActionPayload::Type { text, focus_at } => {
                assert_eq!(text, "hello");
                assert_eq!(focus_at, Some(Point { x: 1.0, y: 2.0 }));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn resolve_scales_and_offsets_all_points() {
        let mut intent = decode_intent(&json!({
            "action": "DRAG",
            "coordinates": {"x": 500, "y": 500},
            "end_x": 1000, "end_y": 0
        }))
        .unwrap();
        intent.resolve_coordinates(1920, 1080, CalibrationOffset { dx: 2, dy: -2 });
        match intent.payload {
            ActionPayload::Drag { from, to, .. } => {
                assert_eq!(from.rounded(), (962, 538));
                assert_eq!(to.rounded(), (1922, -2));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }
}
