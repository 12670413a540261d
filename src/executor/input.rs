//! Physical input injection.
//!
//! [`InputDriver`] is the seam between the action executor and the OS: the
//! production implementation wraps enigo, tests substitute a recorder.
//! All coordinates reaching a driver are validated pixels.

use std::time::Duration;

use enigo::{Axis, Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

use crate::errors::{DeskPilotError, DeskPilotResult};

pub trait InputDriver: Send {
    fn pointer_location(&mut self) -> DeskPilotResult<(i32, i32)>;
    fn click(&mut self, x: i32, y: i32) -> DeskPilotResult<()>;
    fn double_click(&mut self, x: i32, y: i32) -> DeskPilotResult<()>;
    fn right_click(&mut self, x: i32, y: i32) -> DeskPilotResult<()>;
    fn triple_click(&mut self, x: i32, y: i32) -> DeskPilotResult<()>;
    fn move_to(&mut self, x: i32, y: i32) -> DeskPilotResult<()>;
    fn drag(&mut self, from: (i32, i32), to: (i32, i32), duration: Duration) -> DeskPilotResult<()>;
    /// Positive scrolls up, negative scrolls down, matching the wire schema.
    fn scroll(&mut self, amount: i64, at: Option<(i32, i32)>) -> DeskPilotResult<()>;
    fn type_text(&mut self, text: &str) -> DeskPilotResult<()>;
    fn press_key(&mut self, key: &str) -> DeskPilotResult<()>;
    fn hotkey(&mut self, keys: &[String]) -> DeskPilotResult<()>;
}

pub struct EnigoDriver {
    enigo: Enigo,
}

impl EnigoDriver {
    pub fn new() -> DeskPilotResult<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| DeskPilotError::Input(format!("input backend init: {e}")))?;
        Ok(Self { enigo })
    }

    fn multi_click(&mut self, x: i32, y: i32, count: u32) -> DeskPilotResult<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(input_err)?;
        for _ in 0..count {
            self.enigo
                .button(Button::Left, Direction::Click)
                .map_err(input_err)?;
        }
        Ok(())
    }
}

fn input_err(e: impl std::fmt::Display) -> DeskPilotError {
    DeskPilotError::Input(e.to_string())
}

/// Maps a model-facing key name to an enigo key. Single characters type as
/// unicode; unknown multi-character names are rejected.
pub fn parse_key(name: &str) -> DeskPilotResult<Key> {
    let lower = name.to_lowercase();
    let key = match lower.as_str() {
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        "space" => Key::Space,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" | "page_up" => Key::PageUp,
        "pagedown" | "page_down" => Key::PageDown,
        "win" | "meta" | "cmd" | "super" => Key::Meta,
        "ctrl" | "control" => Key::Control,
        "alt" => Key::Alt,
        "shift" => Key::Shift,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        _ => {
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => return Err(DeskPilotError::Input(format!("unknown key name: '{name}'"))),
            }
        }
    };
    Ok(key)
}

impl InputDriver for EnigoDriver {
    fn pointer_location(&mut self) -> DeskPilotResult<(i32, i32)> {
        self.enigo.location().map_err(input_err)
    }

    fn click(&mut self, x: i32, y: i32) -> DeskPilotResult<()> {
        self.multi_click(x, y, 1)
    }

    fn double_click(&mut self, x: i32, y: i32) -> DeskPilotResult<()> {
        self.multi_click(x, y, 2)
    }

    fn right_click(&mut self, x: i32, y: i32) -> DeskPilotResult<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(input_err)?;
        self.enigo
            .button(Button::Right, Direction::Click)
            .map_err(input_err)
    }

    fn triple_click(&mut self, x: i32, y: i32) -> DeskPilotResult<()> {
        self.multi_click(x, y, 3)
    }

    fn move_to(&mut self, x: i32, y: i32) -> DeskPilotResult<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(input_err)
    }

    fn drag(&mut self, from: (i32, i32), to: (i32, i32), duration: Duration) -> DeskPilotResult<()> {
        const STEPS: i32 = 12;
        self.enigo
            .move_mouse(from.0, from.1, Coordinate::Abs)
            .map_err(input_err)?;
        self.enigo
            .button(Button::Left, Direction::Press)
            .map_err(input_err)?;
        let step_sleep = duration / STEPS as u32;
        for i in 1..=STEPS {
            let x = from.0 + (to.0 - from.0) * i / STEPS;
            let y = from.1 + (to.1 - from.1) * i / STEPS;
            self.enigo
                .move_mouse(x, y, Coordinate::Abs)
                .map_err(input_err)?;
            std::thread::sleep(step_sleep);
        }
        self.enigo
            .button(Button::Left, Direction::Release)
            .map_err(input_err)
    }

    fn scroll(&mut self, amount: i64, at: Option<(i32, i32)>) -> DeskPilotResult<()> {
        if let Some((x, y)) = at {
            self.enigo
                .move_mouse(x, y, Coordinate::Abs)
                .map_err(input_err)?;
        }
        // enigo's vertical axis is positive-down; the schema is positive-up.
        self.enigo
            .scroll(-(amount as i32), Axis::Vertical)
            .map_err(input_err)
    }

    fn type_text(&mut self, text: &str) -> DeskPilotResult<()> {
        self.enigo.text(text).map_err(input_err)
    }

    fn press_key(&mut self, key: &str) -> DeskPilotResult<()> {
        let key = parse_key(key)?;
        self.enigo.key(key, Direction::Click).map_err(input_err)
    }

    fn hotkey(&mut self, keys: &[String]) -> DeskPilotResult<()> {
        let parsed: Vec<Key> = keys
            .iter()
            .map(|k| parse_key(k))
            .collect::<DeskPilotResult<_>>()?;
        let Some((last, modifiers)) = parsed.split_last() else {
            return Ok(());
        };
        for key in modifiers {
            self.enigo.key(*key, Direction::Press).map_err(input_err)?;
        }
        let result = self.enigo.key(*last, Direction::Click).map_err(input_err);
        for key in modifiers.iter().rev() {
            self.enigo
                .key(*key, Direction::Release)
                .map_err(input_err)?;
        }
        result
    }
}
