//! Bounded recent-action history.
//!
//! Feeds two consumers: the compact action trace embedded in each planning
//! prompt, and semantic loop detection (same kind + target repeating across
//! consecutive entries).

use std::collections::VecDeque;

use serde::Serialize;

/// Upper bound on retained records.
pub const HISTORY_CAP: usize = 10;

/// How many records the planning prompt includes.
pub const PROMPT_TRACE_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Executed,
    Failed,
    Skipped,
}

impl std::fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionOutcome::Executed => write!(f, "executed"),
            ActionOutcome::Failed => write!(f, "failed"),
            ActionOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Post-execution summary of one action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub kind: String,
    pub target: String,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub outcome: ActionOutcome,
}

impl ActionRecord {
    pub fn to_history_line(&self) -> String {
        let coords = match (self.x, self.y) {
            (Some(x), Some(y)) => format!(" at ({x}, {y})"),
            _ => String::new(),
        };
        format!("{}: {}{} -> {}", self.kind, self.target, coords, self.outcome)
    }
}

#[derive(Debug, Default)]
pub struct RecentActions {
    entries: VecDeque<ActionRecord>,
}

impl RecentActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ActionRecord) {
        if self.entries.len() >= HISTORY_CAP {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ActionRecord> {
        self.entries.back()
    }

    /// The last few records formatted for the planning prompt, oldest first.
    pub fn prompt_trace(&self) -> String {
        self.entries
            .iter()
            .rev()
            .take(PROMPT_TRACE_LEN)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(|r| format!("- {}", r.to_history_line()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Length of the trailing run of entries matching `kind` + `target`,
    /// including the candidate about to be executed.
    pub fn repeat_run_len(&self, kind: &str, target: &str) -> u32 {
        let mut count = 1;
        for record in self.entries.iter().rev() {
            if record.kind == kind && record.target == target {
                count += 1;
            } else {
                break;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, target: &str) -> ActionRecord {
        ActionRecord {
            kind: kind.into(),
            target: target.into(),
            x: Some(10),
            y: Some(20),
            outcome: ActionOutcome::Executed,
        }
    }

    #[test]
    fn ring_never_exceeds_cap() {
        let mut history = RecentActions::new();
        for i in 0..25 {
            history.push(record("CLICK", &format!("button {i}")));
        }
        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history.last().unwrap().target, "button 24");
    }

    #[test]
    fn trace_holds_last_five_oldest_first() {
        let mut history = RecentActions::new();
        for i in 0..8 {
            history.push(record("CLICK", &format!("b{i}")));
        }
        let trace = history.prompt_trace();
        let lines: Vec<&str> = trace.lines().collect();
        assert_eq!(lines.len(), PROMPT_TRACE_LEN);
        assert!(lines[0].contains("b3"));
        assert!(lines[4].contains("b7"));
    }

    #[test]
    fn repeat_run_counts_trailing_matches_only() {
        let mut history = RecentActions::new();
        history.push(record("CLICK", "X"));
        history.push(record("TYPE", "field"));
        history.push(record("CLICK", "X"));
        history.push(record("CLICK", "X"));
        assert_eq!(history.repeat_run_len("CLICK", "X"), 3);
        assert_eq!(history.repeat_run_len("TYPE", "field"), 1);
    }

    #[test]
    fn history_line_formats_outcome_and_coords() {
        let line = record("CLICK", "OK").to_history_line();
        assert_eq!(line, "CLICK: OK at (10, 20) -> executed");
        let mut r = record("PRESS", "enter");
        r.x = None;
        r.y = None;
        r.outcome = ActionOutcome::Failed;
        assert_eq!(r.to_history_line(), "PRESS: enter -> failed");
    }
}
