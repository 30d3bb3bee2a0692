//! Chat session state: an ordered, append-only log of turns.
//!
//! The log is the single source of truth for the conversation; the UI
//! replays it in full on every redraw. Turns are never mutated or removed,
//! there is no size cap, and the lifetime is the session's lifetime.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    /// The extracted program for assistant turns that carried one.
    pub code: Option<String>,
}

#[derive(Debug, Default)]
pub struct SessionLog {
    turns: Vec<Turn>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: TurnRole::User,
            content: content.into(),
            code: None,
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, code: Option<String>) {
        self.turns.push(Turn {
            role: TurnRole::Assistant,
            content: content.into(),
            code,
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Replay the log as display lines, one entry per turn, in order.
    /// Pure: replaying twice yields identical sequences.
    pub fn replay(&self) -> Vec<String> {
        self.turns
            .iter()
            .map(|t| {
                let who = match t.role {
                    TurnRole::User => ">>>",
                    TurnRole::Assistant => "",
                };
                if who.is_empty() {
                    t.content.clone()
                } else {
                    format!("{} {}", who, t.content)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_append_in_order() {
        let mut log = SessionLog::new();
        log.push_user("q1");
        log.push_assistant("a1", Some("ANSWER = 1".into()));
        log.push_user("q2");
        assert_eq!(log.len(), 3);
        assert_eq!(log.turns()[0].role, TurnRole::User);
        assert_eq!(log.turns()[1].code.as_deref(), Some("ANSWER = 1"));
        assert_eq!(log.turns()[2].content, "q2");
    }

    #[test]
    fn replay_is_idempotent() {
        let mut log = SessionLog::new();
        log.push_user("what is the max hp?");
        log.push_assistant("160", None);
        let first = log.replay();
        let second = log.replay();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn new_session_starts_empty() {
        assert!(SessionLog::new().is_empty());
    }
}
