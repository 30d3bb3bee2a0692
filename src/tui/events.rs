//! Custom event types for the chat TUI.

use crossterm::event::KeyEvent;

use crate::handlers::turn::TurnReport;

#[derive(Debug)]
pub enum TuiEvent {
    /// User keyboard input.
    Key(KeyEvent),
    /// A question ready to run through the turn pipeline.
    Question(String),
    /// Turn pipeline finished for the in-flight question.
    TurnFinished(Box<TurnReport>),
    /// Pull the next queued question, if any.
    ProcessNextQuestion,
}
