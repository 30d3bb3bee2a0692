//! TUI application state.

use std::collections::VecDeque;

use crate::session::SessionLog;

/// Which widget receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The chat input box.
    Input,
    /// The sidebar credential field.
    ApiKey,
}

#[derive(Debug)]
pub struct App {
    /// The conversation log; replayed in full on every draw.
    pub log: SessionLog,
    /// Chat input buffer.
    pub input: String,
    /// Sidebar credential entry buffer.
    pub api_key_input: String,
    pub focus: Focus,
    /// Sidebar panel collapse state.
    pub show_dictionary: bool,
    pub show_sample: bool,
    pub show_help: bool,
    /// 0 means pinned to the bottom.
    pub chat_scroll_offset: usize,
    /// A turn is in flight; questions typed meanwhile are queued.
    pub is_waiting: bool,
    pub queue: VecDeque<String>,
    pub status_message: String,
    pub model: String,
    pub dictionary_text: String,
    pub sample_text: String,
    /// Whether the client currently holds a credential.
    pub key_present: bool,
}

impl App {
    pub fn new(
        model: String,
        dictionary_text: String,
        sample_text: String,
        key_present: bool,
    ) -> Self {
        Self {
            log: SessionLog::new(),
            input: String::new(),
            api_key_input: String::new(),
            focus: Focus::Input,
            show_dictionary: true,
            show_sample: true,
            show_help: false,
            chat_scroll_offset: 0,
            is_waiting: false,
            queue: VecDeque::new(),
            status_message: "Ask a question | Tab: key field, F2/F3: panels, F1: help".into(),
            model,
            dictionary_text,
            sample_text,
            key_present,
        }
    }

    pub fn push_user(&mut self, question: String) {
        self.log.push_user(question);
        self.scroll_to_bottom();
    }

    pub fn push_assistant(&mut self, content: String, code: Option<String>) {
        self.log.push_assistant(content, code);
        self.scroll_to_bottom();
    }

    /// Queue the question if a turn is already running. Returns true when
    /// the caller should not process it now.
    pub fn try_queue(&mut self, question: String) -> bool {
        if self.is_waiting {
            self.queue.push_back(question);
            self.status_message = format!("{} question(s) queued", self.queue.len());
            true
        } else {
            false
        }
    }

    pub fn dequeue(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll_offset = self.chat_scroll_offset.saturating_add(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll_offset = self.chat_scroll_offset.saturating_sub(1);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll_offset = 0;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn focused_buffer_mut(&mut self) -> &mut String {
        match self.focus {
            Focus::Input => &mut self.input,
            Focus::ApiKey => &mut self.api_key_input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new("gpt-4o".into(), String::new(), String::new(), false)
    }

    #[test]
    fn questions_queue_while_a_turn_is_running() {
        let mut a = app();
        assert!(!a.try_queue("first".into()));
        a.is_waiting = true;
        assert!(a.try_queue("second".into()));
        assert_eq!(a.dequeue().as_deref(), Some("second"));
        assert_eq!(a.dequeue(), None);
    }

    #[test]
    fn pushing_a_turn_pins_scroll_to_bottom() {
        let mut a = app();
        a.chat_scroll_offset = 7;
        a.push_user("hi".into());
        assert_eq!(a.chat_scroll_offset, 0);
        assert_eq!(a.log.len(), 1);
    }
}
