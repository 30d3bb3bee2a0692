//! Chat TUI built on Ratatui: sidebar panels plus a chat panel.

pub mod app;
pub mod events;
pub mod handler;
pub mod ui;

pub use handler::run_chat_ui;
