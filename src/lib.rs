pub mod cli;
pub mod config;
pub mod exec;
pub mod handlers;
pub mod llm;
pub mod prompt;
pub mod render;
pub mod reply;
pub mod session;
pub mod table;
pub mod tui;
