//! Async event loop for the chat TUI.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use is_terminal::IsTerminal;
use ratatui::prelude::*;
use tokio::sync::mpsc;

use super::{
    app::{App, Focus},
    events::TuiEvent,
    ui::render_ui,
};
use crate::handlers::turn::run_turn;
use crate::llm::{ChatOptions, LlmClient};
use crate::table::Dataset;

/// Run the chat TUI until the user quits.
pub async fn run_chat_ui(
    dataset: Arc<Dataset>,
    client: LlmClient,
    opts: ChatOptions,
    sample_rows: usize,
) -> Result<()> {
    if !io::stdout().is_terminal() {
        return Err(anyhow::anyhow!("chat mode requires a proper terminal environment"));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(
        opts.model.clone(),
        dataset.dictionary_text(),
        dataset.sample_text(sample_rows),
        client.has_api_key(),
    );

    let (event_tx, event_rx) = mpsc::unbounded_channel::<TuiEvent>();

    let result = run_app(
        &mut terminal,
        &mut app,
        dataset,
        client,
        opts,
        sample_rows,
        event_tx,
        event_rx,
    )
    .await;

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

#[allow(clippy::too_many_arguments)]
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    dataset: Arc<Dataset>,
    mut client: LlmClient,
    opts: ChatOptions,
    sample_rows: usize,
    event_tx: mpsc::UnboundedSender<TuiEvent>,
    mut event_rx: mpsc::UnboundedReceiver<TuiEvent>,
) -> Result<()> {
    // Keyboard polling runs on a blocking task; crossterm's poll is not async.
    let input_tx = event_tx.clone();
    tokio::task::spawn_blocking(move || loop {
        if event::poll(Duration::from_millis(100)).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if input_tx.send(TuiEvent::Key(key)).is_err() {
                    break;
                }
            }
        }
    });

    loop {
        terminal.draw(|frame| render_ui(frame, app))?;

        if let Ok(tui_event) = event_rx.try_recv() {
            match tui_event {
                TuiEvent::Key(key) => {
                    if handle_key_event(app, &mut client, key, event_tx.clone())? {
                        break;
                    }
                }
                TuiEvent::Question(question) => {
                    if !app.try_queue(question.clone()) {
                        start_turn(
                            app,
                            question,
                            &dataset,
                            &client,
                            &opts,
                            sample_rows,
                            event_tx.clone(),
                        );
                    }
                }
                TuiEvent::TurnFinished(report) => {
                    app.is_waiting = false;
                    app.status_message = match &report.error {
                        Some(e) => format!("turn failed: {}", e),
                        None => "Ask a question | Tab: key field, F2/F3: panels, F1: help".into(),
                    };
                    app.push_assistant(report.assistant_content(), report.code.clone());
                    let _ = event_tx.send(TuiEvent::ProcessNextQuestion);
                }
                TuiEvent::ProcessNextQuestion => {
                    if let Some(next) = app.dequeue() {
                        let _ = event_tx.send(TuiEvent::Question(next));
                    }
                }
            }
        }

        // Small delay to prevent busy waiting.
        tokio::time::sleep(Duration::from_millis(16)).await;
    }

    Ok(())
}

/// Append the user turn and run the pipeline on a background task. The
/// turn itself cannot be cancelled; further input queues behind it.
fn start_turn(
    app: &mut App,
    question: String,
    dataset: &Arc<Dataset>,
    client: &LlmClient,
    opts: &ChatOptions,
    sample_rows: usize,
    event_tx: mpsc::UnboundedSender<TuiEvent>,
) {
    app.push_user(question.clone());
    app.is_waiting = true;
    app.status_message = "thinking...".into();

    let dataset = Arc::clone(dataset);
    let client = client.clone();
    let opts = opts.clone();
    tokio::spawn(async move {
        let report = run_turn(&client, &dataset, &question, &opts, sample_rows).await;
        let _ = event_tx.send(TuiEvent::TurnFinished(Box::new(report)));
    });
}

/// Handle one key event. Returns true when the app should quit.
fn handle_key_event(
    app: &mut App,
    client: &mut LlmClient,
    key: crossterm::event::KeyEvent,
    event_tx: mpsc::UnboundedSender<TuiEvent>,
) -> Result<bool> {
    if app.show_help {
        app.show_help = false;
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Ok(true);
        }
        KeyCode::F(1) => app.toggle_help(),
        KeyCode::F(2) => app.show_dictionary = !app.show_dictionary,
        KeyCode::F(3) => app.show_sample = !app.show_sample,
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Input => Focus::ApiKey,
                Focus::ApiKey => Focus::Input,
            };
        }
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::Enter => match app.focus {
            Focus::ApiKey => {
                let entered = std::mem::take(&mut app.api_key_input);
                client.set_api_key(entered);
                app.key_present = client.has_api_key();
                app.status_message = if app.key_present {
                    "API key stored for this session".into()
                } else {
                    "API key cleared".into()
                };
                app.focus = Focus::Input;
            }
            Focus::Input => {
                let input = std::mem::take(&mut app.input);
                let input = input.trim().to_string();
                if input == "exit()" {
                    return Ok(true);
                }
                if !input.is_empty() {
                    let _ = event_tx.send(TuiEvent::Question(input));
                }
            }
        },
        KeyCode::Backspace => {
            app.focused_buffer_mut().pop();
        }
        KeyCode::Char(c) => {
            app.focused_buffer_mut().push(c);
        }
        _ => {}
    }

    Ok(false)
}
