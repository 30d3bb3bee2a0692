//! Layout and rendering: sidebar (credential, dictionary, sample rows),
//! chat scrollback, input box, status bar.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::app::{App, Focus};
use crate::session::TurnRole;

pub fn render_ui(frame: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(40)])
        .split(frame.area());

    render_sidebar(frame, app, columns[0]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Chat area
            Constraint::Length(3), // Input area
            Constraint::Length(1), // Status bar
        ])
        .split(columns[1]);

    render_chat_area(frame, app, main[0]);
    render_input_area(frame, app, main[1]);
    render_status_bar(frame, app, main[2]);

    if app.show_help {
        render_help_overlay(frame);
    }
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let dict_constraint = if app.show_dictionary {
        Constraint::Percentage(45)
    } else {
        Constraint::Length(3)
    };
    let sample_constraint = if app.show_sample {
        Constraint::Min(3)
    } else {
        Constraint::Length(3)
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), dict_constraint, sample_constraint])
        .split(area);

    // Credential entry. The stored key is never echoed back.
    let key_text = if app.focus == Focus::ApiKey {
        "*".repeat(app.api_key_input.chars().count())
    } else if app.key_present {
        "(key set)".to_string()
    } else {
        "(no key - type here after Tab)".to_string()
    };
    let key_style = if app.focus == Focus::ApiKey {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let key_paragraph = Paragraph::new(key_text).style(key_style).block(
        Block::default()
            .borders(Borders::ALL)
            .title("API Key [Tab]"),
    );
    frame.render_widget(key_paragraph, rows[0]);

    let dict_body = if app.show_dictionary {
        app.dictionary_text.as_str()
    } else {
        "(collapsed)"
    };
    let dict_paragraph = Paragraph::new(dict_body)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Data Dictionary [F2]"),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(dict_paragraph, rows[1]);

    let sample_body = if app.show_sample {
        app.sample_text.as_str()
    } else {
        "(collapsed)"
    };
    let sample_paragraph = Paragraph::new(sample_body)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Sample Rows [F3]"),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(sample_paragraph, rows[2]);
}

fn render_chat_area(frame: &mut Frame, app: &App, area: Rect) {
    let mut content_lines = Vec::new();

    for turn in app.log.turns() {
        let (prefix, style) = match turn.role {
            TurnRole::User => (">>> ", Style::default().fg(Color::Green)),
            TurnRole::Assistant => ("", Style::default().fg(Color::Cyan)),
        };
        let content = format!("{}{}", prefix, turn.content);
        for line in content.lines() {
            content_lines.push(Line::from(vec![Span::styled(line.to_string(), style)]));
        }
        if !content.is_empty() {
            content_lines.push(Line::from(""));
        }
    }

    if app.is_waiting {
        content_lines.push(Line::from(Span::styled(
            "thinking...",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let title = format!("Chat | Model: {}", app.model);

    let available_height = area.height.saturating_sub(2) as usize;
    let total_lines = content_lines.len();

    let mut paragraph = Paragraph::new(Text::from(content_lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });

    if total_lines > available_height {
        let scroll_y = if app.chat_scroll_offset == 0 {
            total_lines.saturating_sub(available_height) as u16
        } else {
            let max_scroll = total_lines.saturating_sub(available_height);
            let actual_offset = app.chat_scroll_offset.min(max_scroll);
            (total_lines
                .saturating_sub(available_height)
                .saturating_sub(actual_offset)) as u16
        };
        paragraph = paragraph.scroll((scroll_y, 0));
    }

    frame.render_widget(paragraph, area);
}

fn render_input_area(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.focus {
        Focus::Input => "Your question (Enter to send)",
        Focus::ApiKey => "Your question (Tab to focus)",
    };
    let style = if app.focus == Focus::Input {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let input_paragraph = Paragraph::new(app.input.clone())
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });

    frame.render_widget(input_paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_paragraph = Paragraph::new(app.status_message.clone())
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(status_paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let popup_area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, popup_area);

    let help_lines = vec![
        Line::from("datachat Help"),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  ↑/↓        - Scroll chat history"),
        Line::from("  Tab        - Switch between question and API key"),
        Line::from("  F1         - Toggle this help"),
        Line::from("  F2         - Collapse/expand data dictionary"),
        Line::from("  F3         - Collapse/expand sample rows"),
        Line::from("  Ctrl+C     - Quit"),
        Line::from(""),
        Line::from("Input:"),
        Line::from("  Enter      - Send question (or store API key)"),
        Line::from("  exit()     - Quit"),
    ];

    let help_paragraph = Paragraph::new(Text::from(help_lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .title_style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(help_paragraph, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
