//! One-shot handler: ask a single question, print the turn, exit.

use anyhow::Result;

use crate::llm::{ChatOptions, LlmClient};
use crate::render::{MarkdownPrinter, TextPrinter};
use crate::session::SessionLog;
use crate::table::Dataset;

use super::turn::run_turn;

pub async fn run(
    client: &LlmClient,
    dataset: &Dataset,
    question: &str,
    opts: &ChatOptions,
    sample_rows: usize,
    markdown: bool,
) -> Result<()> {
    let mut log = SessionLog::new();
    log.push_user(question);

    let report = run_turn(client, dataset, question, opts, sample_rows).await;

    let md = MarkdownPrinter::default();
    let plain = TextPrinter { color: None };
    let code_printer = TextPrinter { color: Some("cyan") };
    let error_printer = TextPrinter { color: Some("red") };

    if !report.lead.is_empty() {
        if markdown {
            md.print(&report.lead);
        } else {
            plain.print(&report.lead);
        }
    }
    if report.unterminated {
        error_printer.print("warning: the code block was never closed; ran it as-is");
    }
    if let Some(code) = &report.code {
        code_printer.print(code);
        println!();
    }
    if let Some(rendered) = &report.rendered {
        print!("{}", rendered);
    }
    if let Some(error) = &report.error {
        error_printer.print(&format!("error: {}", error));
    }
    if !report.trail.is_empty() {
        if markdown {
            md.print(&report.trail);
        } else {
            plain.print(&report.trail);
        }
    }

    log.push_assistant(report.assistant_content(), report.code.clone());
    Ok(())
}
