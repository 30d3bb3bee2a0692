//! One question end to end: prompt → model → fence split → interpret →
//! render. Faults are values, contained to the turn that raised them.

use thiserror::Error;

use crate::exec::{run_fragment, ExecError};
use crate::llm::{ChatMessage, ChatOptions, LlmClient, LlmError, Role};
use crate::prompt::{build_prompt, system_role_text};
use crate::render::render_value;
use crate::reply::{split_reply, Reply};
use crate::table::{Dataset, Table};

/// Per-turn fault taxonomy. Config faults block only the current turn and
/// never crash the session.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("{0}")]
    Config(String),
    #[error("model call failed: {0}")]
    Upstream(String),
    #[error("query failed: {0}")]
    Execution(#[from] ExecError),
}

impl From<LlmError> for TurnError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingApiKey => TurnError::Config(LlmError::MissingApiKey.to_string()),
            LlmError::Upstream(m) => TurnError::Upstream(m),
        }
    }
}

/// Everything the UI needs to show for one turn.
#[derive(Debug)]
pub struct TurnReport {
    pub lead: String,
    pub code: Option<String>,
    pub trail: String,
    /// Rendered result value, when execution produced one.
    pub rendered: Option<String>,
    /// The model's code block had no closing fence.
    pub unterminated: bool,
    pub error: Option<TurnError>,
}

impl TurnReport {
    pub fn from_error(error: TurnError) -> Self {
        Self {
            lead: String::new(),
            code: None,
            trail: String::new(),
            rendered: None,
            unterminated: false,
            error: Some(error),
        }
    }

    /// Resolve a raw model reply against the table: split out the program,
    /// run it, render the result. No network involved, so this half of the
    /// pipeline is directly testable.
    pub fn from_reply(text: &str, table: &Table) -> Self {
        let (lead, code, trail, unterminated) = match split_reply(text) {
            Reply::Plain(lead) => (lead, None, String::new(), false),
            Reply::Program { lead, code, trail } => (lead, Some(code), trail, false),
            Reply::Unterminated { lead, code } => (lead, Some(code), String::new(), true),
        };
        let (rendered, error) = match code.as_deref() {
            // No fence found: the reply is plain prose, not an error.
            None => (None, None),
            Some(code) => match run_fragment(code, table) {
                Ok(value) => (Some(render_value(&value)), None),
                Err(e) => (None, Some(TurnError::from(e))),
            },
        };
        Self { lead, code, trail, rendered, unterminated, error }
    }

    /// The text appended to the session log as the assistant turn.
    pub fn assistant_content(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !self.lead.is_empty() {
            parts.push(self.lead.clone());
        }
        if self.unterminated {
            parts.push("(the code block was never closed; ran it as-is)".into());
        }
        if let Some(rendered) = &self.rendered {
            parts.push(rendered.trim_end().to_string());
        }
        if let Some(error) = &self.error {
            parts.push(format!("error: {}", error));
        }
        if !self.trail.is_empty() {
            parts.push(self.trail.clone());
        }
        if parts.is_empty() {
            parts.push("(empty reply)".into());
        }
        parts.join("\n\n")
    }
}

/// Run one full turn. The credential check happens inside `complete`,
/// before any request leaves the process.
pub async fn run_turn(
    client: &LlmClient,
    dataset: &Dataset,
    question: &str,
    opts: &ChatOptions,
    sample_rows: usize,
) -> TurnReport {
    let prompt = build_prompt(question, &dataset.dictionary, &dataset.sample_text(sample_rows));
    let messages = vec![
        ChatMessage::new(Role::System, system_role_text()),
        ChatMessage::new(Role::User, prompt),
    ];
    match client.complete(&messages, opts).await {
        Ok(text) => TurnReport::from_reply(&text, &dataset.table),
        Err(e) => TurnReport::from_error(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, Series};

    fn ages() -> Table {
        Table::new(vec![Series::new("age", vec![Cell::Int(10), Cell::Int(40)])]).unwrap()
    }

    #[test]
    fn prose_reply_executes_nothing() {
        let report = TurnReport::from_reply("There are two rows.", &ages());
        assert!(report.code.is_none());
        assert!(report.error.is_none());
        assert_eq!(report.assistant_content(), "There are two rows.");
    }

    #[test]
    fn good_program_renders_its_answer() {
        let text = "Adults only.\n```query\nANSWER = table[table['age'] > 30]\n```";
        let report = TurnReport::from_reply(text, &ages());
        assert_eq!(report.code.as_deref(), Some("ANSWER = table[table['age'] > 30]"));
        let rendered = report.rendered.expect("result should render");
        assert!(rendered.contains("40"));
        assert!(!rendered.contains("10"));
    }

    #[test]
    fn failing_program_becomes_an_inline_execution_error() {
        let text = "```query\nANSWER = table['height'].mean()\n```";
        let report = TurnReport::from_reply(text, &ages());
        assert!(matches!(report.error, Some(TurnError::Execution(_))));
        assert!(report.assistant_content().contains("unknown column 'height'"));
    }

    #[test]
    fn unterminated_block_is_surfaced_to_the_user() {
        let text = "```query\nANSWER = 1";
        let report = TurnReport::from_reply(text, &ages());
        assert!(report.unterminated);
        assert!(report.assistant_content().contains("never closed"));
        assert_eq!(report.rendered.as_deref(), Some("1\n"));
    }

    #[test]
    fn llm_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            TurnError::from(LlmError::MissingApiKey),
            TurnError::Config(_)
        ));
        assert!(matches!(
            TurnError::from(LlmError::Upstream("503".into())),
            TurnError::Upstream(_)
        ));
    }
}
