//! End-to-end turn behaviour that needs no network: fault containment,
//! credential short-circuiting, and replay stability.

use datachat::handlers::turn::{run_turn, TurnError, TurnReport};
use datachat::llm::{ChatOptions, LlmClient};
use datachat::session::SessionLog;
use datachat::table::{Cell, DataType, Dataset, DictionaryEntry, Series, Table};

fn age_dataset() -> Dataset {
    let table = Table::new(vec![Series::new("age", vec![Cell::Int(10), Cell::Int(40)])]).unwrap();
    let dictionary = vec![DictionaryEntry {
        column: "age".into(),
        data_type: DataType::Integer,
        description: "age in years".into(),
    }];
    Dataset { table, dictionary }
}

fn opts() -> ChatOptions {
    ChatOptions {
        model: "gpt-4o".into(),
        temperature: 0.0,
        top_p: 1.0,
        max_tokens: None,
    }
}

#[tokio::test]
async fn missing_credential_blocks_the_turn_without_a_model_reply() {
    let dataset = age_dataset();
    let client = LlmClient::new("https://api.openai.com/v1", None).unwrap();

    let mut log = SessionLog::new();
    log.push_user("how many rows?");

    let report = run_turn(&client, &dataset, "how many rows?", &opts(), 5).await;

    assert!(matches!(report.error, Some(TurnError::Config(_))));
    // Nothing model-derived exists: no explanation, no code, no result.
    assert!(report.lead.is_empty());
    assert!(report.code.is_none());
    assert!(report.rendered.is_none());

    log.push_assistant(report.assistant_content(), report.code.clone());
    assert_eq!(log.len(), 2);
    assert!(log.turns()[1].content.contains("no API key"));
}

#[test]
fn execution_fault_leaves_prior_turns_untouched() {
    let dataset = age_dataset();

    let mut log = SessionLog::new();
    log.push_user("mean age?");
    log.push_assistant("85", Some("ANSWER = table['age'].mean()".into()));
    let before = log.turns().to_vec();

    log.push_user("mean height?");
    let report = TurnReport::from_reply(
        "```query\nANSWER = table['height'].mean()\n```",
        &dataset.table,
    );
    assert!(matches!(report.error, Some(TurnError::Execution(_))));

    // Prior log is intact; the new question is the only addition so far.
    assert_eq!(&log.turns()[..2], &before[..]);
    assert_eq!(log.len(), 3);
    assert_eq!(log.turns()[2].content, "mean height?");

    log.push_assistant(report.assistant_content(), report.code.clone());
    assert!(log.turns()[3].content.contains("unknown column 'height'"));
}

#[test]
fn successful_turn_renders_the_filtered_row() {
    let dataset = age_dataset();
    let report = TurnReport::from_reply(
        "Rows over 30:\n```query\nANSWER = table[table['age'] > 30]\n```\nThat is all.",
        &dataset.table,
    );
    assert!(report.error.is_none());
    let rendered = report.rendered.expect("should render a table");
    assert!(rendered.contains("40"));
    assert!(!rendered.contains("10"));
    assert_eq!(report.trail, "That is all.");
}

#[test]
fn replaying_a_session_twice_is_identical() {
    let dataset = age_dataset();
    let mut log = SessionLog::new();

    for (question, reply) in [
        ("count?", "```query\nANSWER = table.count()\n```"),
        ("no code here", "Just prose."),
    ] {
        log.push_user(question);
        let report = TurnReport::from_reply(reply, &dataset.table);
        log.push_assistant(report.assistant_content(), report.code.clone());
    }

    let first = log.replay();
    let second = log.replay();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
    assert_eq!(first[0], ">>> count?");
}
