use anyhow::Result;
use clap::Parser;

use datachat::cli::Cli;
use datachat::config::Config;
use datachat::llm::{ChatOptions, LlmClient};
use datachat::{handlers, table, tui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let cfg = Config::load();

    // Resolve model: CLI overrides config; fall back to the default.
    let effective_model = args
        .model
        .clone()
        .or_else(|| cfg.get("DEFAULT_MODEL"))
        .unwrap_or_else(|| "gpt-4o".to_string());

    let sample_rows = args
        .sample_rows
        .or_else(|| cfg.get_usize("SAMPLE_ROWS"))
        .unwrap_or(5);

    let markdown = if args.no_md {
        false
    } else if args.md {
        true
    } else {
        cfg.get_bool("PRETTIFY_MARKDOWN")
    };

    // The dataset is loaded once per (dataset, dictionary) pair and cached
    // for the process lifetime.
    let dataset = table::load_cached(&args.dataset, &args.dict)?;

    // Inspection shortcuts.
    if args.show_dict {
        print!("{}", dataset.dictionary_text());
        return Ok(());
    }
    if args.show_sample {
        print!("{}", dataset.sample_text(sample_rows));
        return Ok(());
    }

    let client = LlmClient::from_config(&cfg)?;
    let opts = ChatOptions {
        model: effective_model,
        temperature: args.temperature,
        top_p: args.top_p,
        max_tokens: args.max_tokens,
    };

    match args.ask.as_deref() {
        Some(question) => {
            handlers::ask::run(&client, &dataset, question, &opts, sample_rows, markdown).await
        }
        None => tui::run_chat_ui(dataset, client, opts, sample_rows).await,
    }
}
