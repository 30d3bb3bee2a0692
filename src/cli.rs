use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "datachat", about = "Chat with an LLM about a CSV dataset", version)]
#[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
#[command(group(ArgGroup::new("inspect").args(["show_dict", "show_sample"]).multiple(false)))]
pub struct Cli {
    /// Path to the dataset CSV file.
    #[arg(value_name = "DATASET")]
    pub dataset: PathBuf,

    /// Path to the data dictionary CSV (column_name,data_type,description).
    #[arg(long)]
    pub dict: PathBuf,

    /// Ask a single question and exit instead of opening the chat UI.
    #[arg(long)]
    pub ask: Option<String>,

    /// Large language model to use.
    #[arg(long)]
    pub model: Option<String>,

    /// Randomness of generated output.
    #[arg(long, default_value_t = 0.0, value_parser = clap::value_parser!(f32))]
    pub temperature: f32,

    /// Limits highest probable tokens (words).
    #[arg(long = "top-p", default_value_t = 1.0, value_parser = clap::value_parser!(f32))]
    pub top_p: f32,

    /// Cap on completion tokens.
    #[arg(long = "max-tokens")]
    pub max_tokens: Option<u32>,

    /// Prettify Markdown in one-shot output.
    #[arg(long)]
    pub md: bool,
    /// Disable Markdown prettifying.
    #[arg(long = "no-md")]
    pub no_md: bool,

    /// Number of sample rows shown to the model and in the sidebar.
    #[arg(long = "sample-rows")]
    pub sample_rows: Option<usize>,

    /// Print the data dictionary and exit.
    #[arg(long = "show-dict")]
    pub show_dict: bool,

    /// Print the sample rows and exit.
    #[arg(long = "show-sample")]
    pub show_sample: bool,
}
