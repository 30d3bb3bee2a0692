//! Prompt templates: the fixed instructional text sent with every question.

use crate::table::{render_dictionary, DictionaryEntry};

/// The variable the generated program must assign its final answer to.
pub const ANSWER_VAR: &str = "ANSWER";

/// Fence marker opening a query block in model output.
pub const FENCE_OPEN: &str = "```query";

/// Generic closing fence marker.
pub const FENCE_CLOSE: &str = "```";

/// System role describing the assistant and the query language it may use.
/// The language surface documented here must stay in sync with what the
/// interpreter in `exec` actually accepts.
pub fn system_role_text() -> String {
    format!(
        "You are a data analyst assistant. You answer questions about one \
in-memory table by writing a short program in a restricted query language.\n\
The language looks like pandas:\n\
  - the dataset is already bound to the variable `table`; never reload it\n\
  - `table['col']` selects a column, `table[['a', 'b']]` selects several\n\
  - `table[table['col'] > 10]` filters rows; combine masks with & and |\n\
  - table methods: head(n), sort_values(col, ascending), count(), \
bar_chart(label_col, value_col)\n\
  - column methods: sum(), mean(), min(), max(), count(), unique(), \
value_counts(), head(n)\n\
  - one statement per line, each of the form `name = expression`\n\
There are no loops, imports, function definitions, or file or network \
access. The only visualization surface is bar_chart.\n\
Assign your final answer to the variable `{answer}`.\n\
Put the program in a single fenced block opened with {fence} and closed \
with {close}. Explain briefly in plain text before or after the block.",
        answer = ANSWER_VAR,
        fence = FENCE_OPEN,
        close = FENCE_CLOSE,
    )
}

/// Build the per-question user prompt. Interpolated values are embedded
/// verbatim; a question or description containing fence markers can break
/// the template (known limitation, kept from the original design).
pub fn build_prompt(question: &str, dictionary: &[DictionaryEntry], sample: &str) -> String {
    format!(
        "The table has the following columns:\n{dict}\n\
Sample rows:\n{sample}\n\
Question: {question}\n\n\
Write a query-language program that computes the answer and assigns it to \
`{answer}`. Do not reload or invent data; use only the bound `table`.",
        dict = render_dictionary(dictionary),
        sample = sample,
        question = question,
        answer = ANSWER_VAR,
    )
}
