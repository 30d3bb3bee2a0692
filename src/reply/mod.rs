//! Splits model output on the fenced-code convention.
//!
//! Deliberately a simple marker split with each failure shape given a name:
//! no fence at all means the reply is plain prose, an unclosed fence is
//! flagged rather than silently swallowed, and when several blocks appear
//! the first one wins and everything after its closer is trailing text.

use crate::prompt::{FENCE_CLOSE, FENCE_OPEN};

/// Outcome of splitting a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// No opening fence: the whole reply is explanation, nothing to run.
    Plain(String),
    /// One properly closed block: lead text, program, trailing text.
    Program {
        lead: String,
        code: String,
        trail: String,
    },
    /// Opening fence without a closer; the remainder is treated as the
    /// program but the caller should tell the user the block was unclosed.
    Unterminated { lead: String, code: String },
}

impl Reply {
    pub fn code(&self) -> Option<&str> {
        match self {
            Reply::Plain(_) => None,
            Reply::Program { code, .. } | Reply::Unterminated { code, .. } => Some(code),
        }
    }
}

/// Find the opening marker: the tagged fence if present, otherwise a bare
/// fence (models sometimes drop the language tag). Returns the marker's
/// start offset and length.
fn find_opener(text: &str) -> Option<(usize, usize)> {
    if let Some(pos) = text.find(FENCE_OPEN) {
        return Some((pos, FENCE_OPEN.len()));
    }
    text.find(FENCE_CLOSE).map(|pos| (pos, FENCE_CLOSE.len()))
}

pub fn split_reply(text: &str) -> Reply {
    let Some((open_at, open_len)) = find_opener(text) else {
        return Reply::Plain(text.trim().to_string());
    };
    let lead = text[..open_at].trim().to_string();
    let rest = &text[open_at + open_len..];
    match rest.find(FENCE_CLOSE) {
        Some(close_at) => {
            let code = rest[..close_at].trim().to_string();
            let trail = rest[close_at + FENCE_CLOSE.len()..].trim().to_string();
            Reply::Program { lead, code, trail }
        }
        None => Reply::Unterminated { lead, code: rest.trim().to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_fence_is_plain_explanation() {
        let reply = split_reply("The table has two rows.");
        assert_eq!(reply, Reply::Plain("The table has two rows.".into()));
        assert_eq!(reply.code(), None);
    }

    #[test]
    fn single_block_yields_three_segments() {
        let text = "Filtering adults.\n```query\nANSWER = table[table['age'] > 30]\n```\nDone.";
        match split_reply(text) {
            Reply::Program { lead, code, trail } => {
                assert_eq!(lead, "Filtering adults.");
                assert_eq!(code, "ANSWER = table[table['age'] > 30]");
                assert_eq!(trail, "Done.");
            }
            other => panic!("expected Program, got {:?}", other),
        }
    }

    #[test]
    fn trailing_text_may_be_empty() {
        let text = "```query\nANSWER = 1\n```";
        match split_reply(text) {
            Reply::Program { lead, code, trail } => {
                assert_eq!(lead, "");
                assert_eq!(code, "ANSWER = 1");
                assert_eq!(trail, "");
            }
            other => panic!("expected Program, got {:?}", other),
        }
    }

    #[test]
    fn missing_closer_is_flagged_not_dropped() {
        let text = "Here:\n```query\nANSWER = 1";
        match split_reply(text) {
            Reply::Unterminated { lead, code } => {
                assert_eq!(lead, "Here:");
                assert_eq!(code, "ANSWER = 1");
            }
            other => panic!("expected Unterminated, got {:?}", other),
        }
    }

    #[test]
    fn first_block_wins_when_there_are_several() {
        let text = "```query\nANSWER = 1\n```\nmid\n```query\nANSWER = 2\n```";
        match split_reply(text) {
            Reply::Program { code, trail, .. } => {
                assert_eq!(code, "ANSWER = 1");
                // Everything after the first closer is trail, later fences
                // included verbatim.
                assert!(trail.starts_with("mid"));
                assert!(trail.contains("ANSWER = 2"));
            }
            other => panic!("expected Program, got {:?}", other),
        }
    }

    #[test]
    fn bare_fence_without_language_tag_is_accepted() {
        let text = "```\nANSWER = 3\n```";
        match split_reply(text) {
            Reply::Program { code, .. } => assert_eq!(code, "ANSWER = 3"),
            other => panic!("expected Program, got {:?}", other),
        }
    }
}
