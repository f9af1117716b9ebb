//! Parser for bullet-style model replies
//!
//! Recognised lines look like `+ r/name - why`, `- r/name – why` or `= r/name`.
//! Headers, commentary and blank lines around them are ignored.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{Plan, normalize};

static ACTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+=-]) ?(r/[A-Za-z0-9_]+)(.*)$").expect("action line regex is valid"));

#[derive(Debug, Clone, Copy)]
enum Action {
    Add,
    Remove,
    Keep,
}

/// Parse a reply into a plan
///
/// A subreddit is admitted once per reply: the first line naming it decides
/// which list it lands in and which explanation it carries.
pub fn parse(reply: &str) -> Plan {
    debug!(reply_len = reply.len(), "parse: called");
    let mut plan = Plan::default();
    let mut seen: HashSet<String> = HashSet::new();

    for line in reply.lines() {
        let Some((action, token, explanation)) = parse_line(line) else {
            continue;
        };

        if !seen.insert(normalize(&token)) {
            debug!(%token, "parse: duplicate subreddit, skipping");
            continue;
        }

        if let Some(why) = explanation {
            plan.explanations.insert(token.clone(), why);
        }

        match action {
            Action::Add => plan.to_add.push(token),
            Action::Remove => plan.to_remove.push(token),
            Action::Keep => plan.to_keep.push(token),
        }
    }

    debug!(
        adds = plan.to_add.len(),
        removes = plan.to_remove.len(),
        keeps = plan.to_keep.len(),
        "parse: done"
    );
    plan
}

fn parse_line(line: &str) -> Option<(Action, String, Option<String>)> {
    let caps = ACTION_LINE.captures(line.trim())?;
    let action = match &caps[1] {
        "+" => Action::Add,
        "-" => Action::Remove,
        _ => Action::Keep,
    };
    let token = caps[2].to_string();
    Some((action, token, extract_explanation(&caps[3])))
}

/// Text after the first ` - ` (or en dash) separator
fn extract_explanation(rest: &str) -> Option<String> {
    let (_, why) = rest.split_once(" - ").or_else(|| rest.split_once(" – "))?;
    let why = why.trim();
    if why.is_empty() { None } else { Some(why.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_remove_keep() {
        let plan = parse("+ r/a\n- r/b\n= r/c\n");

        assert_eq!(plan.to_add, vec!["r/a"]);
        assert_eq!(plan.to_remove, vec!["r/b"]);
        assert_eq!(plan.to_keep, vec!["r/c"]);
        assert!(plan.explanations.is_empty());
    }

    #[test]
    fn test_parse_without_space_after_marker() {
        let plan = parse("+r/rust\n-r/news");
        assert_eq!(plan.to_add, vec!["r/rust"]);
        assert_eq!(plan.to_remove, vec!["r/news"]);
    }

    #[test]
    fn test_parse_dedup_case_insensitive() {
        let plan = parse("+ r/a\n+ r/a\n+ R/A\n+ r/A");
        assert_eq!(plan.to_add, vec!["r/a"]);
    }

    #[test]
    fn test_parse_first_occurrence_wins_across_lists() {
        let plan = parse("+ r/rust\n- r/Rust");
        assert_eq!(plan.to_add, vec!["r/rust"]);
        assert!(plan.to_remove.is_empty());
    }

    #[test]
    fn test_parse_explanations() {
        let reply = "+ r/Breadit - baking bread at home\n- r/news – too noisy\n+ r/Sourdough -\n";
        let plan = parse(reply);

        assert_eq!(plan.explanation("r/Breadit"), Some("baking bread at home"));
        assert_eq!(plan.explanation("r/news"), Some("too noisy"));
        assert_eq!(plan.explanation("r/Sourdough"), None);
        assert_eq!(plan.to_add, vec!["r/Breadit", "r/Sourdough"]);
    }

    #[test]
    fn test_parse_duplicate_line_does_not_lend_explanation() {
        let plan = parse("+ r/a\n- r/A - bad idea\n+ r/b - good\n+ r/B - ignored");

        assert_eq!(plan.to_add, vec!["r/a", "r/b"]);
        assert_eq!(plan.explanation("r/a"), None);
        assert_eq!(plan.explanation("r/b"), Some("good"));
        assert_eq!(plan.explanations.len(), 1);
        assert_eq!(plan.to_string(), "To Add:\n + r/a\n + r/b (good)\n");
    }

    #[test]
    fn test_parse_ignores_prose_and_headers() {
        let reply = "Here are some ideas!\n\nBaking:\n  + r/Breadit - bread\n- not a subreddit\n* r/other\n\
                     Fitness:\n+ r/running\nLet me know what you think.";
        let plan = parse(reply);

        assert_eq!(plan.to_add, vec!["r/Breadit", "r/running"]);
        assert!(plan.to_remove.is_empty());
    }

    #[test]
    fn test_parse_requires_token_right_after_marker() {
        let plan = parse("+ try r/rust\n- see also r/news");
        assert!(plan.is_empty());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse(""), Plan::default());
    }
}
