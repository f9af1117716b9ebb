//! Activity scoring
//!
//! Combines the three activity name sets (subscribed, upvoted, commented) into
//! per-subreddit stats and filters them down to the "active" list used to seed
//! prompts.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::plan::{normalize, reference};

/// Set of bare subreddit names (no `r/` prefix), case preserved as received
pub type NameSet = BTreeSet<String>;

/// Per-subreddit activity flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubredditStats {
    pub name: String,
    pub subscribed: bool,
    pub upvoted: bool,
    pub commented: bool,
}

impl SubredditStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Number of activity kinds this subreddit shows up in (0-3)
    pub fn score(&self) -> u8 {
        self.subscribed as u8 + self.upvoted as u8 + self.commented as u8
    }
}

/// Merge the three activity sets into one stats entry per name
pub fn combine(subscribed: &NameSet, upvoted: &NameSet, commented: &NameSet) -> BTreeMap<String, SubredditStats> {
    debug!(
        subscribed = subscribed.len(),
        upvoted = upvoted.len(),
        commented = commented.len(),
        "combine: called"
    );
    let mut combined: BTreeMap<String, SubredditStats> = BTreeMap::new();

    for name in subscribed {
        combined
            .entry(name.clone())
            .or_insert_with(|| SubredditStats::new(name))
            .subscribed = true;
    }
    for name in upvoted {
        combined
            .entry(name.clone())
            .or_insert_with(|| SubredditStats::new(name))
            .upvoted = true;
    }
    for name in commented {
        combined
            .entry(name.clone())
            .or_insert_with(|| SubredditStats::new(name))
            .commented = true;
    }

    combined
}

/// Return every subreddit scoring at least `threshold`, as `r/<name>` references
///
/// Output is sorted by normalized name so callers get a stable list.
pub fn filter_active(stats: &BTreeMap<String, SubredditStats>, threshold: u8) -> Vec<String> {
    debug!(entries = stats.len(), threshold, "filter_active: called");
    let mut active: Vec<&SubredditStats> = stats.values().filter(|s| s.score() >= threshold).collect();
    active.sort_by(|a, b| normalize(&a.name).cmp(&normalize(&b.name)).then_with(|| a.name.cmp(&b.name)));

    let active: Vec<String> = active.into_iter().map(|s| reference(&s.name)).collect();
    debug!(active = active.len(), "filter_active: done");
    active
}

/// Parse a newline-separated list of subreddit names
///
/// Blank lines and `#` comments are skipped; a leading `r/` is stripped.
pub fn parse_name_list(text: &str) -> NameSet {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.strip_prefix("r/")
                .or_else(|| line.strip_prefix("R/"))
                .unwrap_or(line)
                .trim()
                .to_string()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Render the "show my subs" listing
pub fn render_listing(subscribed: &NameSet, upvoted: &NameSet, commented: &NameSet) -> String {
    debug!("render_listing: called");
    let upvoted_only: Vec<&String> = upvoted.iter().filter(|n| !subscribed.contains(*n)).collect();
    let commented_only: Vec<&String> = commented
        .iter()
        .filter(|n| !subscribed.contains(*n) && !upvoted.contains(*n))
        .collect();

    let mut out = String::from("Your active subreddits:\n");
    for name in subscribed {
        out.push_str(&format!("= r/{}\n", name));
    }
    if !upvoted_only.is_empty() {
        out.push_str("\nUpvoted-only subs:\n");
        for name in upvoted_only {
            out.push_str(&format!("* r/{} (upvoted-only)\n", name));
        }
    }
    if !commented_only.is_empty() {
        out.push_str("\nCommented-only subs:\n");
        for name in commented_only {
            out.push_str(&format!("* r/{} (commented-only)\n", name));
        }
    }
    out
}
