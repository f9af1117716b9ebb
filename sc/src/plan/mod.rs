//! Subscription plan
//!
//! A [`Plan`] is the running set of pending subscribe / unsubscribe / keep
//! actions for one conversation. It is built by [`parse`] from a model reply and
//! carried from turn to turn by [`Reconciler`].
//!
//! # Invariants of a reconciled plan
//!
//! - no name is in both `to_add` and `to_remove`
//! - no name appears twice (case-insensitively) within a list
//! - kept names never appear in `to_remove`
//! - `to_add` never holds a name the user is already subscribed to

mod parser;
mod reconcile;

pub use parser::parse;
pub use reconcile::{ExclusionOutcome, MatchOptions, Reconciler, RemovalScope, exclusion_summary, merge};

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lower-case a subreddit reference and strip its `r/` prefix
pub fn normalize(name: &str) -> String {
    let name = name.trim();
    let bare = name
        .strip_prefix("r/")
        .or_else(|| name.strip_prefix("R/"))
        .unwrap_or(name);
    bare.to_lowercase()
}

/// Format a bare name as an `r/<name>` reference
pub fn reference(name: &str) -> String {
    let name = name.trim();
    if name.starts_with("r/") {
        name.to_string()
    } else {
        format!("r/{}", name.strip_prefix("R/").unwrap_or(name))
    }
}

/// Drop case-insensitive duplicates, keeping the first occurrence
pub(crate) fn dedup(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names.into_iter().filter(|n| seen.insert(normalize(n))).collect()
}

/// Pending subscription changes plus their justifications
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    /// Subreddits to subscribe to, as `r/<name>`
    pub to_add: Vec<String>,

    /// Subreddits to unsubscribe from
    pub to_remove: Vec<String>,

    /// Subreddits protected from removal
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to_keep: Vec<String>,

    /// Justification per reference, keyed on the reference as written
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub explanations: BTreeMap<String, String>,
}

impl Plan {
    /// True when the plan has nothing to add or remove
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Explanation for a reference, if one was given
    pub fn explanation(&self, name: &str) -> Option<&str> {
        self.explanations
            .get(name)
            .or_else(|| {
                let key = normalize(name);
                self.explanations
                    .iter()
                    .find(|(k, _)| normalize(k) == key)
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
            .filter(|e| !e.is_empty())
    }

    /// Drop explanations whose reference is no longer in any list
    pub fn prune_explanations(&mut self) {
        let live: HashSet<String> = self
            .to_add
            .iter()
            .chain(&self.to_remove)
            .chain(&self.to_keep)
            .map(|n| normalize(n))
            .collect();
        self.explanations.retain(|k, _| live.contains(&normalize(k)));
    }

    /// Check the structural invariants (overlap and duplicates)
    pub fn is_consistent(&self) -> bool {
        let adds: Vec<String> = self.to_add.iter().map(|n| normalize(n)).collect();
        let removes: Vec<String> = self.to_remove.iter().map(|n| normalize(n)).collect();
        let keeps: HashSet<String> = self.to_keep.iter().map(|n| normalize(n)).collect();

        let unique_adds: HashSet<&String> = adds.iter().collect();
        let unique_removes: HashSet<&String> = removes.iter().collect();

        unique_adds.len() == adds.len()
            && unique_removes.len() == removes.len()
            && !removes.iter().any(|r| unique_adds.contains(r) || keeps.contains(r))
    }

    fn write_section(&self, f: &mut fmt::Formatter<'_>, title: &str, marker: char, names: &[String]) -> fmt::Result {
        if names.is_empty() {
            return Ok(());
        }
        let mut sorted: Vec<&String> = names.iter().collect();
        sorted.sort_by_key(|n| normalize(n));

        writeln!(f, "{}:", title)?;
        for name in sorted {
            match self.explanation(name) {
                Some(why) => writeln!(f, " {} {} ({})", marker, name, why)?,
                None => writeln!(f, " {} {}", marker, name)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() && self.to_keep.is_empty() {
            return writeln!(f, "= No changes needed.");
        }
        self.write_section(f, "To Add", '+', &self.to_add)?;
        self.write_section(f, "To Remove", '-', &self.to_remove)?;
        self.write_section(f, "To Keep", '=', &self.to_keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("r/Rust"), "rust");
        assert_eq!(normalize("  R/Golang "), "golang");
        assert_eq!(normalize("baking"), "baking");
    }

    #[test]
    fn test_reference() {
        assert_eq!(reference("rust"), "r/rust");
        assert_eq!(reference("r/rust"), "r/rust");
        assert_eq!(reference("R/Rust"), "r/Rust");
    }

    #[test]
    fn test_dedup_keeps_first() {
        assert_eq!(dedup(names(&["r/A", "r/b", "r/a", "B"])), names(&["r/A", "r/b"]));
    }

    #[test]
    fn test_is_consistent() {
        let mut plan = Plan {
            to_add: names(&["r/a", "r/b"]),
            to_remove: names(&["r/c"]),
            ..Default::default()
        };
        assert!(plan.is_consistent());

        plan.to_remove.push("r/A".to_string());
        assert!(!plan.is_consistent());

        plan.to_remove = names(&["r/c"]);
        plan.to_keep = names(&["r/C"]);
        assert!(!plan.is_consistent());
    }

    #[test]
    fn test_display_sorted_with_explanations() {
        let mut plan = Plan {
            to_add: names(&["r/zig", "r/Baking"]),
            to_remove: names(&["r/news"]),
            ..Default::default()
        };
        plan.explanations.insert("r/Baking".to_string(), "bread".to_string());

        let rendered = plan.to_string();
        assert_eq!(rendered, "To Add:\n + r/Baking (bread)\n + r/zig\nTo Remove:\n - r/news\n");
    }

    #[test]
    fn test_display_empty() {
        assert_eq!(Plan::default().to_string(), "= No changes needed.\n");
    }

    #[test]
    fn test_prune_explanations() {
        let mut plan = Plan {
            to_add: names(&["r/a"]),
            ..Default::default()
        };
        plan.explanations.insert("r/a".to_string(), "x".to_string());
        plan.explanations.insert("r/gone".to_string(), "y".to_string());

        plan.prune_explanations();
        assert_eq!(plan.explanations.len(), 1);
        assert_eq!(plan.explanation("r/A"), Some("x"));
    }

    #[test]
    fn test_serde_shape() {
        let plan = Plan {
            to_add: names(&["r/a"]),
            ..Default::default()
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json, serde_json::json!({"to_add": ["r/a"], "to_remove": []}));

        let parsed: Plan = serde_json::from_str(r#"{"to_add": ["r/b"]}"#).unwrap();
        assert_eq!(parsed.to_add, names(&["r/b"]));
        assert!(parsed.to_remove.is_empty());
    }
}
