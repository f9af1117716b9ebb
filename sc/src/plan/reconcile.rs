//! Turn-by-turn plan reconciliation
//!
//! [`Reconciler::reconcile`] folds a freshly parsed plan into the conversation
//! under a fixed sequence of rules. The order matters: each step relies on the
//! lists already being deduplicated and scoped by the steps before it.
//!
//! ```text
//! incoming ─► dedup ─► scope removals ─► keep directives ─► drop subscribed
//!                                                              │
//!        next plan ◄─ prune explanations ◄─ resolve overlap ◄─ exclusions
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Plan, dedup, normalize};
use crate::activity::NameSet;
use crate::intent::{Intent, classify, exclusion_tokens, has_exclusion_trigger};

/// How removals are matched against the utterance on a non-removal turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalScope {
    /// The name appears anywhere in the utterance
    #[default]
    Substring,
    /// The name is one of the utterance's words
    Exact,
}

/// Matching knobs for keep and exclusion directives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    pub keep_case_sensitive: bool,
    pub exclusion_case_sensitive: bool,
    pub removal_scope: RemovalScope,
}

/// Result of answering an exclusion-only turn from the previous plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionOutcome {
    pub plan: Plan,
    pub excluded: Vec<String>,
    pub summary: String,
}

/// Applies the reconciliation rules with a fixed set of match options
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    options: MatchOptions,
}

impl Reconciler {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Reconcile `incoming` against `previous`, classifying `utterance` with the phrase tables
    pub fn reconcile(&self, previous: &Plan, incoming: Plan, utterance: &str, subscribed: &NameSet) -> Plan {
        let intent = classify(utterance);
        self.reconcile_with_intent(previous, incoming, utterance, &intent, subscribed)
    }

    /// Reconcile with an intent the caller already classified
    pub fn reconcile_with_intent(
        &self,
        previous: &Plan,
        incoming: Plan,
        utterance: &str,
        intent: &Intent,
        subscribed: &NameSet,
    ) -> Plan {
        debug!(
            adds = incoming.to_add.len(),
            removes = incoming.to_remove.len(),
            remove_mode = intent.remove_mode,
            "reconcile: called"
        );
        let mut plan = incoming;

        plan.to_add = dedup(plan.to_add);
        plan.to_remove = dedup(plan.to_remove);
        plan.to_keep = dedup(plan.to_keep);

        if !intent.remove_mode {
            plan.to_remove = self.scope_removals(plan.to_remove, utterance);
        }

        self.apply_keeps(&mut plan, previous, utterance);
        plan.to_add = filter_subscribed(plan.to_add, subscribed);
        plan.to_add = self.apply_exclusions(plan.to_add, utterance);
        plan.to_add = resolve_overlap(plan.to_add, &plan.to_remove);
        plan.prune_explanations();

        debug!(
            adds = plan.to_add.len(),
            removes = plan.to_remove.len(),
            keeps = plan.to_keep.len(),
            "reconcile: done"
        );
        plan
    }

    /// Answer an exclusion-only turn by filtering the previous additions
    ///
    /// Additions the user has since subscribed to are dropped first and are
    /// not reported as excluded.
    pub fn reconcile_exclusion(&self, previous: &Plan, utterance: &str, subscribed: &NameSet) -> ExclusionOutcome {
        debug!(adds = previous.to_add.len(), "reconcile_exclusion: called");
        let carried = filter_subscribed(previous.to_add.clone(), subscribed);
        let kept = self.apply_exclusions(carried.clone(), utterance);
        let kept_names: HashSet<String> = kept.iter().map(|n| normalize(n)).collect();
        let excluded: Vec<String> = carried
            .iter()
            .filter(|n| !kept_names.contains(&normalize(n)))
            .cloned()
            .collect();

        let summary = exclusion_summary(&carried, &kept);
        let mut plan = Plan {
            to_add: kept,
            explanations: previous.explanations.clone(),
            ..Default::default()
        };
        plan.prune_explanations();

        ExclusionOutcome {
            plan,
            excluded,
            summary,
        }
    }

    /// Cancel every pending removal, moving it into `to_keep`
    pub fn clear_removals(&self, previous: &Plan, subscribed: &NameSet) -> Plan {
        debug!(removes = previous.to_remove.len(), "clear_removals: called");
        let cleared: HashSet<String> = previous.to_remove.iter().map(|n| normalize(n)).collect();

        let mut plan = previous.clone();
        plan.to_add = filter_subscribed(std::mem::take(&mut plan.to_add), subscribed);
        let removed = std::mem::take(&mut plan.to_remove);
        let keeps = std::mem::take(&mut plan.to_keep);
        plan.to_keep = dedup(keeps.into_iter().chain(removed).collect());
        plan.explanations.retain(|k, _| !cleared.contains(&normalize(k)));
        plan.prune_explanations();
        plan
    }

    fn scope_removals(&self, removes: Vec<String>, utterance: &str) -> Vec<String> {
        let lc = utterance.to_lowercase();
        let words: HashSet<String> = match self.options.removal_scope {
            RemovalScope::Exact => lc
                .split(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?' | ';' | ':'))
                .map(normalize)
                .collect(),
            RemovalScope::Substring => HashSet::new(),
        };

        removes
            .into_iter()
            .filter(|sub| {
                let name = normalize(sub);
                let mentioned = match self.options.removal_scope {
                    RemovalScope::Substring => lc.contains(&name) || lc.contains(&format!("r/{}", name)),
                    RemovalScope::Exact => words.contains(&name),
                };
                if !mentioned {
                    debug!(%sub, "scope_removals: not mentioned by user, dropping");
                }
                mentioned
            })
            .collect()
    }

    fn apply_keeps(&self, plan: &mut Plan, previous: &Plan, utterance: &str) {
        let directives = keep_directives(utterance);
        let case_sensitive = self.options.keep_case_sensitive;

        let protected: HashSet<String> = previous.to_keep.iter().chain(&plan.to_keep).map(|n| normalize(n)).collect();
        let matches_directive = |sub: &str| {
            directives.iter().any(|token| {
                if case_sensitive {
                    bare(sub) == bare(token)
                } else {
                    normalize(sub) == normalize(token)
                }
            })
        };

        plan.to_remove.retain(|sub| {
            let keep = protected.contains(&normalize(sub)) || matches_directive(sub);
            if keep {
                info!(%sub, "Removed {} from unsubscribe list", sub);
            }
            !keep
        });

        // A case-sensitive miss leaves the removal in place, so it must not be listed as kept
        let remaining: HashSet<String> = plan.to_remove.iter().map(|n| normalize(n)).collect();
        plan.to_keep = dedup(
            previous
                .to_keep
                .iter()
                .chain(&plan.to_keep)
                .cloned()
                .chain(directives.into_iter().filter(|d| !remaining.contains(&normalize(d))))
                .collect(),
        );
    }

    fn apply_exclusions(&self, adds: Vec<String>, utterance: &str) -> Vec<String> {
        if !has_exclusion_trigger(utterance) {
            return adds;
        }
        let case_sensitive = self.options.exclusion_case_sensitive;
        let excluded: HashSet<String> = exclusion_tokens(utterance, case_sensitive).into_iter().collect();
        debug!(?excluded, "apply_exclusions: excluded words");

        adds.into_iter()
            .filter(|sub| {
                let name = if case_sensitive {
                    bare(sub).to_string()
                } else {
                    normalize(sub)
                };
                let skip = excluded.contains(&name);
                if skip {
                    info!(%sub, "Skipped {} based on user feedback", sub);
                }
                !skip
            })
            .collect()
    }
}

fn bare(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix("r/").or_else(|| name.strip_prefix("R/")).unwrap_or(name)
}

/// `r/<name>` tokens named alongside the word "keep"
fn keep_directives(utterance: &str) -> Vec<String> {
    if !utterance.to_lowercase().contains("keep") {
        return Vec::new();
    }
    utterance
        .split_whitespace()
        .map(|word| word.trim_matches(|c| matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '"' | '\'')))
        .filter(|word| word.len() > 2 && (word.starts_with("r/") || word.starts_with("R/")))
        .map(str::to_string)
        .collect()
}

fn filter_subscribed(adds: Vec<String>, subscribed: &NameSet) -> Vec<String> {
    let subscribed: HashSet<String> = subscribed.iter().map(|n| normalize(n)).collect();
    adds.into_iter()
        .filter(|sub| {
            let already = subscribed.contains(&normalize(sub));
            if already {
                debug!(%sub, "filter_subscribed: already subscribed, dropping");
            }
            !already
        })
        .collect()
}

fn resolve_overlap(adds: Vec<String>, removes: &[String]) -> Vec<String> {
    let removes: HashSet<String> = removes.iter().map(|n| normalize(n)).collect();
    adds.into_iter().filter(|sub| !removes.contains(&normalize(sub))).collect()
}

/// Describe what an exclusion-only turn changed
pub fn exclusion_summary(original: &[String], kept: &[String]) -> String {
    if original.len() == kept.len() {
        return "No changes made. The subreddit you mentioned wasn't in the recommendations.".to_string();
    }

    let kept_names: HashSet<String> = kept.iter().map(|n| normalize(n)).collect();
    let mut out = String::from("Updated recommendations:\n");
    if !kept.is_empty() {
        out.push_str("\nTo Add:\n");
        for sub in kept {
            out.push_str(&format!("+ {}\n", sub));
        }
    }

    out.push_str("\nExcluded based on your feedback:\n");
    for sub in original.iter().filter(|n| !kept_names.contains(&normalize(n))) {
        out.push_str(&format!("- {}\n", sub));
    }
    out
}

/// Case-insensitive union, one spelling per name, ordered by normalized name
fn union(a: &[String], b: &[String]) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for name in a.iter().chain(b) {
        out.entry(normalize(name))
            .and_modify(|existing| {
                if name.as_str() < existing.as_str() {
                    *existing = name.clone();
                }
            })
            .or_insert_with(|| name.clone());
    }
    out
}

/// Combine two finalized plans
///
/// Lists are unioned. A name that ends up in both additions and removals
/// cancels out of both, and kept names are purged from both; either way its
/// explanation goes too. On an explanation clash `b` wins.
pub fn merge(a: &Plan, b: &Plan) -> Plan {
    debug!("merge: called");
    let mut adds = union(&a.to_add, &b.to_add);
    let mut removes = union(&a.to_remove, &b.to_remove);
    let keeps = union(&a.to_keep, &b.to_keep);

    let conflicts: HashSet<String> = adds.keys().filter(|k| removes.contains_key(*k)).cloned().collect();
    let purged: HashSet<String> = adds
        .keys()
        .chain(removes.keys())
        .filter(|k| keeps.contains_key(*k) || conflicts.contains(*k))
        .cloned()
        .collect();
    debug!(conflicts = conflicts.len(), purged = purged.len(), "merge: resolved");

    adds.retain(|k, _| !purged.contains(k));
    removes.retain(|k, _| !purged.contains(k));

    let mut explanations = a.explanations.clone();
    explanations.extend(b.explanations.clone());
    explanations.retain(|k, _| !purged.contains(&normalize(k)));

    Plan {
        to_add: adds.into_values().collect(),
        to_remove: removes.into_values().collect(),
        to_keep: keeps.into_values().collect(),
        explanations,
    }
}
