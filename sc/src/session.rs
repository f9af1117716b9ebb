//! Conversation driver
//!
//! Runs one user turn at a time: classify the utterance, answer it locally when
//! possible (listing, "keep all", exclusion-only), otherwise ask the reply model
//! and reconcile what it proposes into the running plan.
//!
//! All cross-turn memory lives in [`ConversationState`], which the caller owns
//! and passes into every turn.
//!
//! ```text
//! utterance ─► IntentClassifier ─┬─ show subs ──────► listing (view only)
//!                                ├─ keep all ───────► clear_removals
//!                                ├─ exclusion only ─► reconcile_exclusion
//!                                └─ otherwise ──────► ReplyModel ─► parse ─► reconcile
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::activity::{NameSet, combine, filter_active, render_listing};
use crate::intent::{Intent, IntentClassifier, PhraseClassifier, is_exclusion_only_request};
use crate::model::{ModelError, ReplyModel};
use crate::plan::{Plan, Reconciler, parse};
use crate::prompt::{NO_MATCHES_REPLY, SYSTEM_PROMPT, build_prompt};

/// Default activity score for a subreddit to count as active
pub const DEFAULT_ACTIVE_THRESHOLD: u8 = 2;

/// The three activity name sets for the current user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Activity {
    pub subscribed: NameSet,
    pub upvoted: NameSet,
    pub commented: NameSet,
}

/// Memory carried from one turn to the next
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationState {
    /// Plan produced by the most recent turn
    pub last_plan: Plan,

    /// Last utterance that described the user's interests
    pub last_interest: String,
}

impl ConversationState {
    /// Load state from a JSON file; a missing file is a fresh conversation
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "ConversationState::load: no state file, starting fresh");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).context(format!("Failed to read state file {}", path.display()))?;
        let state: Self =
            serde_json::from_str(&content).context(format!("Failed to parse state file {}", path.display()))?;
        Ok(state)
    }

    /// Write state as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create state directory")?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).context(format!("Failed to write state file {}", path.display()))?;
        Ok(())
    }
}

/// How a turn was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    /// Empty utterance: the current plan is confirmed
    Confirm,
    /// Subscription listing, plan untouched
    Listing,
    /// Pending removals cancelled
    ClearRemovals,
    /// Previous additions filtered without a model call
    Exclusion,
    /// Model reply parsed and reconciled
    Model,
}

/// Everything the caller needs to display one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub kind: TurnKind,
    pub intent: Intent,
    pub plan: Plan,
    pub reply: String,
    pub view_only: bool,
    pub no_matches: bool,
    pub model_called: bool,
}

/// Drives the conversation against a reply model
pub struct Conversation {
    model: Arc<dyn ReplyModel>,
    classifier: Arc<dyn IntentClassifier>,
    reconciler: Reconciler,
    active_threshold: u8,
}

impl Conversation {
    /// Create a driver using the phrase-table classifier
    pub fn new(model: Arc<dyn ReplyModel>, reconciler: Reconciler) -> Self {
        Self {
            model,
            classifier: Arc::new(PhraseClassifier),
            reconciler,
            active_threshold: DEFAULT_ACTIVE_THRESHOLD,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_active_threshold(mut self, threshold: u8) -> Self {
        self.active_threshold = threshold;
        self
    }

    /// The prompt a model turn would send, without sending it
    pub fn prompt_for(&self, state: &ConversationState, utterance: &str, intent: &Intent, activity: &Activity) -> String {
        let input = interest_for(state, utterance, intent);
        let stats = combine(&activity.subscribed, &activity.upvoted, &activity.commented);
        let active = filter_active(&stats, self.active_threshold);
        build_prompt(input, intent, &activity.subscribed, &active)
    }

    /// Run one turn, updating `state` on success
    ///
    /// A failed model call leaves `state` untouched.
    pub async fn turn(
        &self,
        state: &mut ConversationState,
        utterance: &str,
        activity: &Activity,
    ) -> Result<TurnOutcome, ModelError> {
        debug!(utterance_len = utterance.len(), "turn: called");

        if utterance.trim().is_empty() {
            debug!("turn: empty utterance, confirming");
            return Ok(TurnOutcome {
                kind: TurnKind::Confirm,
                intent: Intent::default(),
                plan: state.last_plan.clone(),
                reply: state.last_plan.to_string(),
                view_only: true,
                no_matches: state.last_plan.is_empty(),
                model_called: false,
            });
        }

        let intent = self.classifier.classify(utterance).await;

        if intent.show_sub_list {
            debug!("turn: show sub list");
            let reply = render_listing(&activity.subscribed, &activity.upvoted, &activity.commented);
            return Ok(TurnOutcome {
                kind: TurnKind::Listing,
                intent,
                plan: state.last_plan.clone(),
                reply,
                view_only: true,
                no_matches: false,
                model_called: false,
            });
        }

        let has_previous = !state.last_plan.is_empty();

        if intent.clear_removes && has_previous {
            debug!("turn: clearing removals from previous plan");
            let plan = self.reconciler.clear_removals(&state.last_plan, &activity.subscribed);
            let reply = if plan.to_keep.is_empty() {
                "No pending removals to cancel.".to_string()
            } else {
                format!("Keeping all of: {}", plan.to_keep.join(", "))
            };
            return Ok(self.finish(state, TurnKind::ClearRemovals, intent, plan, reply, false));
        }

        if has_previous && is_exclusion_only_request(utterance) {
            debug!("turn: exclusion-only request, skipping model");
            let outcome = self
                .reconciler
                .reconcile_exclusion(&state.last_plan, utterance, &activity.subscribed);
            return Ok(self.finish(state, TurnKind::Exclusion, intent, outcome.plan, outcome.summary, false));
        }

        let prompt = self.prompt_for(state, utterance, &intent, activity);
        let raw = self.model.reply(SYSTEM_PROMPT, &prompt).await?;
        debug!(reply_len = raw.len(), "turn: model replied");

        if !(intent.regenerate_adds && !state.last_interest.is_empty()) {
            state.last_interest = utterance.to_string();
        }

        let incoming = parse(&raw);
        let plan = self
            .reconciler
            .reconcile_with_intent(&state.last_plan, incoming, utterance, &intent, &activity.subscribed);
        Ok(self.finish(state, TurnKind::Model, intent, plan, raw, true))
    }

    fn finish(
        &self,
        state: &mut ConversationState,
        kind: TurnKind,
        intent: Intent,
        plan: Plan,
        reply: String,
        model_called: bool,
    ) -> TurnOutcome {
        let no_matches = plan.is_empty();
        let reply = if no_matches && kind == TurnKind::Model {
            NO_MATCHES_REPLY.to_string()
        } else {
            reply
        };
        info!(
            ?kind,
            adds = plan.to_add.len(),
            removes = plan.to_remove.len(),
            no_matches,
            "Turn complete"
        );
        state.last_plan = plan.clone();

        TurnOutcome {
            kind,
            intent,
            plan,
            reply,
            view_only: false,
            no_matches,
            model_called,
        }
    }
}

/// Final plan for a confirmed conversation, or None when there is nothing to apply
pub fn confirm(state: &ConversationState) -> Option<Plan> {
    if state.last_plan.is_empty() {
        None
    } else {
        Some(state.last_plan.clone())
    }
}

fn interest_for<'a>(state: &'a ConversationState, utterance: &'a str, intent: &'a Intent) -> &'a str {
    if intent.regenerate_adds && !state.last_interest.is_empty() {
        &state.last_interest
    } else {
        intent.new_topic_prompt.as_deref().unwrap_or(utterance)
    }
}
