//! Subcurator - conversation-driven subreddit subscription planner
//!
//! Turns a back-and-forth conversation ("I'm into baking", "skip r/Breadit",
//! "actually keep all of them") into one consistent plan of subreddits to
//! subscribe to, unsubscribe from, and keep.
//!
//! # Architecture
//!
//! ```text
//! activity ──► active list ──┐
//!                            ▼
//! utterance ─► intent ─► prompt ─► ReplyModel ─► parse ─► reconcile ─► Plan
//!                                                              ▲
//!                                     ConversationState ───────┘
//! ```
//!
//! The core (activity, intent, plan) is pure and synchronous. Only the
//! [`session::Conversation`] driver awaits the [`model::ReplyModel`] seam.
//!
//! # Example
//!
//! ```ignore
//! use subcurator::{Conversation, ConversationState, Reconciler, ScriptedModel};
//!
//! let model = Arc::new(ScriptedModel::new(vec!["+ r/Breadit - bread".into()]));
//! let conversation = Conversation::new(model, Reconciler::default());
//! let mut state = ConversationState::default();
//! let outcome = conversation.turn(&mut state, "I'm into baking", &activity).await?;
//! ```

pub mod activity;
pub mod cli;
pub mod config;
pub mod intent;
pub mod model;
pub mod plan;
pub mod prompt;
pub mod session;

pub use activity::{NameSet, SubredditStats, combine, filter_active, parse_name_list, render_listing};
pub use config::Config;
pub use intent::{Intent, IntentClassifier, IntentLabel, ModelClassifier, PhraseClassifier, classify, is_exclusion_only_request};
pub use model::{ModelError, ReplyModel, ScriptedModel};
pub use plan::{MatchOptions, Plan, Reconciler, RemovalScope, merge, parse};
pub use session::{Activity, Conversation, ConversationState, TurnKind, TurnOutcome, confirm};
