//! Intent classification
//!
//! Maps a free-text utterance onto a set of intent flags using fixed phrase
//! tables. The phrase tables are a contract with the prompts upstream: changing
//! a phrase changes which turns reach the model.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::model::ReplyModel;
use crate::prompt::CLASSIFIER_PROMPT;

/// Phrasings that ask to see the current subscription list
const SHOW_SUBS_PHRASES: &[&str] = &[
    "show subs",
    "show my subs",
    "show me my subs",
    "show subreddits",
    "show my subreddits",
    "show me my subreddits",
    "list my subs",
    "list my subreddits",
    "what am i subscribed to",
    "what communities",
    "what subreddits",
    "which ones do i follow",
    "subs i use",
];

/// Keywords that switch the turn into removal mode
const REMOVE_KEYWORDS: &[&str] = &["remove", "unsubscribe", "prune", "get rid", "delete", "i don't want"];

/// Trigger words dropped when reading the excluded names
const EXCLUSION_WORDS: &[&str] = &["skip", "no"];

/// Trigger phrases stripped before reading the excluded names
static EXCLUSION_PHRASES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)don't add|dont add|skip").expect("exclusion phrase regex is valid"));

/// Function words that never count as a subreddit name
const COMMON_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from", "up", "about", "into",
    "through", "during", "before", "after", "above", "below", "between", "among", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
    "must", "can", "please", "thanks", "thank",
];

/// Directives derived from a single utterance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub regenerate_adds: bool,
    pub regenerate_removes: bool,
    pub clear_removes: bool,
    pub show_sub_list: bool,
    pub remove_mode: bool,
    /// Verbatim utterance, forwarded to the model when the turn asks for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_topic_prompt: Option<String>,
    /// Lower-cased copy of the utterance
    pub raw_feedback: String,
}

/// Classify an utterance with the phrase tables
///
/// Every rule is applied independently, so several flags can be set at once.
pub fn classify(utterance: &str) -> Intent {
    debug!(utterance_len = utterance.len(), "classify: called");
    let lc = utterance.to_lowercase();
    let mut intent = Intent {
        raw_feedback: lc.clone(),
        ..Default::default()
    };

    if lc.contains("give me") && lc.contains("more") && lc.contains("subs") {
        debug!("classify: regenerate adds");
        intent.regenerate_adds = true;
    }

    if lc.contains("remove more") || lc.contains("prune more") {
        debug!("classify: regenerate removes");
        intent.regenerate_removes = true;
    }

    if lc.contains("keep all") || lc.contains("clear removes") {
        debug!("classify: clear removes");
        intent.clear_removes = true;
    }

    if lc.contains("suggest more") && lc.contains("subs") {
        debug!("classify: new topic prompt");
        intent.new_topic_prompt = Some(utterance.to_string());
    }

    if contains_any(&lc, SHOW_SUBS_PHRASES) {
        debug!("classify: show sub list");
        intent.show_sub_list = true;
    }

    if contains_any(&lc, REMOVE_KEYWORDS) {
        debug!("classify: remove mode");
        intent.remove_mode = true;
        intent.regenerate_removes = true;
        intent.new_topic_prompt = Some(utterance.to_string());
    }

    intent
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?' | ';' | ':')
}

fn is_common_word(word: &str) -> bool {
    COMMON_WORDS.contains(&word.to_lowercase().as_str())
}

/// Check whether an utterance carries an exclusion directive
pub fn has_exclusion_trigger(utterance: &str) -> bool {
    let lc = utterance.to_lowercase();
    lc.contains("don't add")
        || lc.contains("dont add")
        || lc.contains("skip")
        || has_leading_no(&lc)
}

/// "no" counts only as a whole word with another word after it
fn has_leading_no(lc: &str) -> bool {
    let words: Vec<&str> = lc.split_whitespace().collect();
    words
        .iter()
        .take(words.len().saturating_sub(1))
        .any(|word| word.trim_start_matches(is_separator) == "no")
}

/// Words left in an utterance once the exclusion triggers are removed
///
/// Each word has any `r/` prefix stripped. Words are lower-cased unless
/// `case_sensitive` is set.
pub fn exclusion_tokens(utterance: &str, case_sensitive: bool) -> Vec<String> {
    let stripped = EXCLUSION_PHRASES.replace_all(utterance, " ");
    stripped
        .split(is_separator)
        .map(|word| word.trim_matches(|c| matches!(c, '"' | '\'' | '(' | ')')))
        .filter(|word| !word.is_empty())
        .filter(|word| !EXCLUSION_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w)))
        .map(|word| {
            word.strip_prefix("r/")
                .or_else(|| word.strip_prefix("R/"))
                .unwrap_or(word)
        })
        .filter(|word| !word.is_empty())
        .map(|word| if case_sensitive { word.to_string() } else { word.to_lowercase() })
        .collect()
}

/// Detect a short "don't add X" style utterance that names at most one item
///
/// Such turns are answered from the previous plan without a model call.
pub fn is_exclusion_only_request(utterance: &str) -> bool {
    debug!(utterance_len = utterance.len(), "is_exclusion_only_request: called");
    let lc = utterance.trim().to_lowercase();
    if !has_exclusion_trigger(&lc) {
        debug!("is_exclusion_only_request: no exclusion trigger");
        return false;
    }

    let meaningful = exclusion_tokens(&lc, false)
        .iter()
        .filter(|word| word.chars().count() > 2 && !is_common_word(word))
        .count();
    debug!(meaningful, "is_exclusion_only_request: counted meaningful words");
    meaningful <= 1
}

/// Single-label answer of the model-backed classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    ShowSubs,
    RegenerateAdds,
    RegenerateRemoves,
    RefineRemoves,
    RemoveOnly,
    ClearRemoves,
    NewPrompt,
    None,
}

impl IntentLabel {
    /// Parse a label, mapping anything unrecognised to `None`
    pub fn from_label(label: &str) -> Self {
        match label.trim().trim_matches('"').to_lowercase().as_str() {
            "show_subs" => Self::ShowSubs,
            "regenerate_adds" => Self::RegenerateAdds,
            "regenerate_removes" => Self::RegenerateRemoves,
            "refine_removes" => Self::RefineRemoves,
            "remove_only" => Self::RemoveOnly,
            "clear_removes" => Self::ClearRemoves,
            "new_prompt" => Self::NewPrompt,
            _ => Self::None,
        }
    }

    /// Expand the label into intent flags for `utterance`
    pub fn to_intent(self, utterance: &str) -> Intent {
        let mut intent = Intent {
            raw_feedback: utterance.to_lowercase(),
            ..Default::default()
        };
        match self {
            Self::ShowSubs => intent.show_sub_list = true,
            Self::RegenerateAdds => intent.regenerate_adds = true,
            Self::RegenerateRemoves => intent.regenerate_removes = true,
            Self::RefineRemoves | Self::RemoveOnly => {
                intent.remove_mode = true;
                intent.regenerate_removes = true;
                intent.new_topic_prompt = Some(utterance.to_string());
            }
            Self::ClearRemoves => intent.clear_removes = true,
            Self::NewPrompt => intent.new_topic_prompt = Some(utterance.to_string()),
            Self::None => {}
        }
        intent
    }
}

impl std::fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShowSubs => write!(f, "show_subs"),
            Self::RegenerateAdds => write!(f, "regenerate_adds"),
            Self::RegenerateRemoves => write!(f, "regenerate_removes"),
            Self::RefineRemoves => write!(f, "refine_removes"),
            Self::RemoveOnly => write!(f, "remove_only"),
            Self::ClearRemoves => write!(f, "clear_removes"),
            Self::NewPrompt => write!(f, "new_prompt"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Source of intent classifications for the conversation driver
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, utterance: &str) -> Intent;
}

/// Deterministic phrase-table classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseClassifier;

#[async_trait]
impl IntentClassifier for PhraseClassifier {
    async fn classify(&self, utterance: &str) -> Intent {
        classify(utterance)
    }
}

/// Classifier that asks a model for a single label
///
/// Falls back to the phrase tables when the model call fails.
pub struct ModelClassifier {
    model: Arc<dyn ReplyModel>,
}

impl ModelClassifier {
    pub fn new(model: Arc<dyn ReplyModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl IntentClassifier for ModelClassifier {
    async fn classify(&self, utterance: &str) -> Intent {
        debug!("ModelClassifier::classify: called");
        match self.model.reply(CLASSIFIER_PROMPT, utterance).await {
            Ok(answer) => {
                let label = IntentLabel::from_label(&answer);
                debug!(%label, "ModelClassifier::classify: model answered");
                label.to_intent(utterance)
            }
            Err(e) => {
                warn!(error = %e, "ModelClassifier::classify: model failed, using phrase table");
                classify(utterance)
            }
        }
    }
}
