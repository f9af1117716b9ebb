//! Language model seam
//!
//! The conversation driver never talks to a provider directly. It goes through
//! [`ReplyModel`], which a network client implements outside this crate and
//! [`ScriptedModel`] implements offline for the CLI and tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by a reply model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No scripted reply left for this turn")]
    Exhausted,

    #[error("Model returned an empty reply")]
    EmptyReply,

    #[error("Model call failed: {0}")]
    Failed(String),
}

impl ModelError {
    /// Check if retrying the same turn could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Exhausted => false,
            ModelError::EmptyReply => true,
            ModelError::Failed(_) => true,
        }
    }
}

/// A model that answers one system + user prompt with free text
#[async_trait]
pub trait ReplyModel: Send + Sync {
    async fn reply(&self, system: &str, user: &str) -> Result<String, ModelError>;
}

/// Replays a fixed queue of replies, one per call
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<(String, String)>>,
    call_count: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<String>) -> Self {
        debug!(reply_count = replies.len(), "ScriptedModel::new: called");
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Number of times `reply` has been called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every (system, user) prompt pair received so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ReplyModel for ScriptedModel {
    async fn reply(&self, system: &str, user: &str) -> Result<String, ModelError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        debug!(%idx, "ScriptedModel::reply: called");
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((system.to_string(), user.to_string()));

        let next = self.replies.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match next {
            Some(reply) if reply.trim().is_empty() => Err(ModelError::EmptyReply),
            Some(reply) => Ok(reply),
            None => {
                debug!("ScriptedModel::reply: no more scripted replies");
                Err(ModelError::Exhausted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::new(vec!["first".to_string(), "second".to_string()]);

        assert_eq!(model.reply("sys", "a").await.unwrap(), "first");
        assert_eq!(model.reply("sys", "b").await.unwrap(), "second");
        assert!(matches!(model.reply("sys", "c").await, Err(ModelError::Exhausted)));
        assert_eq!(model.call_count(), 3);
        assert_eq!(model.requests()[1], ("sys".to_string(), "b".to_string()));
    }

    #[tokio::test]
    async fn test_scripted_model_blank_reply_is_error() {
        let model = ScriptedModel::new(vec!["   ".to_string()]);
        assert!(matches!(model.reply("s", "u").await, Err(ModelError::EmptyReply)));
    }

    #[test]
    fn test_is_retryable() {
        assert!(!ModelError::Exhausted.is_retryable());
        assert!(ModelError::EmptyReply.is_retryable());
        assert!(ModelError::Failed("timeout".to_string()).is_retryable());
    }
}
