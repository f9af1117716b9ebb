//! Subcurator configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::plan::{MatchOptions, RemovalScope};
use crate::session::DEFAULT_ACTIVE_THRESHOLD;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Activity scoring
    pub scoring: ScoringConfig,

    /// Keep / exclusion / removal matching
    pub matching: MatchingConfig,

    /// Conversation state persistence
    pub conversation: ConversationConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        let threshold = self.scoring.active_threshold;
        if !(1..=3).contains(&threshold) {
            return Err(eyre::eyre!(
                "scoring.active-threshold must be between 1 and 3, got {}",
                threshold
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .subcurator.yml
        let local_config = PathBuf::from(".subcurator.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/subcurator/subcurator.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("subcurator").join("subcurator.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".subcurator.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("subcurator").join("subcurator.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| Self::load_from_file(p).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Activity scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum number of activity kinds (subscribed, upvoted, commented) for a sub to count as active
    #[serde(rename = "active-threshold")]
    pub active_threshold: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            active_threshold: DEFAULT_ACTIVE_THRESHOLD,
        }
    }
}

/// Directive matching
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Match "keep r/x" against removals case-sensitively
    #[serde(rename = "keep-case-sensitive")]
    pub keep_case_sensitive: bool,

    /// Match "don't add x" against additions case-sensitively
    #[serde(rename = "exclusion-case-sensitive")]
    pub exclusion_case_sensitive: bool,

    /// How removals are scoped to the utterance outside removal turns
    #[serde(rename = "removal-scope")]
    pub removal_scope: RemovalScope,
}

impl MatchingConfig {
    pub fn options(&self) -> MatchOptions {
        MatchOptions {
            keep_case_sensitive: self.keep_case_sensitive,
            exclusion_case_sensitive: self.exclusion_case_sensitive,
            removal_scope: self.removal_scope,
        }
    }
}

/// Conversation state persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Where the CLI keeps conversation state between invocations
    #[serde(rename = "state-file")]
    pub state_file: PathBuf,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/subcurator on Linux)
        let state_file = dirs::data_local_dir()
            .map(|d| d.join("subcurator"))
            .unwrap_or_else(|| PathBuf::from(".subcurator"))
            .join("state.json");

        Self { state_file }
    }
}
