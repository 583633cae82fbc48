//! Caller-facing configuration: HTTP settings and filter configurations.
//!
//! [`Settings`] tunes the upstream HTTP client and loads from an optional
//! TOML file — a missing or empty file yields `Settings::default()`, and
//! unknown keys are warned about but ignored.
//!
//! [`FilterConfig`] is one stored feed-filter: the upstream URL, a display
//! name, and the validated rule tree. Construction is the validation gate for
//! new or edited configurations; persistence itself belongs to the caller's
//! storage layer.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::rule::{RuleError, RuleNode};
use crate::util::{validate_upstream_url, UrlValidationError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings file exceeds the maximum allowed size.
    #[error("Settings file too large: {0}")]
    TooLarge(String),

    /// The HTTP client could not be constructed from these settings.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Why a submitted filter configuration was rejected.
#[derive(Debug, Error)]
pub enum FilterConfigError {
    #[error("Invalid upstream URL: {0}")]
    Url(#[from] UrlValidationError),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

// ============================================================================
// Settings
// ============================================================================

/// HTTP settings for the upstream fetch.
///
/// The pipeline itself enforces no timeout; the bounded client built from
/// these settings is what keeps an unresponsive upstream from hanging a
/// request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// User-Agent presented to upstream feed servers.
    pub user_agent: String,

    /// Whole-request timeout for the upstream fetch, in seconds.
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: concat!("sift/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Maximum settings file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load settings from a TOML file.
    ///
    /// - Missing file → `Ok(Settings::default())`
    /// - Empty file → `Ok(Settings::default())`
    /// - Invalid TOML → `Err(SettingsError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as a warning
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(SettingsError::TooLarge(format!(
                    "Settings file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(SettingsError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Settings file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(SettingsError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Settings file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = ["user_agent", "timeout_secs"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in settings file, ignoring");
                }
            }
        }

        let settings: Settings = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), timeout_secs = settings.timeout_secs, "Loaded settings");
        Ok(settings)
    }

    /// Builds the bounded `reqwest::Client` the pipeline fetches with.
    pub fn build_client(&self) -> Result<reqwest::Client, SettingsError> {
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| SettingsError::Client(e.to_string()))
    }
}

// ============================================================================
// FilterConfig
// ============================================================================

/// Raw persisted form: the rule arrives as query-builder JSON under the
/// `query_builder` key.
#[derive(Debug, Deserialize)]
struct RawFilterConfig {
    url: String,
    name: String,
    query_builder: serde_json::Value,
}

/// One feed-filter configuration: upstream URL, display name, validated rule.
///
/// Read-only once constructed; the rule tree may be shared across concurrent
/// evaluations.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawFilterConfig")]
pub struct FilterConfig {
    url: String,
    name: String,
    rule: RuleNode,
}

impl FilterConfig {
    /// Validating constructor — the gate a new or edited configuration passes
    /// before it may be persisted.
    ///
    /// # Errors
    ///
    /// Rejects non-public or non-HTTP upstream URLs and any rule-tree
    /// violation; a rejected configuration is never partially applied.
    pub fn new(
        url: impl Into<String>,
        name: impl Into<String>,
        query_builder: &serde_json::Value,
    ) -> Result<Self, FilterConfigError> {
        let url = url.into();
        validate_upstream_url(&url)?;
        let rule = RuleNode::validate(query_builder)?;
        Ok(Self {
            url,
            name: name.into(),
            rule,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> &RuleNode {
        &self.rule
    }
}

impl TryFrom<RawFilterConfig> for FilterConfig {
    type Error = FilterConfigError;

    fn try_from(raw: RawFilterConfig) -> Result<Self, Self::Error> {
        FilterConfig::new(raw.url, raw.name, &raw.query_builder)
    }
}

// ============================================================================
// Tests
// ============================================================================
