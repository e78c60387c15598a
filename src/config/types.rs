//! Configuration types.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::matcher::{MarkerRule, TargetMatcher};

use super::ConfigError;

/// Configuration for the watch-and-convert pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory to watch (non-recursive).
    pub directory: PathBuf,
    /// Output CSV. Relative paths resolve inside `directory`.
    pub output: PathBuf,
    /// Required spreadsheet extension, leading dot optional.
    pub extension: String,
    /// Substring a target name must contain.
    pub marker: String,
    /// Compare the marker case-sensitively.
    pub marker_case_sensitive: bool,
    /// Regex that replaces the substring marker when set.
    pub pattern: Option<String>,
    /// Debounce window for filesystem events, in milliseconds.
    pub debounce_ms: u64,
    /// Consecutive output-write failures before raising an alert.
    pub failure_alert_threshold: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            output: PathBuf::from("orders.csv"),
            extension: "xlsx".to_string(),
            marker: "ALINAN".to_string(),
            marker_case_sensitive: true,
            pattern: None,
            debounce_ms: 500,
            failure_alert_threshold: 3,
        }
    }
}

impl WatchConfig {
    /// Reject configurations that can never match anything sensible.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty extension, an empty
    /// marker without a pattern, or a pattern that is not a valid regex.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Invalid("extension must not be empty".into()));
        }
        match &self.pattern {
            Some(pattern) => {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Invalid(format!("invalid pattern {pattern:?}: {e}"))
                })?;
            }
            None if self.marker.is_empty() => {
                return Err(ConfigError::Invalid("marker must not be empty".into()));
            }
            None => {}
        }
        Ok(())
    }

    /// Build the matcher described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn matcher(&self) -> Result<TargetMatcher, ConfigError> {
        self.validate()?;
        let rule = match &self.pattern {
            Some(pattern) => MarkerRule::Pattern(
                Regex::new(pattern).map_err(|e| ConfigError::Invalid(e.to_string()))?,
            ),
            None => MarkerRule::Substring {
                marker: self.marker.clone(),
                case_sensitive: self.marker_case_sensitive,
            },
        };
        Ok(TargetMatcher::new(&self.extension, rule))
    }

    /// Output path with relative values resolved against `directory`.
    #[must_use]
    pub fn output_path_in(&self, directory: &Path) -> PathBuf {
        if self.output.is_absolute() {
            self.output.clone()
        } else {
            directory.join(&self.output)
        }
    }
}
