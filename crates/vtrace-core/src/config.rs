//! Serializable configuration for parsing and graph construction.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::parser::LogParser;

/// Default event pattern: an event line followed by a `host {clock}` line.
///
/// Lines may end in `\n`, `\r\n` or `\r`; the break is never captured.
pub const DEFAULT_PATTERN: &str =
    r"(?P<event>[^\r\n]*)(?:\r\n|\r|\n)(?P<host>\S*) (?P<clock>\{[^\r\n]*\})";

/// How a raw log is cut into executions and events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFormat {
    /// Event pattern with `clock`, `host` and `event` groups
    pub pattern: String,
    /// Optional execution delimiter, may define a `trace` group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN)
    }
}

impl LogFormat {
    /// Creates a format without a delimiter.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            delimiter: None,
        }
    }

    /// Sets the execution delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Compiles both patterns into a parser.
    ///
    /// # Errors
    ///
    /// Returns a pattern error if either pattern is invalid or the event
    /// pattern lacks a required group.
    pub fn parser(&self) -> Result<LogParser> {
        LogParser::from_patterns(&self.pattern, self.delimiter.as_deref())
    }
}

/// What to do when an event observed a clock value no logged event carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSourcePolicy {
    /// Fail graph construction with `MissingCausalSource`
    #[default]
    Error,
    /// Log a warning and keep scanning; the edge may end up a child edge
    FallBackToChild,
}

/// Options for [`CausalGraph`](crate::graph::CausalGraph) construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Handling of unresolvable clock lookups
    #[serde(default)]
    pub missing_source: MissingSourcePolicy,
}

impl GraphConfig {
    /// Returns a config that tolerates truncated logs.
    #[must_use]
    pub const fn lenient() -> Self {
        Self {
            missing_source: MissingSourcePolicy::FallBackToChild,
        }
    }
}
