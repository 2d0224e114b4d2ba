//! Regular expressions with named capture groups.
//!
//! Patterns are compiled in multi-line mode so that `^` and `$` anchor at
//! line boundaries inside a log.

use once_cell::sync::Lazy;
use regex::{CaptureMatches, Regex, RegexBuilder};
use std::collections::HashSet;

use crate::error::{Result, TraceError};

/// Matches the opening of a named group, `(?P<name>` or `(?<name>`.
static GROUP_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\?P?<([A-Za-z_][A-Za-z0-9_]*)>").unwrap_or_else(|_| unreachable!())
});

/// A compiled pattern together with the names of its capture groups.
#[derive(Debug, Clone)]
pub struct NamedRegex {
    regex: Regex,
    names: Vec<String>,
}

impl NamedRegex {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::DuplicateGroup`] if a group name repeats and
    /// [`TraceError::InvalidPattern`] if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = match RegexBuilder::new(pattern).multi_line(true).build() {
            Ok(regex) => regex,
            Err(err) => return Err(duplicate_group(pattern).unwrap_or(err.into())),
        };
        let names = regex.capture_names().flatten().map(str::to_string).collect();
        Ok(Self { regex, names })
    }

    /// Returns the group names in pattern order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns true if the pattern defines a group called `name`.
    #[must_use]
    pub fn has_group(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Checks that every group in `required` is defined.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::MissingGroup`] naming the first absent group.
    pub fn require_groups(&self, required: &[&'static str]) -> Result<()> {
        match required.iter().find(|g| !self.has_group(g)) {
            Some(&group) => Err(TraceError::MissingGroup {
                pattern: self.regex.as_str().to_string(),
                group,
            }),
            None => Ok(()),
        }
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns the underlying regex.
    #[must_use]
    pub const fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Iterates over all non-overlapping matches in `text`.
    pub fn captures_iter<'t>(&self, text: &'t str) -> CaptureMatches<'_, 't> {
        self.regex.captures_iter(text)
    }
}

fn duplicate_group(pattern: &str) -> Option<TraceError> {
    let mut seen = HashSet::new();
    GROUP_NAME
        .captures_iter(pattern)
        .filter_map(|c| c.get(1))
        .find(|name| !seen.insert(name.as_str()))
        .map(|name| TraceError::DuplicateGroup {
            group: name.as_str().to_string(),
        })
}
