// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use regex::RegexSet;

use crate::errors::{KeepTestingError, Result};

/// Compiled ignore rules.
///
/// Each pattern is a regular expression that must match the *whole* absolute
/// path of an entry, e.g. `.*\.log` ignores `/tmp/proj/src/x.log` but
/// `\.log` ignores nothing. Patterns are wrapped in `\A(?:...)\z` so a
/// pattern never matches a substring.
#[derive(Clone)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    set: RegexSet,
}

impl fmt::Debug for IgnoreSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            set: RegexSet::empty(),
        }
    }
}

impl IgnoreSet {
    /// Compile the given patterns, failing with a configuration error naming
    /// the first invalid one.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();

        for pat in &patterns {
            regex::Regex::new(&anchored(pat)).map_err(|err| {
                KeepTestingError::config(format!("invalid ignore pattern {pat:?}: {err}"))
            })?;
        }

        let set = RegexSet::new(patterns.iter().map(|p| anchored(p)))
            .map_err(|err| KeepTestingError::config(format!("invalid ignore patterns: {err}")))?;

        Ok(Self { patterns, set })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True if any pattern matches the full textual form of `path`.
    pub fn is_ignored(&self, path: &Path) -> bool {
        !self.is_empty() && self.set.is_match(&path.to_string_lossy())
    }
}

fn anchored(pattern: &str) -> String {
    format!(r"\A(?:{pattern})\z")
}
