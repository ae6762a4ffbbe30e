//! Glob filtering for listings
//!
//! Used to filter file listings by name. Backup exclusion goes through
//! [`crate::policy`] instead and does not understand globs.

use dotvault_types::{Error, Result};
use regex::Regex;
use std::path::Path;

/// Translate a glob into an anchored regular expression
///
/// `*` becomes `.*`, `?` becomes `.`, and regex metacharacters are escaped.
/// An empty glob matches everything.
pub fn glob_to_regex(glob: &str) -> String {
    if glob.is_empty() {
        return ".*".to_string();
    }

    let mut regex = String::with_capacity(glob.len() * 2 + 2);
    regex.push('^');
    for c in glob.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '.' | '{' | '}' | '(' | ')' | '+' | '^' | '$' | '|' | '\\' | '[' | ']' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }
    regex.push('$');
    regex
}

/// Compiled glob matched against file names
#[derive(Debug, Clone)]
pub struct GlobFilter {
    pattern: String,
    regex: Regex,
}

impl GlobFilter {
    /// Compile a glob
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&glob_to_regex(pattern))
            .map_err(|e| Error::config(format!("Invalid glob '{}': {}", pattern, e)))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The glob this filter was built from
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the file name of `path` matches
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.regex.is_match(name))
    }
}

/// Whether the file name of `path` matches `pattern`
pub fn matches_glob(path: &Path, pattern: &str) -> bool {
    GlobFilter::new(pattern).is_ok_and(|filter| filter.matches(path))
}
