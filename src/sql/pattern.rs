use std::fmt;

use crate::error::{DbError, DbResult};

/// Maximum allowed pattern length
const MAX_PATTERN_LEN: usize = 1024;

/// Maximum compiled regex size (1MB)
const MAX_REGEX_SIZE: usize = 1 << 20;

/// Key-space pattern from a FROM clause.
///
/// This is a regular expression, not a glob: `user:*` means "user" followed
/// by any number of colons. Matching is case-sensitive, unanchored unless
/// the pattern uses `^`/`$`, and `^`/`$` also match at line boundaries.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: regex::Regex,
}

impl Pattern {
    /// Compile a pattern. Fails before any store access on a bad expression.
    pub fn compile(source: &str) -> DbResult<Self> {
        if source.len() > MAX_PATTERN_LEN {
            return Err(DbError::PatternCompileError(format!(
                "pattern too long: {} bytes (max {})",
                source.len(),
                MAX_PATTERN_LEN
            )));
        }

        let regex = regex::RegexBuilder::new(source)
            .multi_line(true)
            .size_limit(MAX_REGEX_SIZE)
            .build()
            .map_err(|e| DbError::PatternCompileError(e.to_string()))?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
