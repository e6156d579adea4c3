//! Compilation of filter terms into matchable predicates.
//!
//! Text terms become a [`TextPattern`]: either the user's own regular
//! expression (in regex mode) or the term escaped so that every character
//! matches literally. Both kinds are compiled multi-line and Unicode-aware,
//! with case sensitivity fixed at compile time. Date terms become a
//! [`DateRange`] of locally encoded timestamps.

use crate::date::{pad_digits, DateNormalizer, MAX_TIMESTAMP, MIN_TIMESTAMP};
use crate::error::ParseError;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::LazyLock;

/// `[since][-[until]]`, each side 0 to 17 ASCII digits.
static DATE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{0,17})(?:-([0-9]{0,17}))?$").expect("valid date range regex")
});

/// Lazy DFA cache budget per byte of an escaped literal.
const LITERAL_DFA_BYTES: usize = 256;

/// The `regex` crate's own lazy DFA cache default.
const DEFAULT_DFA_SIZE: usize = 2 * (1 << 20);

/// How a literal term is matched against field text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The term may occur anywhere in the text
    Substring,

    /// The term must span the whole text (or a whole line of it)
    Exact,
}

/// Flags in effect when a term is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternFlags {
    /// Match case exactly (`mc:`)
    pub case_sensitive: bool,

    /// Treat terms as regular expressions (`re:`)
    pub use_regex: bool,
}

/// A compiled text predicate.
#[derive(Clone)]
pub struct TextPattern {
    regex: Regex,
    case_sensitive: bool,
}

impl TextPattern {
    /// Compile a term under the given flags.
    ///
    /// In regex mode the term is used as written and `mode` is ignored;
    /// otherwise it is escaped, and anchored for [`MatchMode::Exact`].
    pub fn compile(term: &str, mode: MatchMode, flags: PatternFlags) -> Result<Self, ParseError> {
        let source = if flags.use_regex {
            term.to_string()
        } else {
            let escaped = regex::escape(term);
            match mode {
                MatchMode::Substring => escaped,
                MatchMode::Exact => format!("^{}$", escaped),
            }
        };

        let mut builder = RegexBuilder::new(&source);
        builder
            .case_insensitive(!flags.case_sensitive)
            .multi_line(true)
            .unicode(true);
        if !flags.use_regex {
            // Escaped text has no repetition, so its program grows only
            // linearly with the term and may exceed the default limits.
            let dfa_size = source
                .len()
                .saturating_mul(LITERAL_DFA_BYTES)
                .max(DEFAULT_DFA_SIZE);
            builder.size_limit(usize::MAX).dfa_size_limit(dfa_size);
        }

        let regex = builder
            .build()
            .map_err(|e| ParseError::InvalidRegularExpression {
                term: term.to_string(),
                reason: e.to_string(),
            })?;

        Ok(TextPattern {
            regex,
            case_sensitive: flags.case_sensitive,
        })
    }

    /// Shorthand for a literal substring pattern.
    pub fn substring(term: &str, case_sensitive: bool) -> Result<Self, ParseError> {
        let flags = PatternFlags {
            case_sensitive,
            use_regex: false,
        };
        Self::compile(term, MatchMode::Substring, flags)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Whether this pattern was compiled case-sensitively
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// The regular expression source the pattern was built from
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl fmt::Debug for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextPattern")
            .field("regex", &self.as_str())
            .field("case_sensitive", &self.case_sensitive)
            .finish()
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = if self.case_sensitive { "m" } else { "im" };
        write!(f, "/{}/{}", self.as_str(), flags)
    }
}

/// An inclusive range of locally encoded timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub since: String,
    pub until: String,
}

impl DateRange {
    pub fn contains(&self, timestamp: &str) -> bool {
        self.since.as_str() <= timestamp && timestamp <= self.until.as_str()
    }

    /// Parse a `[since][-[until]]` term.
    ///
    /// A present side is right-padded with zeros and converted from UTC into
    /// the normalizer's zone. A missing start is the smallest timestamp and a
    /// missing end the largest; those bounds are used as-is.
    pub fn parse(term: &str, normalizer: &DateNormalizer) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidDateRange {
            term: term.to_string(),
        };
        let caps = DATE_RANGE.captures(term).ok_or_else(invalid)?;

        let bound = |index: usize, default: &str| -> Result<String, ParseError> {
            match caps.get(index).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
                Some(digits) => normalizer
                    .utc_to_local(&pad_digits(digits, '0'))
                    .ok_or_else(invalid),
                None => Ok(default.to_string()),
            }
        };

        Ok(DateRange {
            since: bound(1, MIN_TIMESTAMP)?,
            until: bound(2, MAX_TIMESTAMP)?,
        })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.since, self.until)
    }
}
