//! # Pattern Codec
//!
//! Converts between plain textual match specifications and the wire-safe
//! `/body/flags` pattern encoding used by the query translator and the
//! element index.
//!
//! Only strings that satisfy the full grammar `^/(.+)/([gimuy]*)$` are
//! treated as encoded patterns; everything else is a literal. A literal that
//! merely starts with `/` is left alone, never an error.

use crate::error::FraglinkError;
use regex::{Regex, RegexBuilder};

/// Flags accepted by the `/body/flags` grammar.
const PATTERN_FLAGS: &str = "gimuy";

// =============================================================================
// ENCODING
// =============================================================================

/// Encode a literal as a case-insensitive pattern: `/<escaped body>/i`.
///
/// Used by the query-building tools so that category and attribute matching
/// is case-insensitive by default.
#[must_use]
pub fn encode_ci(literal: &str) -> String {
    format!("/{}/i", regex::escape(literal))
}

// =============================================================================
// PARSED PATTERNS
// =============================================================================

/// A textual match specification: either a literal or an encoded pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Exact match on the literal string.
    Literal(String),
    /// Regular-expression pattern with flags, from the `/body/flags` form.
    Encoded { body: String, flags: String },
}

impl Pattern {
    /// Parse a raw string against the `/body/flags` grammar.
    ///
    /// The split point is the last `/`: since `/` is not a flag character,
    /// this is equivalent to the greedy grammar `^/(.+)/([gimuy]*)$`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix('/')
            && let Some(slash) = rest.rfind('/')
        {
            let body = &rest[..slash];
            let flags = &rest[slash + 1..];
            if !body.is_empty() && flags.chars().all(|c| PATTERN_FLAGS.contains(c)) {
                return Self::Encoded {
                    body: body.to_string(),
                    flags: flags.to_string(),
                };
            }
        }
        Self::Literal(raw.to_string())
    }

    /// Render the pattern back to its wire form.
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            Self::Literal(s) => s.clone(),
            Self::Encoded { body, flags } => format!("/{body}/{flags}"),
        }
    }

    /// Compile into a live matcher.
    ///
    /// The `i` and `m` flags map to case-insensitive and multi-line modes;
    /// `g`, `u` and `y` are iteration/encoding flags in the source grammar
    /// and do not change match semantics, so they are accepted and ignored.
    pub fn compile(&self) -> Result<Matcher, FraglinkError> {
        match self {
            Self::Literal(s) => Ok(Matcher::Literal(s.clone())),
            Self::Encoded { body, flags } => {
                let regex = RegexBuilder::new(body)
                    .case_insensitive(flags.contains('i'))
                    .multi_line(flags.contains('m'))
                    .build()
                    .map_err(|e| {
                        FraglinkError::Malformed(format!("invalid pattern body '{body}': {e}"))
                    })?;
                Ok(Matcher::Regex(regex))
            }
        }
    }
}

/// Parse and compile in one step.
pub fn compile(raw: &str) -> Result<Matcher, FraglinkError> {
    Pattern::parse(raw).compile()
}

// =============================================================================
// COMPILED MATCHERS
// =============================================================================

/// A compiled match specification ready to run against index text.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Literal comparison (exact match, per index semantics).
    Literal(String),
    /// Compiled regular expression (substring search semantics).
    Regex(Regex),
}

impl Matcher {
    /// Test a candidate string.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Literal(s) => s == text,
            Self::Regex(re) => re.is_match(text),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
