//! Failure taxonomy for the combinator engine.
//!
//! Three kinds of conditions travel through the match path:
//!
//! - [`MatchFail::Miss`] - the ordinary backtracking signal. Handled locally
//!   by whichever combinator can try an alternative; never crosses the
//!   driver boundary raw.
//! - [`MatchFail::Fatal`] - raised by a validator to reject an alternative
//!   outright. Sequences, repetitions and scans pass it through; the nearest
//!   enclosing ordered choice catches it, drops that alternative and moves
//!   on without retrying it.
//! - [`MatchFail::Cancelled`] - cooperative abort, unwinds the whole parse.
//!
//! Grammar construction has its own error type ([`GrammarError`]) so that a
//! malformed grammar is reported at build time and can never surface during
//! a parse.

use std::sync::Arc;
use thiserror::Error;

/// A recoverable or fatal match failure with best-effort diagnostics.
///
/// `position` is the furthest byte offset the failing combinator reached,
/// `expected` a short label of the construct that was being tried. Ordered
/// choice keeps only the failure with the greatest position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Byte offset the match attempt failed at.
    pub position: usize,
    /// Label of the expected construct.
    pub expected: Arc<str>,
}

impl Failure {
    /// Create a failure at the given position.
    pub fn new(position: usize, expected: impl Into<Arc<str>>) -> Self {
        Self {
            position,
            expected: expected.into(),
        }
    }
}

/// Control-flow signal of a failed `try_match`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchFail {
    /// Recoverable failure, triggers backtracking in the parent combinator.
    Miss(Failure),
    /// Validator rejection; caught only by the nearest ordered choice.
    Fatal(Failure),
    /// The cancellation token was flipped.
    Cancelled,
}

impl MatchFail {
    /// Recoverable failure at `position`.
    pub fn miss(position: usize, expected: impl Into<Arc<str>>) -> Self {
        MatchFail::Miss(Failure::new(position, expected))
    }

    /// Fatal failure at `position`.
    pub fn fatal(position: usize, expected: impl Into<Arc<str>>) -> Self {
        MatchFail::Fatal(Failure::new(position, expected))
    }

    /// The failure payload, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            MatchFail::Miss(f) | MatchFail::Fatal(f) => Some(f),
            MatchFail::Cancelled => None,
        }
    }

    /// True for the recoverable variant.
    pub fn is_miss(&self) -> bool {
        matches!(self, MatchFail::Miss(_))
    }
}

/// Error raised while assembling or finalizing a grammar.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// A pattern failed to compile with the `regex` crate.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending pattern source.
        pattern: String,
        /// Compile error from the regex engine.
        source: regex::Error,
    },

    /// A forward-reference cell was bound a second time.
    #[error("forward reference #{0} bound twice")]
    DoubleBind(usize),

    /// A forward-reference cell was never bound before `build`.
    #[error("forward reference #{0} never bound")]
    UnboundForward(usize),
}

/// Error reported by the top-level drivers.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The root rule could not consume the input; carries the single
    /// deepest failure observed while trying alternatives.
    #[error("no match at offset {position}: expected {expected}")]
    NoMatch {
        /// Furthest byte offset reached.
        position: usize,
        /// Label of the deepest expected construct.
        expected: String,
    },

    /// The parse was aborted through the cancellation token.
    #[error("parse cancelled")]
    Cancelled,
}

impl From<MatchFail> for ParseError {
    fn from(fail: MatchFail) -> Self {
        match fail {
            MatchFail::Miss(f) | MatchFail::Fatal(f) => ParseError::NoMatch {
                position: f.position,
                expected: f.expected.to_string(),
            },
            MatchFail::Cancelled => ParseError::Cancelled,
        }
    }
}
