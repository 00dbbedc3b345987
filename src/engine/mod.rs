//! The generic backtracking parser-combinator engine.
//!
//! Everything in this module is grammar-agnostic: the syntax tree model,
//! the parse-time context, the expression arena with its builder, the
//! match engine and the regex-fusion optimizer. The wiki-markup grammar
//! built on top lives in [`crate::markup`].
//!
//! # Module organization
//!
//! - [`node`] - terminal/non-terminal syntax tree with lazy lengths and an
//!   open attribute bag
//! - [`context`] - copy-on-write scope stack, rule-name stack, cancellation
//! - [`grammar`] - expression arena, action attachment, grammar builder
//! - [`matcher`] - the recursive backtracking match engine
//! - [`fusion`] - merges regex-expressible alternatives into single scans
//! - [`regex_cache`] - thread-local compiled-pattern cache
//! - [`error`] - miss/fatal/cancelled taxonomy and build-time errors

pub mod context;
pub mod error;
pub mod fusion;
pub mod grammar;
pub mod matcher;
pub mod node;
pub mod regex_cache;

pub use context::{CancelToken, IndentInfo, IndentKind, ParseContext, ScopeStack, ScopeValue};
pub use error::{Failure, GrammarError, MatchFail, ParseError};
pub use fusion::{FusedScan, RegexFlags};
pub use grammar::{
    ActionOutcome, ExprId, ExprKind, ExprMeta, Grammar, GrammarBuilder, PickAction, PostAction,
    PreAction, ValidateAction,
};
pub use matcher::{MatchOutcome, Matcher};
pub use node::{AttrMap, AttrValue, NonTerminalNode, SyntaxNode, TerminalNode};
