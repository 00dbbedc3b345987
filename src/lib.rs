//! Wikimark - a backtracking parser-combinator engine and the
//! context-sensitive wiki-markup grammar built on top of it.
//!
//! The crate has two layers:
//!
//! - [`engine`] - a general-purpose recursive-descent/backtracking
//!   combinator engine: a syntax-tree model with lazily computed lengths,
//!   a copy-on-write parse context with an active-rule name stack and
//!   cooperative cancellation, and a regex-fusion optimizer that merges
//!   regex-expressible alternatives into single native scans.
//! - [`markup`] - the line-oriented lightweight-markup grammar (headings,
//!   lists, tables, inline emphasis, links, attributes) expressed entirely
//!   through the engine's combinators, plus the auto-link rewrite pass.
//!
//! A grammar is built once and shared read-only across threads; each parse
//! call owns its context and its resulting tree.
//!
//! # Quick start
//!
//! ```
//! use wikimark::{parse_document, ParseOptions};
//!
//! let doc = parse_document("+ Title\nsome *bold* text\n", &ParseOptions::default()).unwrap();
//! assert_eq!(doc.name(), Some("document"));
//! // The tree is lossless at the terminal level.
//! assert_eq!(doc.reconstruct(), "+ Title\nsome *bold* text\n");
//! ```
//!
//! # Cancellation
//!
//! ```
//! use wikimark::{CancelToken, MarkupParser, ParseOptions};
//!
//! let parser = MarkupParser::new().unwrap();
//! let token = CancelToken::new();
//! token.cancel();
//! assert!(parser.parse("text", &ParseOptions::default(), token).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod driver;
pub mod engine;
pub mod markup;
pub mod prelude;

pub use config::{AutoLinkMode, ParseOptions};
pub use driver::{default_parser, parse_document, MarkupParser};
pub use engine::{
    AttrMap, AttrValue, CancelToken, Failure, Grammar, GrammarBuilder, GrammarError, IndentInfo,
    IndentKind, MatchFail, Matcher, NonTerminalNode, ParseContext, ParseError, RegexFlags,
    SyntaxNode, TerminalNode,
};
pub use markup::{MarkupGrammar, RelaxTable};
