//! Convenient single-line import for common usage.
//!
//! ```
//! use wikimark::prelude::*;
//!
//! let doc = parse_document("hello *world*\n", &ParseOptions::default()).unwrap();
//! assert!(doc.as_non_terminal().is_some());
//! ```

pub use crate::config::{AutoLinkMode, ParseOptions};
pub use crate::driver::{default_parser, parse_document, MarkupParser};
pub use crate::engine::context::{CancelToken, ParseContext};
pub use crate::engine::error::{GrammarError, ParseError};
pub use crate::engine::grammar::{Grammar, GrammarBuilder};
pub use crate::engine::matcher::Matcher;
pub use crate::engine::node::{AttrValue, NonTerminalNode, SyntaxNode, TerminalNode};
pub use crate::markup::grammar::MarkupGrammar;
