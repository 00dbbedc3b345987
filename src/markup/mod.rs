//! The wiki-markup grammar built on the combinator engine.
//!
//! - [`grammar`] - the rule graph (headings, lists, tables, emphasis,
//!   links, attributes, ...)
//! - [`actions`] - validators and semantic actions the rules attach
//! - [`link`] - wiki link-path resolution
//! - [`autolink`] - the post-parse auto-link rewrite pass

pub mod actions;
pub mod autolink;
pub mod grammar;
pub mod link;

pub use autolink::RelaxTable;
pub use grammar::{markup_flags, MarkupGrammar, MarkupRules};
pub use link::{resolve as resolve_link, LinkError};
