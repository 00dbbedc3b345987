//! Top-level parse drivers.
//!
//! [`MarkupParser`] owns one built grammar and drives whole-document parses
//! plus the isolated fragment entry points. A parser is built once and is
//! safe to share read-only across threads; every parse call gets its own
//! [`ParseContext`] and produces a caller-owned tree.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::config::{AutoLinkMode, ParseOptions};
use crate::engine::context::{CancelToken, ParseContext};
use crate::engine::error::{GrammarError, ParseError};
use crate::engine::matcher::Matcher;
use crate::engine::node::{NonTerminalNode, SyntaxNode, TerminalNode};
use crate::markup::autolink::{self, RelaxTable};
use crate::markup::grammar::MarkupGrammar;

static DEFAULT_PARSER: Lazy<MarkupParser> =
    Lazy::new(|| MarkupParser::new().expect("built-in markup grammar is well-formed"));

/// The shared, optimizer-enabled default parser.
pub fn default_parser() -> &'static MarkupParser {
    &DEFAULT_PARSER
}

/// Parse a document with the shared default parser and a fresh
/// cancellation token.
pub fn parse_document(text: &str, options: &ParseOptions) -> Result<SyntaxNode, ParseError> {
    default_parser().parse(text, options, CancelToken::new())
}

/// A built markup grammar ready to parse documents and fragments.
pub struct MarkupParser {
    markup: MarkupGrammar,
}

impl MarkupParser {
    /// Build with the regex-fusion optimizer enabled.
    pub fn new() -> Result<Self, GrammarError> {
        Self::with_optimizer(true)
    }

    /// Build with the optimizer on or off (off exists for the equivalence
    /// tests and for debugging).
    pub fn with_optimizer(optimize: bool) -> Result<Self, GrammarError> {
        Ok(Self {
            markup: MarkupGrammar::build(optimize)?,
        })
    }

    fn context(&self, options: &ParseOptions, cancel: &CancelToken) -> ParseContext {
        ParseContext::new(Arc::new(options.clone()), cancel.clone())
    }

    /// Parse a whole document into a root node named `document` whose
    /// children cover the entire input with no gaps.
    ///
    /// The document grammar is total: any input yields a tree, so a
    /// failure here is either a cancellation or a grammar defect.
    pub fn parse(
        &self,
        text: &str,
        options: &ParseOptions,
        cancel: CancelToken,
    ) -> Result<SyntaxNode, ParseError> {
        log::debug!("parsing document: {} bytes", text.len());

        if text.is_empty() {
            let doc = NonTerminalNode::new(Vec::new(), 0, Some("document".into()));
            return Ok(SyntaxNode::NonTerminal(doc));
        }
        if options.no_format {
            let leaf = SyntaxNode::Terminal(TerminalNode::named(text, 0, "plainText"));
            let doc = NonTerminalNode::new(vec![leaf], 0, Some("document".into()));
            return Ok(SyntaxNode::NonTerminal(doc));
        }

        let mut ctx = self.context(options, &cancel);
        let matcher = Matcher::new(&self.markup.grammar, text);
        let (end, nodes) = matcher
            .run_rule(self.markup.rules.text, &mut ctx)
            .map_err(ParseError::from)?;
        if end != text.len() {
            return Err(ParseError::NoMatch {
                position: end,
                expected: "end of input".to_string(),
            });
        }

        let mut doc = NonTerminalNode::new(nodes, 0, Some("document".into()));

        if let AutoLinkMode::Relax { words } = &options.auto_link {
            let table = RelaxTable::build(words);
            log::debug!("auto-link pass: {} words", table.len());
            autolink::rewrite(&mut doc, &table, &cancel)?;
        }

        Ok(SyntaxNode::NonTerminal(doc))
    }

    /// Parse a single attribute-like fragment in isolation (used by
    /// autocompletion). Unlike the document grammar this root is not
    /// total: a non-attribute input is an ordinary error.
    pub fn parse_attribute_fragment(
        &self,
        text: &str,
        options: &ParseOptions,
    ) -> Result<SyntaxNode, ParseError> {
        self.parse_fragment(self.markup.rules.attribute_fragment, "attribute", text, options)
    }

    /// Parse one standalone todo-entry fragment (used by the todo
    /// extractor).
    pub fn parse_todo_fragment(
        &self,
        text: &str,
        options: &ParseOptions,
    ) -> Result<SyntaxNode, ParseError> {
        self.parse_fragment(self.markup.rules.todo_fragment, "todoEntry", text, options)
    }

    fn parse_fragment(
        &self,
        rule: crate::engine::grammar::ExprId,
        node_name: &str,
        text: &str,
        options: &ParseOptions,
    ) -> Result<SyntaxNode, ParseError> {
        let cancel = CancelToken::new();
        let mut ctx = self.context(options, &cancel);
        let matcher = Matcher::new(&self.markup.grammar, text);
        let (_, nodes) = matcher.run_rule(rule, &mut ctx).map_err(ParseError::from)?;
        nodes
            .into_iter()
            .find(|n| n.has_name(node_name))
            .ok_or_else(|| ParseError::NoMatch {
                position: 0,
                expected: node_name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::node::AttrValue;

    #[test]
    fn test_empty_document() {
        let doc = parse_document("", &ParseOptions::default()).unwrap();
        assert_eq!(doc.name(), Some("document"));
        assert_eq!(doc.len(), 0);
    }

    #[test]
    fn test_no_format_single_leaf() {
        let options = ParseOptions {
            no_format: true,
            ..ParseOptions::default()
        };
        let doc = parse_document("*not bold*", &options).unwrap();
        let nt = doc.as_non_terminal().unwrap();
        assert_eq!(nt.child_count(), 1);
        assert_eq!(nt.children()[0].name(), Some("plainText"));
        assert_eq!(doc.reconstruct(), "*not bold*");
    }

    #[test]
    fn test_document_covers_input() {
        let input = "+ Title\nsome *bold* text\n";
        let doc = parse_document(input, &ParseOptions::default()).unwrap();
        assert_eq!(doc.reconstruct(), input);
    }

    #[test]
    fn test_attribute_fragment_roundtrip() {
        let parser = MarkupParser::new().unwrap();
        let node = parser
            .parse_attribute_fragment("[tag: important]", &ParseOptions::default())
            .unwrap();
        assert_eq!(
            node.attrs().get("key").and_then(AttrValue::as_str),
            Some("tag")
        );

        assert!(parser
            .parse_attribute_fragment("no brackets", &ParseOptions::default())
            .is_err());
    }

    #[test]
    fn test_todo_fragment_roundtrip() {
        let parser = MarkupParser::new().unwrap();
        let node = parser
            .parse_todo_fragment("todo.home: fix the door", &ParseOptions::default())
            .unwrap();
        assert_eq!(
            node.attrs().get("key").and_then(AttrValue::as_str),
            Some("todo.home")
        );
    }

    #[test]
    fn test_cancelled_before_start() {
        let parser = MarkupParser::new().unwrap();
        let token = CancelToken::new();
        token.cancel();
        let err = parser
            .parse("some text", &ParseOptions::default(), token)
            .unwrap_err();
        assert!(matches!(err, ParseError::Cancelled));
    }
}
