//! Validators and actions of the markup grammar.
//!
//! Pre-match validators veto before input is consumed (configuration
//! gates, forbidden-nesting checks, indentation preconditions). Post-match
//! validators veto an already-produced node (indentation comparisons, the
//! fatal quote-mismatch check). Post-match actions annotate nodes with
//! their documented attributes or rewrite them (trailing-whitespace
//! trimming, hiding empty matches).

use std::sync::Arc;

use crate::engine::context::{IndentInfo, IndentKind, ScopeValue};
use crate::engine::error::MatchFail;
use crate::engine::grammar::{ActionOutcome, ExprId, PickAction, PostAction, PreAction, ValidateAction};
use crate::engine::node::{AttrValue, SyntaxNode, TerminalNode};
use crate::markup::link;

/// Hide a zero-length match entirely.
pub fn hide_on_empty() -> PostAction {
    Arc::new(|_s, _l, _ctx, node| {
        if node.is_empty() {
            Ok(ActionOutcome::Replace(Vec::new()))
        } else {
            Ok(ActionOutcome::Keep(node))
        }
    })
}

/// Name the accumulated text of a scan, hiding empty accumulations.
pub fn pseudo_named(name: &'static str) -> PostAction {
    let name: Arc<str> = name.into();
    Arc::new(move |_s, _l, _ctx, mut node| {
        if node.is_empty() {
            return Ok(ActionOutcome::Replace(Vec::new()));
        }
        node.set_name(name.clone());
        Ok(ActionOutcome::Keep(node))
    })
}

/// Plain-text pseudo action of the content scans.
pub fn pseudo_plain_text() -> PostAction {
    pseudo_named("plainText")
}

/// Reject when the current rule is nested inside another rule of the same
/// name (e.g. bold inside bold).
pub fn check_not_nested(name: &'static str) -> PreAction {
    Arc::new(move |_s, l, ctx| {
        if ctx.nested_within(name) {
            Err(MatchFail::miss(
                l,
                format!("token '{}' is not allowed here", name),
            ))
        } else {
            Ok(())
        }
    })
}

/// The matched token must be directly followed by a non-whitespace char.
pub fn next_char_not_space() -> ValidateAction {
    Arc::new(|s: &str, _l, _ctx, node: &SyntaxNode| {
        let end = node.pos() + node.len();
        match s[end..].chars().next() {
            Some(c) if !c.is_whitespace() => Ok(()),
            _ => Err(MatchFail::miss(end, "non-whitespace content")),
        }
    })
}

/// The matched token must not be directly followed by `ch`.
pub fn not_followed_by(ch: char) -> ValidateAction {
    Arc::new(move |s: &str, _l, _ctx, node: &SyntaxNode| {
        let end = node.pos() + node.len();
        if s[end..].starts_with(ch) {
            Err(MatchFail::miss(end, format!("no further `{}`", ch)))
        } else {
            Ok(())
        }
    })
}

/// The matched token must not sit directly before a newline (keeps the
/// indentation rules off blank lines).
pub fn not_before_newline() -> ValidateAction {
    not_followed_by('\n')
}

/// Block markup may only start where the line holds nothing but
/// whitespace to its left.
pub fn nothing_left() -> PreAction {
    Arc::new(|s: &str, l, _ctx| {
        let line_start = s[..l].rfind('\n').map(|i| i + 1).unwrap_or(0);
        if s[line_start..l].bytes().all(|b| b == b' ' || b == b'\t') {
            Ok(())
        } else {
            Err(MatchFail::miss(l, "blank line start before block markup"))
        }
    })
}

/// Gate a newline interpretation on the paragraph-mode option.
pub fn require_paragraph_mode(required: bool) -> PreAction {
    Arc::new(move |_s, l, ctx| {
        if ctx.options.paragraph_mode == required {
            Ok(())
        } else if required {
            Err(MatchFail::miss(l, "paragraph mode"))
        } else {
            Err(MatchFail::miss(l, "line-break mode"))
        }
    })
}

/// Record a line indentation of zero for the following sibling rules.
pub fn reset_indent() -> PostAction {
    Arc::new(|_s, _l, ctx, node| {
        ctx.scopes.set_outer("lastIndentation", ScopeValue::Usize(0));
        Ok(ActionOutcome::Keep(node))
    })
}

/// Record the matched indentation width for the following sibling rules.
pub fn record_indent() -> PostAction {
    Arc::new(|_s, _l, ctx, node| {
        ctx.scopes
            .set_outer("lastIndentation", ScopeValue::Usize(node.len()));
        Ok(ActionOutcome::Keep(node))
    })
}

/// Entering a more-indented plain block: record the width and push a
/// normal-kind indentation record for the block's content.
pub fn more_indent() -> PostAction {
    Arc::new(|_s, _l, ctx, node| {
        let level = node.len();
        ctx.scopes
            .set_outer("lastIndentation", ScopeValue::Usize(level));
        ctx.scopes
            .set_outer("indentInfo", ScopeValue::Indent(IndentInfo::normal(level)));
        Ok(ActionOutcome::Keep(node))
    })
}

fn active_indent(ctx: &crate::engine::context::ParseContext) -> IndentInfo {
    ctx.scopes.indent_info().unwrap_or(IndentInfo::normal(0))
}

/// Strictly more indentation than the innermost active record.
pub fn validate_more_indent() -> ValidateAction {
    Arc::new(|_s, l, ctx, node: &SyntaxNode| {
        if node.len() <= active_indent(ctx).level {
            Err(MatchFail::miss(l, "more indentation"))
        } else {
            Ok(())
        }
    })
}

/// Exactly the indentation of the innermost active record.
pub fn validate_equal_indent() -> ValidateAction {
    Arc::new(|_s, l, ctx, node: &SyntaxNode| {
        let level = active_indent(ctx).level;
        if node.len() > level {
            Err(MatchFail::miss(l, "equal indentation, but more found"))
        } else if node.len() < level {
            Err(MatchFail::miss(l, "equal indentation, but less found"))
        } else {
            Ok(())
        }
    })
}

/// Strictly less indentation than the innermost active record.
pub fn validate_less_indent() -> ValidateAction {
    Arc::new(|_s, l, ctx, node: &SyntaxNode| {
        if node.len() >= active_indent(ctx).level {
            Err(MatchFail::miss(l, "less indentation"))
        } else {
            Ok(())
        }
    })
}

/// Equal-or-more indentation; "more" only inside list blocks.
pub fn validate_equival_indent() -> ValidateAction {
    Arc::new(|_s, l, ctx, node: &SyntaxNode| {
        let info = active_indent(ctx);
        if node.len() > info.level && info.kind == IndentKind::Normal {
            Err(MatchFail::miss(l, "equivalent indentation, but more found"))
        } else if node.len() < info.level {
            Err(MatchFail::miss(l, "equivalent indentation, but less found"))
        } else {
            Ok(())
        }
    })
}

/// The innermost indentation record must be of normal kind.
pub fn require_inmost_normal() -> PreAction {
    Arc::new(|_s, l, ctx| {
        if active_indent(ctx).kind == IndentKind::Normal {
            Ok(())
        } else {
            Err(MatchFail::miss(l, "normal indentation block"))
        }
    })
}

/// The innermost indentation record must belong to the given list kind.
pub fn require_inmost_kind(kind: IndentKind) -> PreAction {
    Arc::new(move |_s, l, ctx| {
        if active_indent(ctx).kind == kind {
            Ok(())
        } else {
            Err(MatchFail::miss(l, "matching list kind"))
        }
    })
}

/// Indentation in front of a list start: siblings of the enclosing block
/// are only valid list starts when the block is of normal kind; nesting
/// always needs strictly more indentation.
pub fn list_start_indent() -> PostAction {
    Arc::new(|_s, l, ctx, node| {
        let info = active_indent(ctx);
        let width = node.len();
        if width < info.level || (width == info.level && info.kind != IndentKind::Normal) {
            return Err(MatchFail::miss(l, "list start indentation"));
        }
        ctx.scopes
            .set_outer("lastIndentation", ScopeValue::Usize(width));
        Ok(ActionOutcome::Keep(node))
    })
}

/// Entering a list: push a list-kind indentation record at the recorded
/// start indentation.
pub fn prepare_list(kind: IndentKind) -> PreAction {
    Arc::new(move |_s, _l, ctx| {
        let level = ctx.scopes.last_indentation();
        ctx.scopes
            .set("indentInfo", ScopeValue::Indent(IndentInfo { level, kind }));
        Ok(())
    })
}

/// The matched node must cover at least one byte.
pub fn validate_non_empty() -> ValidateAction {
    Arc::new(|_s, l, _ctx, node: &SyntaxNode| {
        if node.is_empty() {
            Err(MatchFail::miss(l, "non-empty content"))
        } else {
            Ok(())
        }
    })
}

/// Annotate a heading with its level (number of `+` marker chars).
///
/// Writes: `level` (Int).
pub fn heading() -> PostAction {
    Arc::new(|_s, l, _ctx, mut node| {
        let level = node
            .as_non_terminal()
            .and_then(|nt| nt.child(0))
            .and_then(|c| c.as_terminal())
            .map(|t| t.text.len());
        let level = match level {
            Some(n) => n,
            None => return Err(MatchFail::miss(l, "heading marker")),
        };
        if node
            .as_non_terminal()
            .and_then(|nt| nt.find_flat_by_name("headingContent"))
            .is_none()
        {
            return Err(MatchFail::miss(l, "heading content"));
        }
        node.attrs_mut().set("level", AttrValue::Int(level as i64));
        Ok(ActionOutcome::Keep(node))
    })
}

/// Annotate a todo entry.
///
/// Writes: `key` (Str), `key_components` (List of Str), `delimiter` (Str).
pub fn todo_entry() -> PostAction {
    Arc::new(|_s, l, _ctx, mut node| {
        let (key, delimiter) = {
            let nt = match node.as_non_terminal() {
                Some(nt) => nt,
                None => return Err(MatchFail::miss(l, "todo entry")),
            };
            let key = match nt.find_flat_by_name("key") {
                Some(k) => k.reconstruct(),
                None => return Err(MatchFail::miss(l, "todo key")),
            };
            let delimiter = nt
                .find_flat_by_name("todoDelimiter")
                .map(|d| d.reconstruct())
                .unwrap_or_else(|| ":".to_string());
            (key, delimiter)
        };
        let components: Vec<AttrValue> = key
            .split('.')
            .map(|part| AttrValue::Str(part.to_string()))
            .collect();
        let attrs = node.attrs_mut();
        attrs.set("key", AttrValue::Str(key));
        attrs.set("key_components", AttrValue::List(components));
        attrs.set("delimiter", AttrValue::Str(delimiter));
        Ok(ActionOutcome::Keep(node))
    })
}

/// Remember the opening quote run of an attribute/insertion value.
pub fn quote_start() -> PostAction {
    Arc::new(|_s, _l, ctx, node| {
        if let Some(t) = node.as_terminal() {
            ctx.scopes
                .set_outer("attrQuote", ScopeValue::Str(t.text.as_str().into()));
        }
        Ok(ActionOutcome::Keep(node))
    })
}

/// The closing quote run must equal the opening one; a mismatch is a
/// fatal rejection of the whole quoted-value alternative.
pub fn quote_end_matches() -> ValidateAction {
    Arc::new(|_s, l, ctx, node: &SyntaxNode| {
        let expected = match ctx.scopes.get("attrQuote") {
            Some(ScopeValue::Str(q)) => q.clone(),
            _ => return Err(MatchFail::fatal(l, "opening quote")),
        };
        let got = node.as_terminal().map(|t| t.text.as_str()).unwrap_or("");
        if got == &*expected {
            Ok(())
        } else {
            Err(MatchFail::fatal(
                l,
                "end quote matching the start quote",
            ))
        }
    })
}

/// Annotate an attribute.
///
/// Writes: `key` (Str), `attrs` (List of `[key, value]` pairs).
pub fn attribute() -> PostAction {
    Arc::new(|_s, l, _ctx, mut node| {
        let (key, values) = {
            let nt = match node.as_non_terminal() {
                Some(nt) => nt,
                None => return Err(MatchFail::miss(l, "attribute")),
            };
            let key = match nt.find_flat_by_name("key") {
                Some(k) => k.reconstruct(),
                None => return Err(MatchFail::miss(l, "attribute key")),
            };
            let values: Vec<String> = nt
                .iter_flat_by_name("value")
                .map(|v| v.reconstruct())
                .collect();
            (key, values)
        };
        let pairs: Vec<AttrValue> = values
            .into_iter()
            .map(|v| {
                AttrValue::List(vec![
                    AttrValue::Str(key.clone()),
                    AttrValue::Str(v),
                ])
            })
            .collect();
        let attrs = node.attrs_mut();
        attrs.set("key", AttrValue::Str(key));
        attrs.set("attrs", AttrValue::List(pairs));
        Ok(ActionOutcome::Keep(node))
    })
}

/// Annotate an insertion.
///
/// Writes: `key` (Str), `value` (Str), `appendices` (List of Str).
pub fn insertion() -> PostAction {
    Arc::new(|_s, l, _ctx, mut node| {
        let (key, mut values) = {
            let nt = match node.as_non_terminal() {
                Some(nt) => nt,
                None => return Err(MatchFail::miss(l, "insertion")),
            };
            let key = match nt.find_flat_by_name("key") {
                Some(k) => k.reconstruct(),
                None => return Err(MatchFail::miss(l, "insertion key")),
            };
            let values: Vec<String> = nt
                .iter_flat_by_name("value")
                .map(|v| v.reconstruct())
                .collect();
            (key, values)
        };
        if values.is_empty() {
            return Err(MatchFail::miss(l, "insertion value"));
        }
        let value = values.remove(0);
        let appendices: Vec<AttrValue> = values.into_iter().map(AttrValue::Str).collect();
        let attrs = node.attrs_mut();
        attrs.set("key", AttrValue::Str(key));
        attrs.set("value", AttrValue::Str(value));
        attrs.set("appendices", AttrValue::List(appendices));
        Ok(ActionOutcome::Keep(node))
    })
}

/// Trim trailing whitespace off a matched word, re-emitting it as a
/// separate plain-text token so the tree stays lossless.
pub fn cut_right_whitespace() -> PostAction {
    Arc::new(|_s, _l, _ctx, node| {
        let terminal = match &node {
            SyntaxNode::Terminal(t) => t,
            SyntaxNode::NonTerminal(_) => return Ok(ActionOutcome::Keep(node)),
        };
        let trimmed = terminal.text.trim_end_matches([' ', '\t', '\n', '\r']);
        if trimmed.len() == terminal.text.len() || trimmed.is_empty() {
            return Ok(ActionOutcome::Keep(node));
        }
        let tail = TerminalNode::new(
            terminal.text[trimmed.len()..].to_string(),
            terminal.pos + trimmed.len(),
        );
        let mut word = terminal.clone();
        word.text.truncate(trimmed.len());
        Ok(ActionOutcome::Replace(vec![
            SyntaxNode::Terminal(word),
            SyntaxNode::Terminal(tail),
        ]))
    })
}

/// Resolve backslash escapes of a search fragment into an `unescaped`
/// attribute.
pub fn unescape_fragment() -> PostAction {
    Arc::new(|_s, _l, _ctx, mut node| {
        if !node.is_terminal() {
            return Ok(ActionOutcome::Keep(node));
        }
        let unescaped = {
            let text = node.as_terminal().map(|t| t.text.as_str()).unwrap_or("");
            let mut out = String::with_capacity(text.len());
            let mut chars = text.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else {
                    out.push(c);
                }
            }
            out
        };
        node.attrs_mut().set("unescaped", AttrValue::Str(unescaped));
        Ok(ActionOutcome::Keep(node))
    })
}

fn annotate_wiki_word(
    node: &mut SyntaxNode,
    l: usize,
    base: &str,
) -> Result<(), MatchFail> {
    let (core, title, fragment, anchor) = {
        let nt = match node.as_non_terminal() {
            Some(nt) => nt,
            None => return Err(MatchFail::miss(l, "wiki word")),
        };
        let core = match nt.find_flat_by_name("word") {
            Some(w) => w.reconstruct(),
            None => return Err(MatchFail::miss(l, "wiki word core")),
        };
        let title = nt.find_flat_by_name("title").map(|t| t.reconstruct());
        let fragment = nt.find_flat_by_name("searchFragment").map(|f| {
            f.attrs()
                .get("unescaped")
                .and_then(AttrValue::as_str)
                .map(|s| s.to_string())
                .unwrap_or_else(|| f.reconstruct())
        });
        let anchor = nt.find_flat_by_name("anchorLink").map(|a| a.reconstruct());
        (core, title, fragment, anchor)
    };

    let target = link::resolve(&core, base)
        .map_err(|_| MatchFail::miss(l, "resolvable link path"))?;

    let attrs = node.attrs_mut();
    attrs.set("link_core", AttrValue::Str(core));
    attrs.set("target_path", AttrValue::Str(target));
    if let Some(title) = title {
        attrs.set("display_title", AttrValue::Str(title));
    }
    if let Some(fragment) = fragment {
        attrs.set("search_fragment", AttrValue::Str(fragment));
    }
    if let Some(anchor) = anchor {
        attrs.set("anchor", AttrValue::Str(anchor));
    }
    Ok(())
}

/// Annotate a bracketed wiki-word link.
///
/// Writes: `link_core`, `target_path`, `display_title?`,
/// `search_fragment?`, `anchor?`.
pub fn wiki_word_ncc() -> PostAction {
    Arc::new(|_s, l, ctx, mut node| {
        let base = ctx.options.base_document_path.clone();
        annotate_wiki_word(&mut node, l, &base)?;
        Ok(ActionOutcome::Keep(node))
    })
}

/// CamelCase links are configuration-gated.
pub fn camel_case_allowed() -> PreAction {
    Arc::new(|_s, l, ctx| {
        if ctx.options.camel_case_links {
            Ok(())
        } else {
            Err(MatchFail::miss(l, "CamelCase links enabled"))
        }
    })
}

/// A `~` directly in front of a CamelCase word escapes it.
pub fn no_tilde_before() -> PreAction {
    Arc::new(|s: &str, l, _ctx| {
        if s[..l].ends_with('~') {
            Err(MatchFail::miss(l, "unescaped CamelCase word"))
        } else {
            Ok(())
        }
    })
}

/// Annotate a bare CamelCase wiki-word link. Same keys as the bracketed
/// form, never a display title.
pub fn wiki_word_cc() -> PostAction {
    wiki_word_ncc()
}

/// Collect appendix entries into an `entries` attribute.
///
/// Writes: `entries` (List of `[key, data]` pairs).
pub fn mode_appendix() -> PostAction {
    Arc::new(|_s, _l, _ctx, mut node| {
        let entries: Option<Vec<AttrValue>> = node.as_non_terminal().map(|nt| {
            let mut entries = Vec::new();
            for entry in nt.iter_flat_by_name("entry") {
                let entry_nt = match entry.as_non_terminal() {
                    Some(e) => e,
                    None => continue,
                };
                let key = entry_nt
                    .find_flat_by_name("key")
                    .map(|k| k.reconstruct())
                    .unwrap_or_default();
                let key = key.trim_end_matches(['=', ':']).to_string();
                let data = entry_nt
                    .find_flat_by_name("data")
                    .map(|d| d.reconstruct())
                    .unwrap_or_default();
                entries.push(AttrValue::List(vec![
                    AttrValue::Str(key),
                    AttrValue::Str(data),
                ]));
            }
            entries
        });
        if let Some(entries) = entries {
            node.attrs_mut().set("entries", AttrValue::List(entries));
        }
        Ok(ActionOutcome::Keep(node))
    })
}

/// Annotate a URL link and normalize its node name.
///
/// Writes: `url` (Str), `bracketed` (Bool), `display_title?` (Str),
/// `appendix?` (List of `[key, data]` pairs).
pub fn url_link(bracketed: bool) -> PostAction {
    Arc::new(move |_s, l, _ctx, mut node| {
        let (url, title, appendix) = {
            let nt = match node.as_non_terminal() {
                Some(nt) => nt,
                None => return Err(MatchFail::miss(l, "url link")),
            };
            let url = match nt.find_flat_by_name("url") {
                Some(u) => u.reconstruct(),
                None => return Err(MatchFail::miss(l, "url")),
            };
            let title = nt.find_flat_by_name("title").map(|t| t.reconstruct());
            let appendix = nt
                .find_flat_by_name("urlModeAppendix")
                .and_then(|a| a.attrs().get("entries").cloned());
            (url, title, appendix)
        };
        node.set_name("urlLink");
        let attrs = node.attrs_mut();
        attrs.set("url", AttrValue::Str(url));
        attrs.set("bracketed", AttrValue::Bool(bracketed));
        if let Some(title) = title {
            attrs.set("display_title", AttrValue::Str(title));
        }
        if let Some(appendix) = appendix {
            attrs.set("appendix", appendix);
        }
        Ok(ActionOutcome::Keep(node))
    })
}

/// Annotate a footnote.
///
/// Writes: `footnote_id` (Str), `target_path?` (Str, when footnotes are
/// configured as links).
pub fn footnote() -> PostAction {
    Arc::new(|_s, l, ctx, mut node| {
        let id = {
            let nt = match node.as_non_terminal() {
                Some(nt) => nt,
                None => return Err(MatchFail::miss(l, "footnote")),
            };
            match nt.find_flat_by_name("footnoteId") {
                Some(f) => f.reconstruct(),
                None => return Err(MatchFail::miss(l, "footnote id")),
            }
        };
        let as_link = ctx.options.footnotes_as_links;
        let attrs = node.attrs_mut();
        attrs.set("footnote_id", AttrValue::Str(id.clone()));
        if as_link {
            attrs.set("target_path", AttrValue::Str(id));
        }
        Ok(ActionOutcome::Keep(node))
    })
}

/// Annotate an anchor definition.
///
/// Writes: `anchor` (Str).
pub fn anchor_def() -> PostAction {
    Arc::new(|_s, l, _ctx, mut node| {
        let anchor = {
            let nt = match node.as_non_terminal() {
                Some(nt) => nt,
                None => return Err(MatchFail::miss(l, "anchor definition")),
            };
            match nt.find_flat_by_name("anchor") {
                Some(a) => a.reconstruct(),
                None => return Err(MatchFail::miss(l, "anchor name")),
            }
        };
        node.attrs_mut().set("anchor", AttrValue::Str(anchor));
        Ok(ActionOutcome::Keep(node))
    })
}

/// End-token picker: walk the active-rule name stack top-down and return
/// the end combinator of the innermost rule that defines one.
pub fn end_token_picker(
    table: Vec<(&'static str, ExprId)>,
    default: ExprId,
) -> PickAction {
    let map: ahash::AHashMap<&'static str, ExprId> = table.into_iter().collect();
    Arc::new(move |_s, _l, ctx, _options| {
        for name in ctx.name_stack.iter().rev() {
            if let Some(&end) = map.get(&**name) {
                return Some(end);
            }
        }
        Some(default)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;
    use crate::engine::context::{CancelToken, ParseContext};
    use crate::engine::node::NonTerminalNode;

    fn ctx() -> ParseContext {
        ParseContext::new(Arc::new(ParseOptions::default()), CancelToken::new())
    }

    #[test]
    fn test_hide_on_empty() {
        let action = hide_on_empty();
        let empty = SyntaxNode::Terminal(TerminalNode::new("", 0));
        match action("", 0, &mut ctx(), empty).unwrap() {
            ActionOutcome::Replace(nodes) => assert!(nodes.is_empty()),
            ActionOutcome::Keep(_) => panic!("empty node should be hidden"),
        }
    }

    #[test]
    fn test_cut_right_whitespace_splits() {
        let action = cut_right_whitespace();
        let word = SyntaxNode::Terminal(TerminalNode::named("Word  ", 4, "word"));
        match action("", 4, &mut ctx(), word).unwrap() {
            ActionOutcome::Replace(nodes) => {
                assert_eq!(nodes.len(), 2);
                assert_eq!(nodes[0].reconstruct(), "Word");
                assert_eq!(nodes[1].pos(), 8);
                assert_eq!(nodes[1].reconstruct(), "  ");
            }
            ActionOutcome::Keep(_) => panic!("trailing whitespace should split"),
        }
    }

    #[test]
    fn test_quote_mismatch_is_fatal() {
        let mut c = ctx();
        c.scopes.push(); // parent scope holding the quote
        c.scopes.set("attrQuote", ScopeValue::Str("\"\"".into()));
        let check = quote_end_matches();
        let end = SyntaxNode::Terminal(TerminalNode::new("'", 5));
        match check("", 5, &mut c, &end) {
            Err(MatchFail::Fatal(_)) => {}
            other => panic!("expected fatal, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_heading_level() {
        let action = heading();
        let children = vec![
            SyntaxNode::Terminal(TerminalNode::new("++", 0)),
            SyntaxNode::NonTerminal(NonTerminalNode::new(
                vec![SyntaxNode::Terminal(TerminalNode::new("T", 3))],
                3,
                Some("headingContent".into()),
            )),
        ];
        let node = SyntaxNode::NonTerminal(NonTerminalNode::new(children, 0, Some("heading".into())));
        match action("", 0, &mut ctx(), node).unwrap() {
            ActionOutcome::Keep(node) => {
                assert_eq!(
                    node.attrs().get("level").and_then(AttrValue::as_int),
                    Some(2)
                );
            }
            ActionOutcome::Replace(_) => panic!("heading should be kept"),
        }
    }

    #[test]
    fn test_unescape_fragment() {
        let action = unescape_fragment();
        let node = SyntaxNode::Terminal(TerminalNode::named(r"a\ b", 0, "searchFragment"));
        match action("", 0, &mut ctx(), node).unwrap() {
            ActionOutcome::Keep(node) => {
                assert_eq!(
                    node.attrs().get("unescaped").and_then(AttrValue::as_str),
                    Some("a b")
                );
            }
            ActionOutcome::Replace(_) => panic!("fragment should be kept"),
        }
    }
}
