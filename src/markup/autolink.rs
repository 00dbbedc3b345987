//! Auto-link rewrite pass.
//!
//! After a successful parse, relax-mode auto-linking walks every plain-text
//! leaf and greedily finds occurrences of the configured known words,
//! splitting the leaf into plain-text and link segments. Matching is
//! case-insensitive and tolerates arbitrary non-word joiners between the
//! word's parts.
//!
//! Tie break when several words match: the earliest position wins, then the
//! longest match, then the earliest-declared word.
//!
//! The pass is bounded (O(text length x configured words)) but can still be
//! slow on large documents, so it polls the same cancellation token as the
//! parse itself.

use regex::Regex;

use crate::engine::context::CancelToken;
use crate::engine::error::ParseError;
use crate::engine::fusion::RegexFlags;
use crate::engine::node::{AttrValue, NonTerminalNode, SyntaxNode, TerminalNode};
use crate::engine::regex_cache;

struct RelaxEntry {
    regex: Regex,
    word: String,
}

/// Compiled auto-link word table.
pub struct RelaxTable {
    entries: Vec<RelaxEntry>,
}

impl RelaxTable {
    /// Compile the configured words, in declaration order. Words that do
    /// not survive regex compilation are skipped with a warning.
    pub fn build(words: &[String]) -> Self {
        let mut entries = Vec::with_capacity(words.len());
        for word in words {
            let parts: Vec<String> = word
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .filter(|p| !p.is_empty())
                .map(regex::escape)
                .collect();
            if parts.is_empty() {
                continue;
            }
            let pattern = format!(r"\b{}\b", parts.join(r"[\W]+"));
            match regex_cache::compile(&pattern, RegexFlags::CASE_INSENSITIVE) {
                Ok(regex) => entries.push(RelaxEntry {
                    regex,
                    word: word.clone(),
                }),
                Err(err) => log::warn!("auto-link word {:?} skipped: {}", word, err),
            }
        }
        Self { entries }
    }

    /// Number of usable words.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no word compiled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest/longest/earliest-declared match in `text`.
    fn best_match(&self, text: &str) -> Option<(usize, usize, &RelaxEntry)> {
        let mut best: Option<(usize, usize, &RelaxEntry)> = None;
        for entry in &self.entries {
            if let Some(m) = entry.regex.find(text) {
                let candidate = (m.start(), m.end() - m.start(), entry);
                let better = match &best {
                    None => true,
                    Some((pos, len, _)) => {
                        candidate.0 < *pos || (candidate.0 == *pos && candidate.1 > *len)
                    }
                };
                if better {
                    best = Some(candidate);
                }
            }
        }
        best
    }
}

/// Rewrite all plain-text leaves of `doc` in place.
pub fn rewrite(
    doc: &mut NonTerminalNode,
    table: &RelaxTable,
    cancel: &CancelToken,
) -> Result<(), ParseError> {
    if table.is_empty() {
        return Ok(());
    }
    rewrite_children(doc, table, cancel)
}

fn rewrite_children(
    nt: &mut NonTerminalNode,
    table: &RelaxTable,
    cancel: &CancelToken,
) -> Result<(), ParseError> {
    let children = std::mem::take(nt.children_mut());
    let mut out = Vec::with_capacity(children.len());

    for child in children {
        match child {
            SyntaxNode::NonTerminal(mut inner) => {
                rewrite_children(&mut inner, table, cancel)?;
                out.push(SyntaxNode::NonTerminal(inner));
            }
            SyntaxNode::Terminal(leaf) => {
                if leaf.name.as_deref() == Some("plainText") {
                    split_leaf(leaf, table, cancel, &mut out)?;
                } else {
                    out.push(SyntaxNode::Terminal(leaf));
                }
            }
        }
    }

    nt.set_children(out);
    Ok(())
}

fn split_leaf(
    leaf: TerminalNode,
    table: &RelaxTable,
    cancel: &CancelToken,
    out: &mut Vec<SyntaxNode>,
) -> Result<(), ParseError> {
    let base_pos = leaf.pos;
    let text = leaf.text.as_str();
    let mut offset = 0usize;
    let mut found_any = false;

    while offset < text.len() {
        if cancel.is_cancelled() {
            return Err(ParseError::Cancelled);
        }
        let remaining = &text[offset..];
        let Some((start, len, entry)) = table.best_match(remaining) else {
            break;
        };
        found_any = true;

        if start > 0 {
            out.push(SyntaxNode::Terminal(TerminalNode::named(
                &remaining[..start],
                base_pos + offset,
                "plainText",
            )));
        }

        let word_pos = base_pos + offset + start;
        let word_text = &remaining[start..start + len];
        let mut link = NonTerminalNode::new(
            vec![SyntaxNode::Terminal(TerminalNode::named(
                word_text, word_pos, "word",
            ))],
            word_pos,
            Some("wikiWord".into()),
        );
        link.attrs.set("target_path", AttrValue::Str(entry.word.clone()));
        link.attrs.set("link_core", AttrValue::Str(word_text.to_string()));
        link.attrs
            .set("display_title", AttrValue::Str(word_text.to_string()));
        link.attrs.set("auto", AttrValue::Bool(true));
        out.push(SyntaxNode::NonTerminal(link));

        offset += start + len.max(1);
    }

    if !found_any {
        out.push(SyntaxNode::Terminal(leaf));
        return Ok(());
    }
    if offset < text.len() {
        out.push(SyntaxNode::Terminal(TerminalNode::named(
            &text[offset..],
            base_pos + offset,
            "plainText",
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_text(text: &str) -> NonTerminalNode {
        NonTerminalNode::new(
            vec![SyntaxNode::Terminal(TerminalNode::named(
                text,
                0,
                "plainText",
            ))],
            0,
            Some("document".into()),
        )
    }

    fn words(list: &[&str]) -> RelaxTable {
        RelaxTable::build(&list.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_leaf_splits_around_match() {
        let mut doc = doc_with_text("see alpha here");
        rewrite(&mut doc, &words(&["alpha"]), &CancelToken::new()).unwrap();

        let names: Vec<_> = doc.children().iter().map(|c| c.name().unwrap()).collect();
        assert_eq!(names, vec!["plainText", "wikiWord", "plainText"]);
        assert_eq!(doc.children()[1].reconstruct(), "alpha");
        // Positions survive the rewrite.
        assert_eq!(doc.children()[1].pos(), 4);
        assert_eq!(doc.len(), 14);
    }

    #[test]
    fn test_case_insensitive_and_joined() {
        let mut doc = doc_with_text("my home page!");
        rewrite(&mut doc, &words(&["Home Page"]), &CancelToken::new()).unwrap();

        let link = doc
            .find_flat_by_name("wikiWord")
            .expect("relaxed match should link");
        assert_eq!(link.reconstruct(), "home page");
        assert_eq!(
            link.attrs().get("target_path").and_then(AttrValue::as_str),
            Some("Home Page")
        );
    }

    #[test]
    fn test_tie_break_prefers_longest_then_declared() {
        // Both words match at position 0; the longer one wins even though
        // it is declared later.
        let mut doc = doc_with_text("alpha beta");
        rewrite(&mut doc, &words(&["alpha", "alpha beta"]), &CancelToken::new()).unwrap();
        assert_eq!(doc.children()[0].reconstruct(), "alpha beta");

        // Equal length: declaration order wins. Case-insensitive matching
        // makes these two distinct words cover the same text.
        let mut doc = doc_with_text("gamma");
        rewrite(&mut doc, &words(&["GAMMA", "gamma"]), &CancelToken::new()).unwrap();
        assert_eq!(
            doc.children()[0]
                .attrs()
                .get("target_path")
                .and_then(AttrValue::as_str),
            Some("GAMMA")
        );
    }

    #[test]
    fn test_untouched_without_match() {
        let mut doc = doc_with_text("nothing to see");
        rewrite(&mut doc, &words(&["absent"]), &CancelToken::new()).unwrap();
        assert_eq!(doc.child_count(), 1);
        assert_eq!(doc.children()[0].name(), Some("plainText"));
    }

    #[test]
    fn test_cancellation_aborts_pass() {
        let token = CancelToken::new();
        token.cancel();
        let mut doc = doc_with_text("alpha");
        let err = rewrite(&mut doc, &words(&["alpha"]), &token).unwrap_err();
        assert!(matches!(err, ParseError::Cancelled));
    }
}
