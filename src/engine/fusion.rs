//! Regex-fusion optimizer.
//!
//! Trying N alternatives at every input position costs O(N) per position.
//! Many alternatives are themselves expressible as a regular expression, so
//! this pass merges them into a single native alternation with one uniquely
//! named capture group per alternative: one scan both locates the next
//! candidate position and identifies which alternative matched there.
//!
//! The fused regex is only a *locator*. Full semantics (actions, nested
//! structure) always come from re-invoking the real combinator at the
//! located position, so fused and unfused parses produce identical trees.
//!
//! Every expression may derive a [`NecessaryRegex`]: a pattern that must
//! match wherever the expression matches. Sequences contribute a prefix of
//! their children (stopping at the first child whose regex is missing or
//! does not cover its full extent); choices need all alternatives; a scan
//! that was already analyzed re-exports its fused alternation, making
//! fusion transitive. Alternatives can only be fused when their regex flags
//! agree on the flags each one cares about (the mask); a conflict abandons
//! fusion and the engine falls back to the linear trial loop.

use regex::Regex;

use crate::engine::grammar::{ExprId, ExprKind, Grammar};
use crate::engine::regex_cache;

/// Regex engine flags relevant to fusion compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegexFlags(u8);

impl RegexFlags {
    /// No flags.
    pub const NONE: RegexFlags = RegexFlags(0);
    /// `(?i)` - case-insensitive matching.
    pub const CASE_INSENSITIVE: RegexFlags = RegexFlags(1);
    /// `(?m)` - `^`/`$` match at line boundaries.
    pub const MULTI_LINE: RegexFlags = RegexFlags(1 << 1);
    /// `(?s)` - `.` matches newline.
    pub const DOT_MATCHES_NEWLINE: RegexFlags = RegexFlags(1 << 2);
    /// All known flags.
    pub const ALL: RegexFlags = RegexFlags(0b111);

    /// True when every flag of `other` is set here.
    pub fn contains(self, other: RegexFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Inline decoration prefix, e.g. `(?ms)`; empty when no flag is set.
    pub fn inline_prefix(self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut out = String::from("(?");
        if self.contains(Self::CASE_INSENSITIVE) {
            out.push('i');
        }
        if self.contains(Self::MULTI_LINE) {
            out.push('m');
        }
        if self.contains(Self::DOT_MATCHES_NEWLINE) {
            out.push('s');
        }
        out.push(')');
        out
    }
}

impl std::ops::BitOr for RegexFlags {
    type Output = RegexFlags;
    fn bitor(self, rhs: RegexFlags) -> RegexFlags {
        RegexFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for RegexFlags {
    type Output = RegexFlags;
    fn bitand(self, rhs: RegexFlags) -> RegexFlags {
        RegexFlags(self.0 & rhs.0)
    }
}

/// A regex that must necessarily match wherever its expression matches.
#[derive(Debug, Clone)]
pub struct NecessaryRegex {
    /// Pattern source, undecorated.
    pub pattern: String,
    /// Flags the pattern requires.
    pub flags: RegexFlags,
    /// Which flags matter for this pattern's correctness.
    pub mask: RegexFlags,
    /// True when the regex covers the expression's exact extent rather
    /// than only a necessary prefix.
    pub complete: bool,
}

/// Merge two flag sets; `None` when the flags disagree on a flag both
/// masks consider important.
fn combine_flags(
    flags: RegexFlags,
    mask: RegexFlags,
    other_flags: RegexFlags,
    other_mask: RegexFlags,
) -> Option<(RegexFlags, RegexFlags)> {
    let common = mask & other_mask;
    if flags & common != other_flags & common {
        return None;
    }
    Some((flags | other_flags, mask | other_mask))
}

fn wrap(pattern: &str) -> String {
    format!("(?:{})", pattern)
}

/// Derive the necessary regex of an expression, if one exists. Cyclic
/// derivations (through forward cells) yield `None`.
pub(crate) fn necessary(
    grammar: &Grammar,
    id: ExprId,
    visiting: &mut Vec<bool>,
) -> Option<NecessaryRegex> {
    if visiting[id] {
        return None;
    }
    visiting[id] = true;
    let result = necessary_inner(grammar, id, visiting);
    visiting[id] = false;
    result
}

fn necessary_inner(
    grammar: &Grammar,
    id: ExprId,
    visiting: &mut Vec<bool>,
) -> Option<NecessaryRegex> {
    match grammar.kind(id) {
        ExprKind::Literal { text } => Some(NecessaryRegex {
            pattern: regex::escape(text),
            flags: RegexFlags::NONE,
            mask: RegexFlags::CASE_INSENSITIVE,
            complete: true,
        }),
        ExprKind::Pattern { source, flags, .. } => Some(NecessaryRegex {
            pattern: source.clone(),
            flags: *flags,
            mask: RegexFlags::ALL,
            complete: true,
        }),
        ExprKind::EndOfInput => Some(NecessaryRegex {
            pattern: r"\z".to_string(),
            flags: RegexFlags::NONE,
            mask: RegexFlags::NONE,
            complete: true,
        }),
        ExprKind::Sequence(items) => {
            // Greedy prefix: children are appended while each one provides
            // a regex covering its full extent; the first incomplete child
            // still contributes, then the chain stops.
            let mut parts = Vec::new();
            let mut flags = RegexFlags::NONE;
            let mut mask = RegexFlags::NONE;
            let mut complete = true;
            for &item in items {
                let child = match necessary(grammar, item, visiting) {
                    Some(c) => c,
                    None => {
                        complete = false;
                        break;
                    }
                };
                let (f, m) = match combine_flags(flags, mask, child.flags, child.mask) {
                    Some(fm) => fm,
                    None => {
                        complete = false;
                        break;
                    }
                };
                parts.push(wrap(&child.pattern));
                flags = f;
                mask = m;
                complete = complete && child.complete;
                if !complete {
                    break;
                }
            }
            if parts.is_empty() {
                return None;
            }
            Some(NecessaryRegex {
                pattern: parts.concat(),
                flags,
                mask,
                complete,
            })
        }
        ExprKind::Choice(alts) => {
            let combined = combine_all(grammar, alts, visiting)?;
            Some(NecessaryRegex {
                pattern: wrap(&combined.pattern),
                ..combined
            })
        }
        ExprKind::Repeat { item, min, max } => {
            let child = necessary(grammar, *item, visiting)?;
            let quantifier = match (*min, *max) {
                (0, Some(1)) => "?".to_string(),
                (0, None) => "*".to_string(),
                (1, None) => "+".to_string(),
                (min, None) => format!("{{{},}}", min),
                (min, Some(max)) => format!("{{{},{}}}", min, max),
            };
            Some(NecessaryRegex {
                pattern: format!("{}{}", wrap(&child.pattern), quantifier),
                flags: child.flags,
                mask: child.mask,
                complete: child.complete,
            })
        }
        ExprKind::Lookahead { .. } => None,
        ExprKind::Forward { slot } => necessary(grammar, grammar.forward_target(*slot), visiting),
        ExprKind::ScanUntil { alts, end } => {
            // Transitive reuse: an already-fused scan re-exports its
            // alternation instead of re-deriving it.
            if let Some(fused) = grammar.fused(id) {
                return Some(NecessaryRegex {
                    pattern: format!("(?s:.*?)(?:{})", fused.core()),
                    flags: fused.flags(),
                    mask: fused.mask(),
                    complete: false,
                });
            }
            let mut arm_ids = Vec::with_capacity(alts.len() + 1);
            arm_ids.push(*end);
            arm_ids.extend_from_slice(alts);
            let combined = combine_all(grammar, &arm_ids, visiting)?;
            Some(NecessaryRegex {
                pattern: format!("(?s:.*?)(?:{})", combined.pattern),
                flags: combined.flags,
                mask: combined.mask,
                complete: false,
            })
        }
        ExprKind::Select { options, .. } => {
            // Whatever option the picker selects is part of the union, so
            // the union is a necessary match (but usually an over-match).
            let combined = combine_all(grammar, options, visiting)?;
            Some(NecessaryRegex {
                pattern: wrap(&combined.pattern),
                flags: combined.flags,
                mask: combined.mask,
                complete: false,
            })
        }
    }
}

/// Alternation of all given expressions; `None` when any is missing or
/// the flags are incompatible.
fn combine_all(
    grammar: &Grammar,
    ids: &[ExprId],
    visiting: &mut Vec<bool>,
) -> Option<NecessaryRegex> {
    if ids.is_empty() {
        return None;
    }
    let mut parts = Vec::with_capacity(ids.len());
    let mut flags = RegexFlags::NONE;
    let mut mask = RegexFlags::NONE;
    let mut complete = true;
    for &id in ids {
        let child = necessary(grammar, id, visiting)?;
        let (f, m) = combine_flags(flags, mask, child.flags, child.mask)?;
        parts.push(wrap(&child.pattern));
        flags = f;
        mask = m;
        complete = complete && child.complete;
    }
    Some(NecessaryRegex {
        pattern: parts.join("|"),
        flags,
        mask,
        complete,
    })
}

/// A compiled fused alternation attached to a choice or scan node.
pub struct FusedScan {
    regex: Regex,
    groups: Vec<String>,
    core: String,
    flags: RegexFlags,
    mask: RegexFlags,
}

impl FusedScan {
    /// Maximum number of arms; the two-digit group naming scheme bounds it.
    const MAX_ARMS: usize = 99;

    /// Build from per-arm necessary regexes; `None` abandons fusion.
    fn build(arms: &[NecessaryRegex]) -> Option<FusedScan> {
        if arms.is_empty() || arms.len() > Self::MAX_ARMS {
            return None;
        }

        let mut flags = RegexFlags::NONE;
        let mut mask = RegexFlags::NONE;
        for arm in arms {
            let (f, m) = combine_flags(flags, mask, arm.flags, arm.mask)?;
            flags = f;
            mask = m;
        }

        let mut groups = Vec::with_capacity(arms.len());
        let mut wrapped = Vec::with_capacity(arms.len());
        for (i, arm) in arms.iter().enumerate() {
            let group = format!("g{:02}", i);
            wrapped.push(format!("(?P<{}>{})", group, arm.pattern));
            groups.push(group);
        }
        let core = arms
            .iter()
            .map(|a| wrap(&a.pattern))
            .collect::<Vec<_>>()
            .join("|");

        // Arms may smuggle in constructs the combined pattern cannot hold
        // (duplicate group names and the like); a failed compile abandons
        // fusion rather than failing the build.
        let regex = regex_cache::compile(&wrapped.join("|"), flags).ok()?;

        Some(FusedScan {
            regex,
            groups,
            core,
            flags,
            mask,
        })
    }

    /// One native scan from `pos`: the start of the next candidate match
    /// and the index of the first arm matching there.
    pub(crate) fn locate(&self, input: &str, pos: usize) -> Option<(usize, usize)> {
        let caps = self.regex.captures_at(input, pos)?;
        let start = caps.get(0)?.start();
        let arm = self.groups.iter().position(|g| caps.name(g).is_some())?;
        Some((start, arm))
    }

    /// Number of fused arms.
    pub fn arm_count(&self) -> usize {
        self.groups.len()
    }

    /// The undecorated alternation, for transitive reuse.
    pub(crate) fn core(&self) -> &str {
        &self.core
    }

    /// Combined flags of the fused arms.
    pub(crate) fn flags(&self) -> RegexFlags {
        self.flags
    }

    /// Combined flag mask of the fused arms.
    pub(crate) fn mask(&self) -> RegexFlags {
        self.mask
    }
}

/// Fuse every eligible choice and scan node of the grammar. Already-fused
/// nodes are skipped, so the pass is idempotent. Expressions are visited in
/// creation order, which is children-first for grammars assembled bottom-up
/// and lets inner scans be reused transitively by outer ones.
pub(crate) fn optimize(grammar: &mut Grammar) {
    let count = grammar.expr_count();
    let mut fused_nodes = 0usize;
    for id in 0..count {
        if grammar.fused(id).is_some() {
            continue;
        }
        let arm_ids: Vec<ExprId> = match grammar.kind(id) {
            ExprKind::Choice(alts) if alts.len() > 1 => alts.clone(),
            ExprKind::ScanUntil { alts, end } => {
                let mut v = Vec::with_capacity(alts.len() + 1);
                v.push(*end);
                v.extend_from_slice(alts);
                v
            }
            _ => continue,
        };

        let mut arms = Vec::with_capacity(arm_ids.len());
        let mut ok = true;
        for arm_id in &arm_ids {
            let mut visiting = vec![false; count];
            match necessary(grammar, *arm_id, &mut visiting) {
                Some(nr) => arms.push(nr),
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if !ok {
            continue;
        }

        if let Some(scan) = FusedScan::build(&arms) {
            grammar.set_fused(id, scan);
            fused_nodes += 1;
        }
    }
    log::debug!("regex fusion: {} nodes fused", fused_nodes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::grammar::GrammarBuilder;

    #[test]
    fn test_flag_prefix() {
        assert_eq!(RegexFlags::NONE.inline_prefix(), "");
        let f = RegexFlags::MULTI_LINE | RegexFlags::DOT_MATCHES_NEWLINE;
        assert_eq!(f.inline_prefix(), "(?ms)");
    }

    #[test]
    fn test_combine_flags_conflict() {
        // Both care about case-sensitivity and disagree.
        assert!(combine_flags(
            RegexFlags::CASE_INSENSITIVE,
            RegexFlags::CASE_INSENSITIVE,
            RegexFlags::NONE,
            RegexFlags::CASE_INSENSITIVE,
        )
        .is_none());
        // Disagreement on a flag only one side cares about is fine.
        assert!(combine_flags(
            RegexFlags::MULTI_LINE,
            RegexFlags::ALL,
            RegexFlags::NONE,
            RegexFlags::CASE_INSENSITIVE,
        )
        .is_some());
    }

    #[test]
    fn test_literal_escapes() {
        let mut g = GrammarBuilder::new();
        let star = g.lit("*");
        let grammar = g.build(star).unwrap();
        let mut visiting = vec![false; grammar.expr_count()];
        let nr = necessary(&grammar, star, &mut visiting).unwrap();
        assert_eq!(nr.pattern, r"\*");
        assert!(nr.complete);
    }

    #[test]
    fn test_sequence_prefix_stops_at_missing_child() {
        let mut g = GrammarBuilder::new();
        let open = g.lit("<%");
        let (fwd, slot) = g.forward();
        let close = g.lit("%>");
        let seq = g.seq(vec![open, fwd, close]);
        // Cyclic forward: points back at the sequence itself.
        g.bind(slot, seq).unwrap();
        let grammar = g.build(seq).unwrap();

        let mut visiting = vec![false; grammar.expr_count()];
        let nr = necessary(&grammar, seq, &mut visiting).unwrap();
        assert_eq!(nr.pattern, r"(?:<%)");
        assert!(!nr.complete);
    }

    #[test]
    fn test_choice_fuses_and_locates() {
        let mut g = GrammarBuilder::new();
        let a = g.lit("alpha");
        let b = g.pattern("[0-9]+", RegexFlags::NONE).unwrap();
        let choice = g.choice(vec![a, b]);
        let mut grammar = g.build(choice).unwrap();
        grammar.optimize();

        let fused = grammar.fused(choice).expect("choice should fuse");
        assert_eq!(fused.arm_count(), 2);
        assert_eq!(fused.locate("alpha", 0), Some((0, 0)));
        assert_eq!(fused.locate("42", 0), Some((0, 1)));
        // Locator semantics: the scan may find a later start.
        assert_eq!(fused.locate("xx42", 0), Some((2, 1)));
    }

    #[test]
    fn test_scan_until_fuses_end_first() {
        let mut g = GrammarBuilder::new();
        let word = g.pattern("[a-z]+", RegexFlags::NONE).unwrap();
        let end = g.lit(";");
        let scan = g.scan_until(vec![word], end);
        let mut grammar = g.build(scan).unwrap();
        grammar.optimize();

        let fused = grammar.fused(scan).expect("scan should fuse");
        assert_eq!(fused.arm_count(), 2);
        // Arm 0 is the end marker.
        assert_eq!(fused.locate("123;x", 0), Some((3, 0)));
        assert_eq!(fused.locate("12ab", 0), Some((2, 1)));
        assert_eq!(fused.locate("123", 0), None);
    }

    #[test]
    fn test_lookahead_blocks_fusion() {
        let mut g = GrammarBuilder::new();
        let a = g.lit("a");
        let la = g.ahead(a);
        let b = g.lit("b");
        let choice = g.choice(vec![la, b]);
        let mut grammar = g.build(choice).unwrap();
        grammar.optimize();
        assert!(grammar.fused(choice).is_none());
    }
}
