//! The backtracking match engine.
//!
//! A [`Matcher`] borrows a finalized grammar and an input buffer and drives
//! the recursive-descent match. Every expression follows the same protocol:
//!
//! 1. push the result name (if any) and a copy-on-write scope;
//! 2. run pre-match validators (a veto is an ordinary miss);
//! 3. match the expression kind, producing child nodes;
//! 4. pack the nodes (named leaf -> named terminal, named composite ->
//!    named non-terminal, unnamed composite -> spliced children);
//! 5. run post-match validators, then post-match actions;
//! 6. poll the cancellation token and pop what was pushed.
//!
//! Misses backtrack; fatal failures cross everything except the nearest
//! ordered choice; cancellation crosses everything.

use crate::engine::context::ParseContext;
use crate::engine::error::{Failure, MatchFail};
use crate::engine::grammar::{ActionOutcome, ExprId, ExprKind, Grammar};
use crate::engine::node::{NonTerminalNode, SyntaxNode, TerminalNode};

/// Result of one match attempt: new position plus produced nodes.
pub type MatchOutcome = Result<(usize, Vec<SyntaxNode>), MatchFail>;

/// Smallest byte offset after `pos` that is a char boundary.
fn next_char_boundary(s: &str, pos: usize) -> usize {
    let mut p = pos + 1;
    while p < s.len() && !s.is_char_boundary(p) {
        p += 1;
    }
    p.min(s.len())
}

/// Drives a grammar over one input buffer.
pub struct Matcher<'g, 't> {
    grammar: &'g Grammar,
    input: &'t str,
}

impl<'g, 't> Matcher<'g, 't> {
    /// New matcher over `input`.
    pub fn new(grammar: &'g Grammar, input: &'t str) -> Self {
        Self { grammar, input }
    }

    /// The input buffer.
    pub fn input(&self) -> &'t str {
        self.input
    }

    /// Match the grammar's root rule from the start of input.
    pub fn run(&self, ctx: &mut ParseContext) -> MatchOutcome {
        self.try_expr(self.grammar.root(), 0, ctx)
    }

    /// Match an arbitrary rule from the start of input.
    pub fn run_rule(&self, id: ExprId, ctx: &mut ParseContext) -> MatchOutcome {
        self.try_expr(id, 0, ctx)
    }

    /// Match expression `id` at `pos`.
    pub fn try_expr(&self, id: ExprId, pos: usize, ctx: &mut ParseContext) -> MatchOutcome {
        ctx.enter(pos)?;
        let named = self.grammar.meta(id).name.clone();
        if let Some(name) = &named {
            ctx.name_stack.push(name.clone());
        }
        ctx.scopes.push();

        let out = self.try_expr_inner(id, pos, ctx);

        ctx.scopes.pop();
        if named.is_some() {
            ctx.name_stack.pop();
        }
        ctx.exit();
        out
    }

    fn try_expr_inner(&self, id: ExprId, pos: usize, ctx: &mut ParseContext) -> MatchOutcome {
        let meta = self.grammar.meta(id);

        for pre in &meta.pre {
            pre(self.input, pos, ctx)?;
        }

        let (end, tokens) = self.match_kind(id, pos, ctx)?;

        let mut node = pack(tokens, pos, meta.name.clone(), self.grammar.kind(id).is_leaf());

        for check in &meta.validate {
            check(self.input, pos, ctx, &node)?;
        }

        for action in &meta.post {
            match action(self.input, pos, ctx, node)? {
                ActionOutcome::Keep(n) => node = n,
                ActionOutcome::Replace(nodes) => {
                    node = SyntaxNode::NonTerminal(NonTerminalNode::new(nodes, pos, None));
                }
            }
        }

        ctx.poll_cancel()?;
        Ok((end, unwrap_node(node)))
    }

    fn miss(&self, id: ExprId, pos: usize) -> MatchFail {
        MatchFail::Miss(Failure {
            position: pos,
            expected: self.grammar.meta(id).err_label.clone(),
        })
    }

    fn match_kind(&self, id: ExprId, pos: usize, ctx: &mut ParseContext) -> MatchOutcome {
        match self.grammar.kind(id) {
            ExprKind::Literal { text } => {
                if self.input.as_bytes()[pos..].starts_with(text.as_bytes()) {
                    Ok((
                        pos + text.len(),
                        vec![SyntaxNode::Terminal(TerminalNode::new(text.clone(), pos))],
                    ))
                } else {
                    Err(self.miss(id, pos))
                }
            }
            ExprKind::Pattern { regex, .. } => match regex.find_at(self.input, pos) {
                Some(m) if m.start() == pos => Ok((
                    m.end(),
                    vec![SyntaxNode::Terminal(TerminalNode::new(m.as_str(), pos))],
                )),
                _ => Err(self.miss(id, pos)),
            },
            ExprKind::EndOfInput => {
                if pos == self.input.len() {
                    Ok((pos, Vec::new()))
                } else {
                    Err(self.miss(id, pos))
                }
            }
            ExprKind::Sequence(items) => {
                let mut p = pos;
                let mut tokens = Vec::new();
                for &item in items {
                    let (np, mut produced) = self.try_expr(item, p, ctx)?;
                    tokens.append(&mut produced);
                    p = np;
                }
                Ok((p, tokens))
            }
            ExprKind::Choice(alts) => self.match_choice(id, alts, pos, ctx),
            ExprKind::Repeat { item, min, max } => {
                self.match_repeat(id, *item, *min, *max, pos, ctx)
            }
            ExprKind::Lookahead { item, positive } => {
                match self.try_expr(*item, pos, ctx) {
                    Ok(_) => {
                        if *positive {
                            Ok((pos, Vec::new()))
                        } else {
                            Err(self.miss(id, pos))
                        }
                    }
                    Err(MatchFail::Miss(f)) => {
                        if *positive {
                            Err(MatchFail::Miss(f))
                        } else {
                            Ok((pos, Vec::new()))
                        }
                    }
                    Err(other) => Err(other),
                }
            }
            ExprKind::Forward { slot } => {
                self.try_expr(self.grammar.forward_target(*slot), pos, ctx)
            }
            ExprKind::ScanUntil { alts, end } => self.match_scan(id, alts, *end, pos, ctx),
            ExprKind::Select { options, pick } => {
                match pick(self.input, pos, ctx, options) {
                    Some(target) => self.try_expr(target, pos, ctx),
                    None => Err(self.miss(id, pos)),
                }
            }
        }
    }

    /// Ordered choice. With a fused regex the single native scan replaces
    /// the linear trial loop: no arm can match where its necessary regex
    /// does not, so the trial starts at the identified arm and only covers
    /// the arms after it.
    fn match_choice(
        &self,
        id: ExprId,
        alts: &[ExprId],
        pos: usize,
        ctx: &mut ParseContext,
    ) -> MatchOutcome {
        if let Some(fused) = self.grammar.fused(id) {
            return match fused.locate(self.input, pos) {
                Some((start, arm)) if start == pos => self.trial_alts(id, &alts[arm..], pos, ctx),
                _ => Err(self.miss(id, pos)),
            };
        }
        self.trial_alts(id, alts, pos, ctx)
    }

    /// Try alternatives left to right. Misses and fatal rejections both
    /// drop the alternative; the failure with the greatest position is
    /// reported if none succeeds.
    fn trial_alts(
        &self,
        id: ExprId,
        alts: &[ExprId],
        pos: usize,
        ctx: &mut ParseContext,
    ) -> MatchOutcome {
        let mut deepest: Option<Failure> = None;
        for &alt in alts {
            match self.try_expr(alt, pos, ctx) {
                Ok(result) => return Ok(result),
                Err(MatchFail::Miss(f)) | Err(MatchFail::Fatal(f)) => {
                    if deepest.as_ref().map_or(true, |d| f.position > d.position) {
                        deepest = Some(f);
                    }
                }
                Err(MatchFail::Cancelled) => return Err(MatchFail::Cancelled),
            }
        }
        match deepest {
            Some(f) => Err(MatchFail::Miss(f)),
            None => Err(self.miss(id, pos)),
        }
    }

    fn match_repeat(
        &self,
        id: ExprId,
        item: ExprId,
        min: usize,
        max: Option<usize>,
        pos: usize,
        ctx: &mut ParseContext,
    ) -> MatchOutcome {
        let mut p = pos;
        let mut tokens = Vec::new();
        let mut count = 0usize;
        let mut last_fail: Option<Failure> = None;

        loop {
            if let Some(max) = max {
                if count >= max {
                    break;
                }
            }
            match self.try_expr(item, p, ctx) {
                Ok((np, mut produced)) => {
                    tokens.append(&mut produced);
                    count += 1;
                    let stalled = np == p;
                    p = np;
                    // A zero-width match would repeat forever.
                    if stalled {
                        break;
                    }
                }
                Err(MatchFail::Miss(f)) => {
                    last_fail = Some(f);
                    break;
                }
                Err(other) => return Err(other),
            }
        }

        if count < min {
            return Err(match last_fail {
                Some(f) => MatchFail::Miss(f),
                None => self.miss(id, pos),
            });
        }
        Ok((p, tokens))
    }

    /// Scan-until: advance until the end marker (not consumed) or an inner
    /// alternative (consumed) matches; everything skipped becomes plain
    /// text. The fused path jumps straight between candidate positions.
    fn match_scan(
        &self,
        id: ExprId,
        alts: &[ExprId],
        end: ExprId,
        start: usize,
        ctx: &mut ParseContext,
    ) -> MatchOutcome {
        let input_len = self.input.len();
        let fused = self.grammar.fused(id);
        let mut p = start;

        loop {
            ctx.poll_cancel()?;

            // Candidate position and first arm that can match there.
            // Arm 0 is the end marker, arm i+1 is alts[i].
            let (cand, first_arm) = match fused {
                Some(f) => match f.locate(self.input, p) {
                    Some(hit) => hit,
                    None => return Err(self.miss(id, start)),
                },
                None => (p, 0),
            };

            if first_arm == 0 {
                match self.try_expr(end, cand, ctx) {
                    Ok(_) => {
                        // End marker found but not consumed.
                        let pseudo = self.pseudo_nodes(id, start, cand, ctx)?;
                        return Ok((cand, pseudo));
                    }
                    Err(MatchFail::Miss(_)) => {}
                    Err(other) => return Err(other),
                }
            }

            let alt_start = first_arm.saturating_sub(1);
            let mut matched = None;
            for &alt in &alts[alt_start..] {
                match self.try_expr(alt, cand, ctx) {
                    Ok(result) => {
                        matched = Some(result);
                        break;
                    }
                    Err(MatchFail::Miss(_)) => {}
                    Err(other) => return Err(other),
                }
            }

            if let Some((np, mut produced)) = matched {
                let mut out = self.pseudo_nodes(id, start, cand, ctx)?;
                out.append(&mut produced);
                return Ok((np, out));
            }

            if cand >= input_len {
                return Err(self.miss(id, start));
            }
            p = next_char_boundary(self.input, cand);
        }
    }

    /// Build the accumulated plain-text node for `[start, end_pos)` and run
    /// the scan's pseudo action over it. Without a pseudo action an empty
    /// accumulation is hidden and a non-empty one kept unnamed.
    fn pseudo_nodes(
        &self,
        id: ExprId,
        start: usize,
        end_pos: usize,
        ctx: &mut ParseContext,
    ) -> Result<Vec<SyntaxNode>, MatchFail> {
        let text = &self.input[start..end_pos];
        let terminal = SyntaxNode::Terminal(TerminalNode::new(text, start));
        if let Some(pseudo) = &self.grammar.meta(id).pseudo {
            match pseudo(self.input, start, ctx, terminal)? {
                ActionOutcome::Keep(node) => Ok(vec![node]),
                ActionOutcome::Replace(nodes) => Ok(nodes),
            }
        } else if text.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![terminal])
        }
    }
}

/// Pack raw child nodes into the expression's result node.
fn pack(
    tokens: Vec<SyntaxNode>,
    pos: usize,
    name: Option<std::sync::Arc<str>>,
    leaf: bool,
) -> SyntaxNode {
    if leaf && tokens.len() == 1 {
        let mut iter = tokens.into_iter();
        let mut node = iter.next().expect("length checked");
        if let Some(name) = name {
            node.set_name(name);
        }
        return node;
    }
    SyntaxNode::NonTerminal(NonTerminalNode::new(tokens, pos, name))
}

/// Unwrap the result node into the token list handed to the parent:
/// unnamed composites splice their children, everything else stays whole.
fn unwrap_node(node: SyntaxNode) -> Vec<SyntaxNode> {
    match node {
        SyntaxNode::NonTerminal(nt) if nt.name.is_none() => {
            let mut nt = nt;
            std::mem::take(nt.children_mut())
        }
        other => vec![other],
    }
}
