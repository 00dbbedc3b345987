//! Grammar representation and construction.
//!
//! A grammar is an arena of expression nodes addressed by [`ExprId`].
//! Expressions may reference each other cyclically through forward cells
//! that are bound exactly once during assembly; [`GrammarBuilder::build`]
//! verifies every cell is bound, and consuming the builder makes later
//! mutation impossible. After an optional [`Grammar::optimize`] pass the
//! grammar is immutable and safe to share read-only across concurrent
//! parses.
//!
//! Actions attach to expressions, not to the engine:
//!
//! - pre-match validators run before any input is consumed and can veto
//!   based on context (name stack, options, scopes);
//! - post-match validators inspect the produced node and can veto
//!   recoverably or fatally;
//! - post-match actions rewrite, annotate or drop the produced node;
//! - the pseudo action of a scan names the accumulated plain text.

use std::sync::Arc;

use regex::Regex;

use crate::engine::context::ParseContext;
use crate::engine::error::{GrammarError, MatchFail};
use crate::engine::fusion::{FusedScan, RegexFlags};
use crate::engine::node::SyntaxNode;
use crate::engine::regex_cache;

/// Index of an expression in the grammar arena.
pub type ExprId = usize;

/// Result of a post-match action.
pub enum ActionOutcome {
    /// Keep this node (possibly mutated by the action).
    Keep(SyntaxNode),
    /// Replace the node with zero or more nodes; an empty list hides the
    /// match entirely.
    Replace(Vec<SyntaxNode>),
}

/// Pre-match validator: may veto before any input is consumed.
pub type PreAction =
    Arc<dyn Fn(&str, usize, &mut ParseContext) -> Result<(), MatchFail> + Send + Sync>;

/// Post-match validator: may veto the already-produced node.
pub type ValidateAction =
    Arc<dyn Fn(&str, usize, &mut ParseContext, &SyntaxNode) -> Result<(), MatchFail> + Send + Sync>;

/// Post-match action: rewrite, annotate or drop the produced node.
pub type PostAction = Arc<
    dyn Fn(&str, usize, &mut ParseContext, SyntaxNode) -> Result<ActionOutcome, MatchFail>
        + Send
        + Sync,
>;

/// Picker of a dynamic choice: selects which option to match, typically by
/// walking the active-rule name stack.
pub type PickAction =
    Arc<dyn Fn(&str, usize, &ParseContext, &[ExprId]) -> Option<ExprId> + Send + Sync>;

/// An expression node of the grammar.
pub enum ExprKind {
    /// Fixed string match at the current position.
    Literal {
        /// The exact text to match.
        text: String,
    },
    /// Native-regex match anchored at the current position.
    Pattern {
        /// Pattern source, without inline flag decoration.
        source: String,
        /// Flags the pattern was compiled with.
        flags: RegexFlags,
        /// Compiled automaton.
        regex: Regex,
    },
    /// Children in order; fails atomically.
    Sequence(Vec<ExprId>),
    /// Ordered choice; first success wins.
    Choice(Vec<ExprId>),
    /// Repetition with bounds; `min == 0` never fails.
    Repeat {
        /// Repeated expression.
        item: ExprId,
        /// Minimum number of matches.
        min: usize,
        /// Maximum number of matches (`None` = unbounded).
        max: Option<usize>,
    },
    /// Zero-width assertion over a child expression.
    Lookahead {
        /// Tested expression.
        item: ExprId,
        /// `true` = must match, `false` = must not match.
        positive: bool,
    },
    /// Late-bound indirection cell enabling mutually recursive rules.
    Forward {
        /// Index into the grammar's forward table.
        slot: usize,
    },
    /// Advance position by position until the end marker (not consumed) or
    /// one of the alternatives (consumed) matches; unmatched positions
    /// accumulate as plain text.
    ScanUntil {
        /// Inner alternatives, tried in order.
        alts: Vec<ExprId>,
        /// End marker; matching it stops the scan without consuming.
        end: ExprId,
    },
    /// Dynamic choice: a picker callback selects the option to match.
    Select {
        /// The options the picker may choose from.
        options: Vec<ExprId>,
        /// The picker.
        pick: PickAction,
    },
    /// Matches only at the end of input, producing no node.
    EndOfInput,
}

impl ExprKind {
    /// True for kinds whose match is a single text leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            ExprKind::Literal { .. } | ExprKind::Pattern { .. } | ExprKind::EndOfInput
        )
    }

    fn default_label(&self) -> Arc<str> {
        match self {
            ExprKind::Literal { text } => format!("literal `{}`", text).into(),
            ExprKind::Pattern { source, .. } => format!("pattern `{}`", source).into(),
            ExprKind::Sequence(_) => "sequence".into(),
            ExprKind::Choice(_) => "one of the alternatives".into(),
            ExprKind::Repeat { .. } => "repetition".into(),
            ExprKind::Lookahead { positive: true, .. } => "lookahead".into(),
            ExprKind::Lookahead { .. } => "negative lookahead".into(),
            ExprKind::Forward { .. } => "forward rule".into(),
            ExprKind::ScanUntil { .. } => "end marker or inner markup".into(),
            ExprKind::Select { .. } => "contextual end token".into(),
            ExprKind::EndOfInput => "end of input".into(),
        }
    }
}

/// Metadata attached to an expression.
pub struct ExprMeta {
    /// Result label; a named match packs into a named node and the name is
    /// pushed on the context's name stack while matching.
    pub name: Option<Arc<str>>,
    /// Diagnostic label used in failures.
    pub err_label: Arc<str>,
    /// Pre-match validators.
    pub pre: Vec<PreAction>,
    /// Post-match validators.
    pub validate: Vec<ValidateAction>,
    /// Post-match actions.
    pub post: Vec<PostAction>,
    /// Plain-text action of a scan expression.
    pub pseudo: Option<PostAction>,
}

/// One-shot handle to an unbound forward cell.
#[derive(Debug)]
pub struct ForwardSlot(usize);

/// An immutable, finalized grammar.
pub struct Grammar {
    exprs: Vec<ExprKind>,
    metas: Vec<ExprMeta>,
    forwards: Vec<ExprId>,
    root: ExprId,
    fused: Vec<Option<FusedScan>>,
}

impl std::fmt::Debug for Grammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("expr_count", &self.exprs.len())
            .field("forwards", &self.forwards.len())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Grammar {
    /// Expression kind at `id`.
    #[inline]
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.exprs[id]
    }

    /// Metadata at `id`.
    #[inline]
    pub fn meta(&self, id: ExprId) -> &ExprMeta {
        &self.metas[id]
    }

    /// Resolved target of a forward cell.
    #[inline]
    pub fn forward_target(&self, slot: usize) -> ExprId {
        self.forwards[slot]
    }

    /// Fused scan for `id`, if the optimizer produced one.
    #[inline]
    pub fn fused(&self, id: ExprId) -> Option<&FusedScan> {
        self.fused[id].as_ref()
    }

    /// Root expression.
    #[inline]
    pub fn root(&self) -> ExprId {
        self.root
    }

    /// Number of expressions in the arena.
    #[inline]
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Run the regex-fusion pass over every choice and scan node. Nodes
    /// already fused are left untouched, so the pass is idempotent.
    pub fn optimize(&mut self) {
        crate::engine::fusion::optimize(self);
    }

    pub(crate) fn set_fused(&mut self, id: ExprId, scan: FusedScan) {
        self.fused[id] = Some(scan);
    }
}

/// Assembles a [`Grammar`].
pub struct GrammarBuilder {
    exprs: Vec<ExprKind>,
    metas: Vec<ExprMeta>,
    forwards: Vec<Option<ExprId>>,
}

impl GrammarBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self {
            exprs: Vec::new(),
            metas: Vec::new(),
            forwards: Vec::new(),
        }
    }

    fn push(&mut self, kind: ExprKind) -> ExprId {
        let id = self.exprs.len();
        let meta = ExprMeta {
            name: None,
            err_label: kind.default_label(),
            pre: Vec::new(),
            validate: Vec::new(),
            post: Vec::new(),
            pseudo: None,
        };
        self.exprs.push(kind);
        self.metas.push(meta);
        id
    }

    /// Literal string match.
    pub fn lit(&mut self, text: &str) -> ExprId {
        self.push(ExprKind::Literal {
            text: text.to_string(),
        })
    }

    /// Regex match with explicit flags; compiled eagerly so malformed
    /// patterns fail at build time.
    pub fn pattern(&mut self, source: &str, flags: RegexFlags) -> Result<ExprId, GrammarError> {
        let regex = regex_cache::compile(source, flags)?;
        Ok(self.push(ExprKind::Pattern {
            source: source.to_string(),
            flags,
            regex,
        }))
    }

    /// Children in order.
    pub fn seq(&mut self, items: Vec<ExprId>) -> ExprId {
        self.push(ExprKind::Sequence(items))
    }

    /// Ordered choice.
    pub fn choice(&mut self, alts: Vec<ExprId>) -> ExprId {
        self.push(ExprKind::Choice(alts))
    }

    /// Zero or one.
    pub fn opt(&mut self, item: ExprId) -> ExprId {
        self.push(ExprKind::Repeat {
            item,
            min: 0,
            max: Some(1),
        })
    }

    /// Zero or more.
    pub fn many0(&mut self, item: ExprId) -> ExprId {
        self.push(ExprKind::Repeat {
            item,
            min: 0,
            max: None,
        })
    }

    /// One or more.
    pub fn many1(&mut self, item: ExprId) -> ExprId {
        self.push(ExprKind::Repeat {
            item,
            min: 1,
            max: None,
        })
    }

    /// Bounded repetition.
    pub fn repeat(&mut self, item: ExprId, min: usize, max: Option<usize>) -> ExprId {
        self.push(ExprKind::Repeat { item, min, max })
    }

    /// Positive lookahead (must match, consumes nothing).
    pub fn ahead(&mut self, item: ExprId) -> ExprId {
        self.push(ExprKind::Lookahead {
            item,
            positive: true,
        })
    }

    /// Negative lookahead (must not match, consumes nothing).
    pub fn not_ahead(&mut self, item: ExprId) -> ExprId {
        self.push(ExprKind::Lookahead {
            item,
            positive: false,
        })
    }

    /// Fresh forward cell; returns the referencing expression and the
    /// one-shot binding handle.
    pub fn forward(&mut self) -> (ExprId, ForwardSlot) {
        let slot = self.forwards.len();
        self.forwards.push(None);
        let id = self.push(ExprKind::Forward { slot });
        (id, ForwardSlot(slot))
    }

    /// Bind a forward cell to its target. Consumes the handle; a second
    /// bind of the same slot is a build error.
    pub fn bind(&mut self, slot: ForwardSlot, target: ExprId) -> Result<(), GrammarError> {
        let cell = &mut self.forwards[slot.0];
        if cell.is_some() {
            return Err(GrammarError::DoubleBind(slot.0));
        }
        *cell = Some(target);
        Ok(())
    }

    /// Scan for the end marker or one of the alternatives.
    pub fn scan_until(&mut self, alts: Vec<ExprId>, end: ExprId) -> ExprId {
        self.push(ExprKind::ScanUntil { alts, end })
    }

    /// Dynamic choice through a picker callback.
    pub fn select(&mut self, options: Vec<ExprId>, pick: PickAction) -> ExprId {
        self.push(ExprKind::Select { options, pick })
    }

    /// End-of-input assertion.
    pub fn end_of_input(&mut self) -> ExprId {
        self.push(ExprKind::EndOfInput)
    }

    /// Label the expression; its match packs into a named node.
    pub fn name(&mut self, id: ExprId, name: &str) -> ExprId {
        let name: Arc<str> = name.into();
        self.metas[id].err_label = name.clone();
        self.metas[id].name = Some(name);
        id
    }

    /// Attach a pre-match validator.
    pub fn pre(&mut self, id: ExprId, action: PreAction) -> ExprId {
        self.metas[id].pre.push(action);
        id
    }

    /// Attach a post-match validator.
    pub fn validate(&mut self, id: ExprId, action: ValidateAction) -> ExprId {
        self.metas[id].validate.push(action);
        id
    }

    /// Attach a post-match action.
    pub fn post(&mut self, id: ExprId, action: PostAction) -> ExprId {
        self.metas[id].post.push(action);
        id
    }

    /// Set the plain-text action of a scan expression.
    pub fn pseudo(&mut self, id: ExprId, action: PostAction) -> ExprId {
        self.metas[id].pseudo = Some(action);
        id
    }

    /// Finalize into an immutable grammar rooted at `root`. Fails if any
    /// forward cell was never bound.
    pub fn build(self, root: ExprId) -> Result<Grammar, GrammarError> {
        let mut forwards = Vec::with_capacity(self.forwards.len());
        for (slot, cell) in self.forwards.iter().enumerate() {
            match cell {
                Some(target) => forwards.push(*target),
                None => return Err(GrammarError::UnboundForward(slot)),
            }
        }
        let count = self.exprs.len();
        Ok(Grammar {
            exprs: self.exprs,
            metas: self.metas,
            forwards,
            root,
            fused: (0..count).map(|_| None).collect(),
        })
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}
