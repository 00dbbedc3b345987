//! Mutable parse-time context.
//!
//! One [`ParseContext`] lives for the duration of a single parse call. It
//! holds:
//!
//! - a stack of copy-on-write scopes ([`ScopeStack`]) so every combinator
//!   invocation can shadow ambient state (current indentation, quote
//!   character, ...) without mutating what its ancestors see;
//! - a parallel name stack recording which named rules are currently
//!   active, used for "must not be nested inside X" checks and for the
//!   dynamic end-token selection;
//! - a shared cooperative [`CancelToken`] polled after every committed
//!   token;
//! - a recursion-depth guard converting pathological nesting into an
//!   ordinary failure instead of a stack overflow.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::ParseOptions;
use crate::engine::error::MatchFail;

/// Default recursion-depth ceiling.
pub const DEFAULT_MAX_DEPTH: usize = 2000;

/// Cooperative cancellation flag shared between a parse and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the running parse aborts at its next poll.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Kind of block an indentation record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentKind {
    /// Plain indented text.
    Normal,
    /// Bullet list.
    UnorderedList,
    /// Numbered list.
    OrderedList,
}

/// Ambient indentation state: the width of the innermost active block and
/// what kind of block established it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentInfo {
    /// Leading-whitespace width of the block.
    pub level: usize,
    /// Kind of the block.
    pub kind: IndentKind,
}

impl IndentInfo {
    /// Normal-kind record at the given level.
    pub fn normal(level: usize) -> Self {
        Self {
            level,
            kind: IndentKind::Normal,
        }
    }
}

/// A value stored in a context scope.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeValue {
    /// Unsigned count (indentation widths).
    Usize(usize),
    /// Short string (quote characters).
    Str(Arc<str>),
    /// Indentation record.
    Indent(IndentInfo),
}

type Scope = im::HashMap<&'static str, ScopeValue>;

/// A stack of dictionaries with copy-on-write push semantics.
///
/// Pushing copies the current top (O(1) through the persistent map), so a
/// combinator invocation sees everything its ancestors wrote and can shadow
/// it freely; popping discards the shadow. Writes go either to the top
/// scope (visible to the current element and its children) or to the scope
/// directly below it (visible to the element's later siblings, surviving
/// the element's own pop).
#[derive(Debug, Clone)]
pub struct ScopeStack {
    base: Scope,
    stack: Vec<Scope>,
}

impl ScopeStack {
    /// Empty stack with an empty base scope.
    pub fn new() -> Self {
        Self {
            base: Scope::default(),
            stack: Vec::new(),
        }
    }

    /// Number of pushed scopes (the base is not counted).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn top(&self) -> &Scope {
        self.stack.last().unwrap_or(&self.base)
    }

    /// Push a copy of the current top scope.
    pub fn push(&mut self) {
        let copy = self.top().clone();
        self.stack.push(copy);
    }

    /// Pop the top scope. Popping the base is a no-op.
    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Read a value as seen by the current top scope.
    pub fn get(&self, key: &str) -> Option<&ScopeValue> {
        self.top().get(key)
    }

    /// Write into the top scope.
    pub fn set(&mut self, key: &'static str, value: ScopeValue) {
        match self.stack.last_mut() {
            Some(scope) => {
                scope.insert(key, value);
            }
            None => {
                self.base.insert(key, value);
            }
        }
    }

    /// Write into the scope directly below the top, so the value survives
    /// the current element's pop and becomes visible to its later siblings.
    pub fn set_outer(&mut self, key: &'static str, value: ScopeValue) {
        let n = self.stack.len();
        if n >= 2 {
            self.stack[n - 2].insert(key, value);
        } else {
            self.base.insert(key, value);
        }
    }

    /// Seed the base scope (before any push).
    pub fn seed(&mut self, key: &'static str, value: ScopeValue) {
        self.base.insert(key, value);
    }

    /// The current indentation record, if one is active.
    pub fn indent_info(&self) -> Option<IndentInfo> {
        match self.get("indentInfo") {
            Some(ScopeValue::Indent(info)) => Some(*info),
            _ => None,
        }
    }

    /// The most recently recorded line indentation width.
    pub fn last_indentation(&self) -> usize {
        match self.get("lastIndentation") {
            Some(ScopeValue::Usize(n)) => *n,
            _ => 0,
        }
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-parse mutable state handed to every combinator and action.
pub struct ParseContext {
    /// Copy-on-write scope stack.
    pub scopes: ScopeStack,
    /// Names of the named rules currently being matched, outermost first.
    pub name_stack: Vec<Arc<str>>,
    /// Immutable configuration for this parse.
    pub options: Arc<ParseOptions>,
    cancel: CancelToken,
    depth: usize,
    max_depth: usize,
}

impl ParseContext {
    /// Fresh context seeded with a normal indentation record at level 0.
    pub fn new(options: Arc<ParseOptions>, cancel: CancelToken) -> Self {
        let mut scopes = ScopeStack::new();
        scopes.seed("indentInfo", ScopeValue::Indent(IndentInfo::normal(0)));
        Self {
            scopes,
            name_stack: Vec::new(),
            options,
            cancel,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the recursion-depth ceiling.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Raise `Cancelled` if the token has been flipped.
    #[inline]
    pub fn poll_cancel(&self) -> Result<(), MatchFail> {
        if self.cancel.is_cancelled() {
            Err(MatchFail::Cancelled)
        } else {
            Ok(())
        }
    }

    /// The cancellation token of this parse.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// True if `name` is active anywhere on the name stack.
    pub fn name_active(&self, name: &str) -> bool {
        self.name_stack.iter().any(|n| &**n == name)
    }

    /// True if `name` is active *outside* the innermost named rule, i.e.
    /// the current rule is nested inside another `name`.
    pub fn nested_within(&self, name: &str) -> bool {
        let n = self.name_stack.len();
        if n < 2 {
            return false;
        }
        self.name_stack[..n - 1].iter().any(|s| &**s == name)
    }

    /// Enter one recursion level; fails fatally past the ceiling.
    #[inline]
    pub(crate) fn enter(&mut self, position: usize) -> Result<(), MatchFail> {
        if self.depth >= self.max_depth {
            return Err(MatchFail::fatal(position, "recursion limit"));
        }
        self.depth += 1;
        Ok(())
    }

    /// Leave one recursion level.
    #[inline]
    pub(crate) fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_copies_top() {
        let mut scopes = ScopeStack::new();
        scopes.seed("indentInfo", ScopeValue::Indent(IndentInfo::normal(0)));
        scopes.push();
        scopes.set("lastIndentation", ScopeValue::Usize(4));
        scopes.push();
        // Inherited from the parent copy.
        assert_eq!(scopes.last_indentation(), 4);
        scopes.set("lastIndentation", ScopeValue::Usize(8));
        scopes.pop();
        // Shadow discarded with the popped scope.
        assert_eq!(scopes.last_indentation(), 4);
    }

    #[test]
    fn test_set_outer_survives_pop() {
        let mut scopes = ScopeStack::new();
        scopes.push(); // parent
        scopes.push(); // child
        scopes.set_outer("lastIndentation", ScopeValue::Usize(2));
        // Not visible to the child's own (already copied) top...
        assert_eq!(scopes.last_indentation(), 0);
        scopes.pop();
        // ...but visible after the child popped.
        assert_eq!(scopes.last_indentation(), 2);
    }

    #[test]
    fn test_nested_within_excludes_innermost() {
        let mut ctx = ParseContext::new(Arc::new(ParseOptions::default()), CancelToken::new());
        ctx.name_stack.push("bold".into());
        assert!(!ctx.nested_within("bold"));
        ctx.name_stack.push("bold".into());
        assert!(ctx.nested_within("bold"));
    }

    #[test]
    fn test_cancel_token_polls() {
        let token = CancelToken::new();
        let ctx = ParseContext::new(Arc::new(ParseOptions::default()), token.clone());
        assert!(ctx.poll_cancel().is_ok());
        token.cancel();
        assert_eq!(ctx.poll_cancel(), Err(MatchFail::Cancelled));
    }

    #[test]
    fn test_depth_guard() {
        let mut ctx = ParseContext::new(Arc::new(ParseOptions::default()), CancelToken::new())
            .with_max_depth(2);
        assert!(ctx.enter(0).is_ok());
        assert!(ctx.enter(0).is_ok());
        assert!(ctx.enter(0).is_err());
        ctx.exit();
        ctx.exit();
        assert!(ctx.enter(0).is_ok());
    }
}
