//! Syntax tree model.
//!
//! A successful parse produces a tree of [`SyntaxNode`]s: terminal text
//! leaves and non-terminal composites. Nodes carry their byte position in
//! the original text, an optional name (the rule or label that produced
//! them) and an open attribute bag for semantic data attached by grammar
//! actions.
//!
//! Invariants: children of a composite are contiguous and ordered by
//! position; the length of a composite is the sum of its children's lengths
//! and is computed lazily, cached, and explicitly invalidated when a rewrite
//! pass mutates the children.

use std::cell::Cell;
use std::sync::Arc;

/// Sentinel for "length not computed yet".
const LEN_UNCACHED: usize = usize::MAX;

/// Tagged value stored in a node's attribute bag.
///
/// Each grammar rule documents the fixed set of keys it writes; see the
/// markup grammar module for the per-rule key inventory.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// String value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
    /// Reference to a detached syntax node.
    Node(Box<SyntaxNode>),
    /// Ordered list of values.
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// String payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// List payload, if this is a `List`.
    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(l) => Some(l),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::Str(s) => serde_json::Value::String(s.clone()),
            AttrValue::Int(i) => serde_json::Value::from(*i),
            AttrValue::Bool(b) => serde_json::Value::from(*b),
            AttrValue::Node(n) => n.to_json(),
            AttrValue::List(l) => serde_json::Value::Array(l.iter().map(|v| v.to_json()).collect()),
        }
    }
}

/// Small ordered map of attribute key/value pairs.
///
/// Keys are the documented static names a rule writes; lookups are linear,
/// which beats hashing at the handful of entries a node ever carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrMap(Vec<(&'static str, AttrValue)>);

impl AttrMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Insert or replace the value for `key`.
    pub fn set(&mut self, key: &'static str, value: AttrValue) {
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// True when no attribute has been written.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AttrValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }
}

/// A text leaf: owns the matched slice of the input.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalNode {
    /// Byte offset of the matched text in the original input.
    pub pos: usize,
    /// The matched text.
    pub text: String,
    /// Rule or label that produced this leaf, if any.
    pub name: Option<Arc<str>>,
    /// Open attribute bag.
    pub attrs: AttrMap,
}

impl TerminalNode {
    /// New leaf at `pos` with no name.
    pub fn new(text: impl Into<String>, pos: usize) -> Self {
        Self {
            pos,
            text: text.into(),
            name: None,
            attrs: AttrMap::new(),
        }
    }

    /// New named leaf at `pos`.
    pub fn named(text: impl Into<String>, pos: usize, name: impl Into<Arc<str>>) -> Self {
        Self {
            pos,
            text: text.into(),
            name: Some(name.into()),
            attrs: AttrMap::new(),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True for the empty leaf.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// An ordered composite of child nodes.
pub struct NonTerminalNode {
    /// Byte offset of the first matched byte.
    pub pos: usize,
    /// Rule or label that produced this composite, if any.
    pub name: Option<Arc<str>>,
    /// Open attribute bag.
    pub attrs: AttrMap,
    children: Vec<SyntaxNode>,
    cached_len: Cell<usize>,
}

impl std::fmt::Debug for NonTerminalNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonTerminalNode")
            .field("pos", &self.pos)
            .field("name", &self.name)
            .field("attrs", &self.attrs)
            .field("children", &self.children)
            .finish()
    }
}

impl Clone for NonTerminalNode {
    fn clone(&self) -> Self {
        Self {
            pos: self.pos,
            name: self.name.clone(),
            attrs: self.attrs.clone(),
            children: self.children.clone(),
            cached_len: Cell::new(self.cached_len.get()),
        }
    }
}

// Cached length is derived state and must not affect equality.
impl PartialEq for NonTerminalNode {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
            && self.name == other.name
            && self.attrs == other.attrs
            && self.children == other.children
    }
}

impl NonTerminalNode {
    /// New composite over `children` starting at `pos`.
    pub fn new(children: Vec<SyntaxNode>, pos: usize, name: Option<Arc<str>>) -> Self {
        Self {
            pos,
            name,
            attrs: AttrMap::new(),
            children,
            cached_len: Cell::new(LEN_UNCACHED),
        }
    }

    /// Total length in bytes: sum of the children's lengths, cached after
    /// the first computation.
    pub fn len(&self) -> usize {
        let cached = self.cached_len.get();
        if cached != LEN_UNCACHED {
            return cached;
        }
        let len = self.children.iter().map(|c| c.len()).sum();
        self.cached_len.set(len);
        len
    }

    /// True when the composite covers no text.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the cached length; callers mutating children through
    /// [`children_mut`](Self::children_mut) get this automatically.
    pub fn invalidate_len(&self) {
        self.cached_len.set(LEN_UNCACHED);
    }

    /// The child nodes in order.
    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Child at `index`.
    pub fn child(&self, index: usize) -> Option<&SyntaxNode> {
        self.children.get(index)
    }

    /// Mutable access to the children; invalidates the cached length.
    pub fn children_mut(&mut self) -> &mut Vec<SyntaxNode> {
        self.cached_len.set(LEN_UNCACHED);
        &mut self.children
    }

    /// Replace the children wholesale; invalidates the cached length.
    pub fn set_children(&mut self, children: Vec<SyntaxNode>) {
        self.children = children;
        self.cached_len.set(LEN_UNCACHED);
    }

    /// Append a child; invalidates the cached length.
    pub fn push_child(&mut self, child: SyntaxNode) {
        self.children.push(child);
        self.cached_len.set(LEN_UNCACHED);
    }

    /// First child with the given name (one level deep).
    pub fn find_flat_by_name(&self, name: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.has_name(name))
    }

    /// All children with the given name (one level deep).
    pub fn iter_flat_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SyntaxNode> {
        self.children.iter().filter(move |c| c.has_name(name))
    }

    /// All descendants with the given name, depth first.
    pub fn deep_by_name<'a>(&'a self, name: &str, out: &mut Vec<&'a SyntaxNode>) {
        for child in &self.children {
            if child.has_name(name) {
                out.push(child);
            }
            if let SyntaxNode::NonTerminal(nt) = child {
                nt.deep_by_name(name, out);
            }
        }
    }

    /// First terminal leaf in document order.
    pub fn first_terminal(&self) -> Option<&TerminalNode> {
        for child in &self.children {
            match child {
                SyntaxNode::Terminal(t) => return Some(t),
                SyntaxNode::NonTerminal(nt) => {
                    if let Some(t) = nt.first_terminal() {
                        return Some(t);
                    }
                }
            }
        }
        None
    }

    /// Last terminal leaf in document order.
    pub fn last_terminal(&self) -> Option<&TerminalNode> {
        for child in self.children.iter().rev() {
            match child {
                SyntaxNode::Terminal(t) => return Some(t),
                SyntaxNode::NonTerminal(nt) => {
                    if let Some(t) = nt.last_terminal() {
                        return Some(t);
                    }
                }
            }
        }
        None
    }
}

/// A node of the syntax tree: terminal leaf or non-terminal composite.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    /// Text leaf.
    Terminal(TerminalNode),
    /// Ordered composite.
    NonTerminal(NonTerminalNode),
}

impl SyntaxNode {
    /// Byte offset of the node in the original input.
    pub fn pos(&self) -> usize {
        match self {
            SyntaxNode::Terminal(t) => t.pos,
            SyntaxNode::NonTerminal(nt) => nt.pos,
        }
    }

    /// Length in bytes (lazily computed for composites).
    pub fn len(&self) -> usize {
        match self {
            SyntaxNode::Terminal(t) => t.len(),
            SyntaxNode::NonTerminal(nt) => nt.len(),
        }
    }

    /// True when the node covers no text.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The node name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            SyntaxNode::Terminal(t) => t.name.as_deref(),
            SyntaxNode::NonTerminal(nt) => nt.name.as_deref(),
        }
    }

    /// True when the node carries exactly this name.
    pub fn has_name(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    /// Rename the node.
    pub fn set_name(&mut self, name: impl Into<Arc<str>>) {
        let name = Some(name.into());
        match self {
            SyntaxNode::Terminal(t) => t.name = name,
            SyntaxNode::NonTerminal(nt) => nt.name = name,
        }
    }

    /// The attribute bag.
    pub fn attrs(&self) -> &AttrMap {
        match self {
            SyntaxNode::Terminal(t) => &t.attrs,
            SyntaxNode::NonTerminal(nt) => &nt.attrs,
        }
    }

    /// Mutable attribute bag.
    pub fn attrs_mut(&mut self) -> &mut AttrMap {
        match self {
            SyntaxNode::Terminal(t) => &mut t.attrs,
            SyntaxNode::NonTerminal(nt) => &mut nt.attrs,
        }
    }

    /// True for terminal leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyntaxNode::Terminal(_))
    }

    /// Terminal view, if this is a leaf.
    pub fn as_terminal(&self) -> Option<&TerminalNode> {
        match self {
            SyntaxNode::Terminal(t) => Some(t),
            SyntaxNode::NonTerminal(_) => None,
        }
    }

    /// Composite view, if this is a non-terminal.
    pub fn as_non_terminal(&self) -> Option<&NonTerminalNode> {
        match self {
            SyntaxNode::NonTerminal(nt) => Some(nt),
            SyntaxNode::Terminal(_) => None,
        }
    }

    /// Mutable composite view, if this is a non-terminal.
    pub fn as_non_terminal_mut(&mut self) -> Option<&mut NonTerminalNode> {
        match self {
            SyntaxNode::NonTerminal(nt) => Some(nt),
            SyntaxNode::Terminal(_) => None,
        }
    }

    /// Append the full reconstructed text of this subtree to `out`.
    pub fn reconstruct_into(&self, out: &mut String) {
        match self {
            SyntaxNode::Terminal(t) => out.push_str(&t.text),
            SyntaxNode::NonTerminal(nt) => {
                for child in nt.children() {
                    child.reconstruct_into(out);
                }
            }
        }
    }

    /// Full reconstructed text of this subtree.
    pub fn reconstruct(&self) -> String {
        let mut out = String::with_capacity(self.len());
        self.reconstruct_into(&mut out);
        out
    }

    /// JSON dump of the tree for debugging and golden tests.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("pos".into(), serde_json::Value::from(self.pos()));
        obj.insert("len".into(), serde_json::Value::from(self.len()));
        if let Some(name) = self.name() {
            obj.insert("name".into(), serde_json::Value::String(name.to_string()));
        }
        if !self.attrs().is_empty() {
            let attrs: serde_json::Map<String, serde_json::Value> = self
                .attrs()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect();
            obj.insert("attrs".into(), serde_json::Value::Object(attrs));
        }
        match self {
            SyntaxNode::Terminal(t) => {
                obj.insert("text".into(), serde_json::Value::String(t.text.clone()));
            }
            SyntaxNode::NonTerminal(nt) => {
                obj.insert(
                    "children".into(),
                    serde_json::Value::Array(nt.children().iter().map(|c| c.to_json()).collect()),
                );
            }
        }
        serde_json::Value::Object(obj)
    }

    /// Indented one-node-per-line dump, convenient in test assertions.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.pretty_into(0, &mut out);
        out
    }

    fn pretty_into(&self, indent: usize, out: &mut String) {
        for _ in 0..indent {
            out.push(' ');
        }
        match self {
            SyntaxNode::Terminal(t) => {
                out.push_str(&format!(
                    "T({}, {}, {:?}, {:?})\n",
                    t.pos,
                    t.len(),
                    t.name.as_deref().unwrap_or(""),
                    t.text
                ));
            }
            SyntaxNode::NonTerminal(nt) => {
                out.push_str(&format!(
                    "N({}, {}, {:?})\n",
                    nt.pos,
                    nt.len(),
                    nt.name.as_deref().unwrap_or("")
                ));
                for child in nt.children() {
                    child.pretty_into(indent + 2, out);
                }
            }
        }
    }
}
