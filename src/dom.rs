//! In-memory page model.
//!
//! `Document` is the engine's view of the host page: a node arena with
//! attributes, classes, text, live bounding boxes, and the style state the
//! behaviors write to. A host adapter mirrors it into a real DOM; tests and the
//! CLI use it directly.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use kurbo::{Rect, Vec2};

use crate::error::{ScrollFxError, ScrollFxResult};

/// Document shared between the composition root, collaborators and instances.
pub type SharedDocument = Rc<RefCell<Document>>;

/// Handle to a node inside one [`Document`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(pub usize);

/// Clip inset in percent of the element box, per side.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipInset {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl ClipInset {
    pub const NONE: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

/// Visual state of a node as last written by the engine.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Style {
    pub translate: Vec2,
    pub scale: f64,
    pub rotation_deg: f64,
    pub opacity: f64,
    pub clip: ClipInset,
    /// Pinned offset from the viewport top, in px.
    pub top: Option<f64>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
            rotation_deg: 0.0,
            opacity: 1.0,
            clip: ClipInset::NONE,
            top: None,
        }
    }
}

/// Partial style update. `None` fields are left untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct StyleProps {
    pub translate: Option<Vec2>,
    pub scale: Option<f64>,
    pub rotation_deg: Option<f64>,
    pub opacity: Option<f64>,
    pub clip: Option<ClipInset>,
    pub top: Option<f64>,
}

impl StyleProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(mut self, v: Vec2) -> Self {
        self.translate = Some(v);
        self
    }

    pub fn scale(mut self, s: f64) -> Self {
        self.scale = Some(s);
        self
    }

    pub fn rotation_deg(mut self, r: f64) -> Self {
        self.rotation_deg = Some(r);
        self
    }

    pub fn opacity(mut self, o: f64) -> Self {
        self.opacity = Some(o);
        self
    }

    pub fn clip(mut self, c: ClipInset) -> Self {
        self.clip = Some(c);
        self
    }

    pub fn top(mut self, px: f64) -> Self {
        self.top = Some(px);
        self
    }

    /// Props that put a node back to the default (identity) style.
    pub fn identity() -> Self {
        Self::new()
            .translate(Vec2::ZERO)
            .scale(1.0)
            .rotation_deg(0.0)
            .opacity(1.0)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Style {
    pub fn apply(&mut self, props: &StyleProps) {
        if let Some(v) = props.translate {
            self.translate = v;
        }
        if let Some(s) = props.scale {
            self.scale = s;
        }
        if let Some(r) = props.rotation_deg {
            self.rotation_deg = r;
        }
        if let Some(o) = props.opacity {
            self.opacity = o;
        }
        if let Some(c) = props.clip {
            self.clip = c;
        }
        if let Some(t) = props.top {
            self.top = Some(t);
        }
    }
}

#[derive(Clone, Debug)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    classes: Vec<String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    rect: Rect,
    style: Style,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            classes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
            rect: Rect::ZERO,
            style: Style::default(),
        }
    }
}

/// Simple selector understood by [`Document::query_all`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
    Tag(String),
}

impl Selector {
    pub fn parse(s: &str) -> ScrollFxResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ScrollFxError::config("selector must be non-empty"));
        }
        if let Some(id) = s.strip_prefix('#') {
            return Ok(Self::Id(id.to_string()));
        }
        if let Some(class) = s.strip_prefix('.') {
            return Ok(Self::Class(class.to_string()));
        }
        if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            return Ok(match inner.split_once('=') {
                Some((name, value)) => Self::Attr {
                    name: name.trim().to_string(),
                    value: Some(value.trim().trim_matches(['"', '\'']).to_string()),
                },
                None => Self::Attr {
                    name: inner.trim().to_string(),
                    value: None,
                },
            });
        }
        if s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Ok(Self::Tag(s.to_ascii_lowercase()));
        }
        Err(ScrollFxError::config(format!("unsupported selector '{s}'")))
    }

    fn matches(&self, node: &Node) -> bool {
        match self {
            Self::Id(id) => node.attrs.get("id").is_some_and(|v| v == id),
            Self::Class(class) => node.classes.iter().any(|c| c == class),
            Self::Attr { name, value } => match (node.attrs.get(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            },
            Self::Tag(tag) => &node.tag == tag,
        }
    }
}

/// Node arena rooted at a `body` node.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("body")],
        }
    }

    pub fn into_shared(self) -> SharedDocument {
        Rc::new(RefCell::new(self))
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// `true` when `id` names a slot of this document. Accessors below
    /// index the arena directly and expect ids that pass this check.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Create a detached node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Detach `node` (and its subtree) from the tree. Detached nodes keep
    /// their slot in the arena but are no longer reachable from the root.
    pub fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node_mut(node).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != node);
        }
    }

    /// `true` when `node` is reachable from the root. Ids outside the
    /// arena are never connected.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut cur = node;
        loop {
            if cur == self.root() {
                return true;
            }
            match self.nodes.get(cur.0).and_then(|n| n.parent) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.node(node).tag
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node).attrs.get(name).map(String::as_str)
    }

    pub fn attributes(&self, node: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.node(node)
            .attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        self.node_mut(node)
            .attrs
            .insert(name.to_string(), value.into());
    }

    pub fn element_id(&self, node: NodeId) -> Option<&str> {
        self.attr(node, "id")
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node).classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            self.node_mut(node).classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        self.node_mut(node).classes.retain(|c| c != class);
    }

    pub fn classes(&self, node: NodeId) -> &[String] {
        &self.node(node).classes
    }

    pub fn text(&self, node: NodeId) -> &str {
        &self.node(node).text
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        self.node_mut(node).text = text.into();
    }

    /// Live bounding box in page coordinates.
    pub fn rect(&self, node: NodeId) -> Rect {
        self.node(node).rect
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.node_mut(node).rect = rect;
    }

    pub fn style(&self, node: NodeId) -> Style {
        self.node(node).style
    }

    pub fn apply_style(&mut self, node: NodeId, props: &StyleProps) {
        self.node_mut(node).style.apply(props);
    }

    pub fn clear_style(&mut self, node: NodeId) {
        self.node_mut(node).style = Style::default();
    }

    /// Descendants of `scope` (excluding `scope`) in document order.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// All descendants of `scope` matching `selector`, in document order.
    pub fn query_all(&self, scope: NodeId, selector: &str) -> ScrollFxResult<Vec<NodeId>> {
        let sel = Selector::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .filter(|n| sel.matches(self.node(*n)))
            .collect())
    }

    pub fn query(&self, scope: NodeId, selector: &str) -> ScrollFxResult<Option<NodeId>> {
        Ok(self.query_all(scope, selector)?.into_iter().next())
    }

    pub fn find_with_attribute(&self, scope: NodeId, attr: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.node(*n).attrs.contains_key(attr))
            .collect()
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|n| self.element_id(*n) == Some(id))
    }

    /// Style snapshot of every connected node, in document order.
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.descendants(self.root())
            .into_iter()
            .map(|n| NodeSnapshot {
                node: n,
                id: self.element_id(n).map(str::to_string),
                tag: self.tag(n).to_string(),
                classes: self.classes(n).to_vec(),
                text: self.text(n).to_string(),
                style: self.style(n),
            })
            .collect()
    }

    /// Build a document from a serialized page description.
    pub fn from_page(page: &PageSpec) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        for el in &page.body {
            doc.build_element(root, el);
        }
        doc
    }

    fn build_element(&mut self, parent: NodeId, spec: &ElementSpec) {
        let node = self.create_element(&spec.tag);
        if let Some(id) = &spec.id {
            self.set_attr(node, "id", id.clone());
        }
        for (k, v) in &spec.attrs {
            self.set_attr(node, k, v.clone());
        }
        for class in &spec.classes {
            self.add_class(node, class);
        }
        if let Some(text) = &spec.text {
            self.set_text(node, text.clone());
        }
        if let Some([x, y, w, h]) = spec.rect {
            self.set_rect(node, Rect::new(x, y, x + w, y + h));
        }
        self.append_child(parent, node);
        for child in &spec.children {
            self.build_element(node, child);
        }
    }
}

/// One row of [`Document::snapshot`].
#[derive(Clone, Debug, serde::Serialize)]
pub struct NodeSnapshot {
    pub node: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tag: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    pub style: Style,
}

/// Serialized page description loaded by the CLI.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PageSpec {
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
    #[serde(default)]
    pub body: Vec<ElementSpec>,
}

fn default_viewport_height() -> f64 {
    800.0
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ElementSpec {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// `[x, y, width, height]` in page coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSpec>,
}

fn default_tag() -> String {
    "div".to_string()
}
