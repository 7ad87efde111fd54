//! Static table of behaviors and attribute-driven discovery.
//!
//! The table is the single source of behavior names, numbers and aliases.

use std::collections::BTreeSet;

use crate::{
    behaviors::{
        MaskReveal, ParallaxReveal, ProgressIndicator, ScaleGrow, ScrollAnimation, StackingCards,
        TextExplosion, WordBurst, mask_reveal, parallax_reveal, progress_indicator, scale_grow,
        stacking_cards, text_explosion, word_burst,
    },
    dom::NodeId,
    error::{ScrollFxError, ScrollFxResult},
    options::Options,
    services::Services,
};

/// Builds a behavior on a resolved root element.
pub type Constructor = fn(&Services, NodeId, &Options) -> Box<dyn ScrollAnimation>;

/// One registry entry. Entries are process-wide and immutable.
#[derive(Debug)]
pub struct AnimationDescriptor {
    /// Numeric id usable in markup; `None` for name-only entries.
    pub number: Option<u8>,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub summary: &'static str,
    construct: Constructor,
}

impl AnimationDescriptor {
    pub fn construct(&self, services: &Services, root: NodeId, caller: &Options) -> Box<dyn ScrollAnimation> {
        (self.construct)(services, root, caller)
    }

    fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

static DESCRIPTORS: [AnimationDescriptor; 7] = [
    AnimationDescriptor {
        number: Some(1),
        name: stacking_cards::KIND,
        aliases: &["stack"],
        summary: "cards pin at staggered offsets and shrink as the next one scrolls over",
        construct: |s, n, o| Box::new(StackingCards::new(s, n, o)),
    },
    AnimationDescriptor {
        number: Some(2),
        name: scale_grow::KIND,
        aliases: &["image-scale"],
        summary: "element scales between two sizes over a scrubbed span",
        construct: |s, n, o| Box::new(ScaleGrow::new(s, n, o)),
    },
    AnimationDescriptor {
        number: Some(3),
        name: mask_reveal::KIND,
        aliases: &["reveal"],
        summary: "one-shot clip or mask reveal at a threshold",
        construct: |s, n, o| Box::new(MaskReveal::new(s, n, o)),
    },
    AnimationDescriptor {
        number: Some(4),
        name: text_explosion::KIND,
        aliases: &["explode"],
        summary: "pinned, phased burst of individual characters",
        construct: |s, n, o| Box::new(TextExplosion::new(s, n, o)),
    },
    AnimationDescriptor {
        number: Some(5),
        name: parallax_reveal::KIND,
        aliases: &["parallax"],
        summary: "media parallax and clip, then a staggered block reveal",
        construct: |s, n, o| Box::new(ParallaxReveal::new(s, n, o)),
    },
    AnimationDescriptor {
        number: Some(6),
        name: progress_indicator::KIND,
        aliases: &["progress"],
        summary: "follower marker tracking the section in view",
        construct: |s, n, o| Box::new(ProgressIndicator::new(s, n, o)),
    },
    AnimationDescriptor {
        number: None,
        name: word_burst::KIND,
        aliases: &["text-explosion-legacy"],
        summary: "one-shot radial burst of words with particles",
        construct: |s, n, o| Box::new(WordBurst::new(s, n, o)),
    },
];

/// Every registered behavior, numbered entries first.
pub fn descriptors() -> &'static [AnimationDescriptor] {
    &DESCRIPTORS
}

/// How markup names a behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discriminant<'a> {
    Number(u8),
    Name(&'a str),
}

impl<'a> Discriminant<'a> {
    /// `"1"` is a number, anything else is a name.
    pub fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        match raw.parse::<u8>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Name(raw),
        }
    }
}

impl From<u8> for Discriminant<'_> {
    fn from(n: u8) -> Self {
        Self::Number(n)
    }
}

impl<'a> From<&'a str> for Discriminant<'a> {
    fn from(s: &'a str) -> Self {
        Self::parse(s)
    }
}

/// Resolve a number, canonical name or alias. Names are case-insensitive.
pub fn lookup<'a>(discriminant: impl Into<Discriminant<'a>>) -> Option<&'static AnimationDescriptor> {
    match discriminant.into() {
        Discriminant::Number(n) => DESCRIPTORS.iter().find(|d| d.number == Some(n)),
        Discriminant::Name(name) => DESCRIPTORS.iter().find(|d| d.matches_name(name)),
    }
}

/// A behavior bound to a discovered element.
pub struct BoundInstance {
    pub id: String,
    pub node: NodeId,
    pub descriptor: &'static AnimationDescriptor,
    pub animation: Box<dyn ScrollAnimation>,
}

impl std::fmt::Debug for BoundInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundInstance")
            .field("id", &self.id)
            .field("node", &self.node)
            .field("kind", &self.descriptor.name)
            .field("state", &self.animation.state())
            .finish()
    }
}

/// Discovers annotated elements and binds each one at most once.
///
/// The set of bound ids only grows; destroying an instance does not make
/// its element eligible again.
#[derive(Debug)]
pub struct Registry {
    services: Services,
    bound: BTreeSet<String>,
    next_id: u64,
}

impl Registry {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            bound: BTreeSet::new(),
            next_id: 1,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn is_bound(&self, id: &str) -> bool {
        self.bound.contains(id)
    }

    pub fn bound_ids(&self) -> impl Iterator<Item = &str> {
        self.bound.iter().map(String::as_str)
    }

    /// Bind every element under `root` (inclusive) carrying the trigger
    /// attribute, in document order.
    ///
    /// Unknown behaviors and elements already bound are skipped with a
    /// warning; the call never fails.
    #[tracing::instrument(skip(self), fields(attr = %self.services.config.trigger_attribute))]
    pub fn discover_and_instantiate(&mut self, root: NodeId) -> Vec<BoundInstance> {
        let attr = self.services.config.trigger_attribute.clone();
        if !self.services.doc.borrow().is_connected(root) {
            tracing::warn!(root = root.0, "discovery root is not in the document");
            return Vec::new();
        }
        let found: Vec<(NodeId, String)> = {
            let doc = self.services.doc.borrow();
            let mut nodes = Vec::new();
            if doc.attr(root, &attr).is_some() {
                nodes.push(root);
            }
            nodes.extend(doc.find_with_attribute(root, &attr));
            nodes
                .into_iter()
                .map(|n| (n, doc.attr(n, &attr).unwrap_or_default().to_string()))
                .collect()
        };

        let mut out = Vec::with_capacity(found.len());
        for (node, raw) in found {
            let Some(descriptor) = lookup(raw.as_str()) else {
                tracing::warn!(node = node.0, value = %raw, "unknown animation, skipped");
                continue;
            };
            let id = self.ensure_id(node, descriptor.name);
            if !self.bound.insert(id.clone()) {
                tracing::warn!(%id, kind = descriptor.name, "element already bound, skipped");
                continue;
            }
            // no document borrow may be held here: constructors refresh the tracker
            let animation = descriptor.construct(&self.services, node, &Options::new());
            tracing::debug!(%id, kind = descriptor.name, state = ?animation.state(), "bound");
            out.push(BoundInstance {
                id,
                node,
                descriptor,
                animation,
            });
        }
        tracing::debug!(count = out.len(), "discovery finished");
        out
    }

    /// Bind one element programmatically through the table.
    pub fn instantiate<'a>(
        &mut self,
        discriminant: impl Into<Discriminant<'a>>,
        node: NodeId,
        caller: &Options,
    ) -> ScrollFxResult<BoundInstance> {
        let discriminant = discriminant.into();
        let descriptor = lookup(discriminant)
            .ok_or_else(|| ScrollFxError::config(format!("unknown animation {discriminant:?}")))?;
        if !self.services.doc.borrow().is_connected(node) {
            tracing::warn!(node = node.0, kind = descriptor.name, "element not in the document");
            return Err(ScrollFxError::element_not_found(format!("node {}", node.0)));
        }
        let id = self.ensure_id(node, descriptor.name);
        if !self.bound.insert(id.clone()) {
            return Err(ScrollFxError::config(format!("element {id} is already bound")));
        }
        let animation = descriptor.construct(&self.services, node, caller);
        Ok(BoundInstance {
            id,
            node,
            descriptor,
            animation,
        })
    }

    /// Existing element id, or a fresh `<prefix>-<name>-<n>` written to
    /// the element. Generated ids skip any id already in the document or
    /// already handed out.
    fn ensure_id(&mut self, node: NodeId, name: &str) -> String {
        let mut doc = self.services.doc.borrow_mut();
        if let Some(id) = doc.element_id(node).filter(|id| !id.trim().is_empty()) {
            return id.to_string();
        }
        let id = loop {
            let candidate = format!("{}-{}-{}", self.services.config.id_prefix, name, self.next_id);
            self.next_id += 1;
            if doc.get_element_by_id(&candidate).is_none() && !self.bound.contains(&candidate) {
                break candidate;
            }
        };
        doc.set_attr(node, "id", id.clone());
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dom::Document, lifecycle::LifecycleState};
    use kurbo::Rect;

    #[test]
    fn numbers_names_and_aliases_resolve_to_one_entry() {
        let by_number = lookup(1u8).unwrap();
        let by_name = lookup("stacking-cards").unwrap();
        assert!(std::ptr::eq(by_number, by_name));
        assert!(std::ptr::eq(lookup("stack").unwrap(), by_name));
        assert!(std::ptr::eq(lookup("1").unwrap(), by_name));
        assert!(std::ptr::eq(lookup(" Stacking-Cards ").unwrap(), by_name));
        assert_eq!(lookup(4u8).unwrap().name, "text-explosion");
        assert_eq!(lookup("text-explosion-legacy").unwrap().name, "word-burst");
    }

    #[test]
    fn unknown_discriminants_miss() {
        assert!(lookup(0u8).is_none());
        assert!(lookup(7u8).is_none());
        assert!(lookup("confetti").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn table_is_consistent() {
        let numbers: Vec<u8> = descriptors().iter().filter_map(|d| d.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
        let mut names = BTreeSet::new();
        for d in descriptors() {
            assert!(names.insert(d.name));
            for a in d.aliases {
                assert!(names.insert(*a), "duplicate alias {a}");
            }
        }
    }

    fn page() -> (Services, NodeId, NodeId) {
        let mut doc = Document::new();
        let a = doc.create_element("img");
        doc.set_attr(a, "data-scroll-anim", "2");
        doc.set_rect(a, Rect::new(0.0, 900.0, 400.0, 1200.0));
        doc.append_child(doc.root(), a);
        let bogus = doc.create_element("div");
        doc.set_attr(bogus, "data-scroll-anim", "99");
        doc.append_child(doc.root(), bogus);
        let b = doc.create_element("figure");
        doc.set_attr(b, "id", "hero");
        doc.set_attr(b, "data-scroll-anim", "reveal");
        doc.set_rect(b, Rect::new(0.0, 1500.0, 400.0, 1800.0));
        doc.append_child(doc.root(), b);
        let (services, _sim) = Services::simulated(doc, 800.0, 1);
        (services, a, b)
    }

    #[test]
    fn discovery_skips_misses_and_keeps_document_order() {
        let (services, a, b) = page();
        let mut registry = Registry::new(services.clone());
        let root = services.doc.borrow().root();
        let found = registry.discover_and_instantiate(root);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].node, a);
        assert_eq!(found[0].descriptor.name, "scale-grow");
        assert_eq!(found[0].id, "scrollfx-scale-grow-1");
        assert_eq!(services.doc.borrow().element_id(a), Some("scrollfx-scale-grow-1"));
        assert_eq!(found[1].node, b);
        assert_eq!(found[1].id, "hero");
        assert!(found.iter().all(|i| i.animation.state() == LifecycleState::Bound));
    }

    #[test]
    fn rediscovery_refuses_double_binding() {
        let (services, _, b) = page();
        let mut registry = Registry::new(services.clone());
        let root = services.doc.borrow().root();
        assert_eq!(registry.discover_and_instantiate(root).len(), 2);
        assert!(registry.discover_and_instantiate(root).is_empty());
        assert!(registry.instantiate("reveal", b, &Options::new()).is_err());
        assert_eq!(registry.bound_ids().count(), 2);
    }

    #[test]
    fn generated_ids_avoid_existing_ones() {
        let mut doc = Document::new();
        let taken = doc.create_element("div");
        doc.set_attr(taken, "id", "scrollfx-mask-reveal-1");
        doc.append_child(doc.root(), taken);
        let el = doc.create_element("div");
        doc.append_child(doc.root(), el);
        let (services, _sim) = Services::simulated(doc, 800.0, 1);
        let mut registry = Registry::new(services);
        let bound = registry.instantiate(3u8, el, &Options::new()).unwrap();
        assert_eq!(bound.id, "scrollfx-mask-reveal-2");
        assert!(matches!(
            registry.instantiate("nope", el, &Options::new()),
            Err(ScrollFxError::Config(_))
        ));
    }

    #[test]
    fn foreign_nodes_are_rejected_without_panicking() {
        let (services, ..) = page();
        let mut registry = Registry::new(services);
        assert!(registry.discover_and_instantiate(NodeId(999)).is_empty());
        assert!(matches!(
            registry.instantiate("stack", NodeId(999), &Options::new()),
            Err(ScrollFxError::ElementNotFound(_))
        ));
        assert_eq!(registry.bound_ids().count(), 0);
    }
}
