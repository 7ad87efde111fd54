//! Scroll-driven behaviors.
//!
//! Each behavior splits into a pure mapping (`progress -> StyleProps`) and an
//! instance type that owns subscriptions and writes the mapped state through
//! the collaborators in [`Services`].

use std::{cell::RefCell, rc::Rc};

use kurbo::Rect;

use crate::{
    dom::{Document, NodeId},
    lifecycle::{AliveFlag, LifecycleState},
    options::{self, Options},
    services::Services,
};

pub mod mask_reveal;
pub mod parallax_reveal;
pub mod progress_indicator;
pub mod scale_grow;
pub mod stacking_cards;
pub mod text_explosion;
pub mod word_burst;

pub use mask_reveal::MaskReveal;
pub use parallax_reveal::ParallaxReveal;
pub use progress_indicator::ProgressIndicator;
pub use scale_grow::ScaleGrow;
pub use stacking_cards::StackingCards;
pub use text_explosion::TextExplosion;
pub use word_burst::WordBurst;

/// Surface shared by every instance.
///
/// All methods are safe in every lifecycle state; on an unbound or destroyed
/// instance they do nothing.
pub trait ScrollAnimation {
    /// Canonical registry name.
    fn kind(&self) -> &'static str;

    fn state(&self) -> LifecycleState;

    /// Root element, if one was resolved.
    fn root(&self) -> Option<NodeId>;

    /// Restore pre-trigger visual state and re-arm one-shot behaviors.
    fn reset(&self) {}

    /// Re-measure geometry after a resize or reflow.
    fn refresh(&self) {}

    /// Release every handle and remove every node this instance created.
    fn destroy(&self);

    /// Observation, tween and timer handles still alive.
    fn live_handles(&self) -> usize;
}

/// Root of a programmatically constructed instance.
#[derive(Clone, Copy, Debug)]
pub enum Target<'a> {
    Selector(&'a str),
    Node(NodeId),
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(s: &'a str) -> Self {
        Self::Selector(s)
    }
}

impl From<NodeId> for Target<'_> {
    fn from(n: NodeId) -> Self {
        Self::Node(n)
    }
}

/// Resolve the root element; a miss is logged and yields `None`.
pub(crate) fn resolve_target(services: &Services, target: Target<'_>, kind: &str) -> Option<NodeId> {
    let doc = services.doc.borrow();
    let found = match target {
        Target::Node(n) => doc.is_connected(n).then_some(n),
        Target::Selector(sel) => match doc.query(doc.root(), sel) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(kind, selector = sel, %err, "invalid root selector");
                None
            }
        },
    };
    if found.is_none() {
        tracing::warn!(kind, target = ?target, "root element not found, instance is inert");
    }
    found
}

/// `defaults < caller < <prefix>-* attributes of root`.
pub(crate) fn resolve_options(
    services: &Services,
    root: NodeId,
    defaults: &Options,
    caller: &Options,
) -> Options {
    let attrs = options::resolve(&services.doc.borrow(), root, &services.config.option_prefix);
    Options::layered(defaults, caller, &attrs)
}

/// Query inside `scope`, logging (not failing) on a bad selector.
pub(crate) fn query_all_logged(doc: &Document, scope: NodeId, selector: &str, kind: &str) -> Vec<NodeId> {
    doc.query_all(scope, selector).unwrap_or_else(|err| {
        tracing::warn!(kind, selector, %err, "invalid selector");
        Vec::new()
    })
}

/// Wrap an instance method as a scroll callback.
///
/// The callback does nothing once `alive` is cleared or the instance has
/// been dropped, so a dispatch already queued when `destroy` runs cannot
/// touch instance state.
pub(crate) fn guarded<T: 'static, A: 'static>(
    inner: &Rc<RefCell<T>>,
    alive: &AliveFlag,
    f: impl Fn(&mut T, A) + 'static,
) -> Box<dyn FnMut(A)> {
    let weak = Rc::downgrade(inner);
    let alive = alive.clone();
    Box::new(move |arg| {
        if !alive.get() {
            return;
        }
        let Some(inner) = weak.upgrade() else {
            return;
        };
        match inner.try_borrow_mut() {
            Ok(mut state) => f(&mut state, arg),
            Err(_) => tracing::debug!("re-entrant callback dropped"),
        }
    })
}

/// One-shot variant of [`guarded`] for timers.
pub(crate) fn guarded_once<T: 'static>(
    inner: &Rc<RefCell<T>>,
    alive: &AliveFlag,
    f: impl FnOnce(&mut T) + 'static,
) -> Box<dyn FnOnce()> {
    let weak = Rc::downgrade(inner);
    let alive = alive.clone();
    Box::new(move || {
        if !alive.get() {
            return;
        }
        let Some(inner) = weak.upgrade() else {
            return;
        };
        match inner.try_borrow_mut() {
            Ok(mut state) => f(&mut state),
            Err(_) => tracing::debug!("re-entrant timer dropped"),
        }
    })
}

/// Text of `host` split into owned child nodes.
#[derive(Clone, Debug)]
pub(crate) struct SplitText {
    host: NodeId,
    original: String,
    /// Every created node, whitespace included.
    parts: Vec<NodeId>,
    /// Non-whitespace parts.
    pub(crate) tracked: Vec<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SplitBy {
    Chars,
    Words,
}

impl SplitText {
    /// Replace the text of `host` with one child per character or word.
    ///
    /// Parts are laid out on one line across the host box in proportion to
    /// their character count; hosts with real layout overwrite the rects and
    /// call `refresh`.
    pub(crate) fn split(doc: &mut Document, host: NodeId, by: SplitBy, class: &str) -> Self {
        let original = doc.text(host).to_string();
        let pieces: Vec<String> = match by {
            SplitBy::Chars => original.chars().map(String::from).collect(),
            SplitBy::Words => split_words_keep_space(&original),
        };
        doc.set_text(host, "");

        let host_rect = doc.rect(host);
        let total: usize = pieces.iter().map(|p| p.chars().count()).sum::<usize>().max(1);
        let unit = host_rect.width() / total as f64;
        let mut x = host_rect.x0;

        let mut parts = Vec::with_capacity(pieces.len());
        let mut tracked = Vec::new();
        for piece in pieces {
            let node = doc.create_element("span");
            let w = unit * piece.chars().count() as f64;
            doc.set_rect(node, Rect::new(x, host_rect.y0, x + w, host_rect.y1));
            x += w;
            let blank = piece.trim().is_empty();
            doc.set_text(node, piece);
            doc.append_child(host, node);
            if !blank {
                doc.add_class(node, class);
                tracked.push(node);
            }
            parts.push(node);
        }
        Self {
            host,
            original,
            parts,
            tracked,
        }
    }

    /// Remove every created node and restore the original text.
    pub(crate) fn revert(&self, doc: &mut Document) {
        for part in &self.parts {
            doc.remove(*part);
        }
        doc.set_text(self.host, self.original.clone());
    }
}

fn split_words_keep_space(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut cur_blank = None;
    for c in text.chars() {
        let blank = c.is_whitespace();
        if cur_blank.is_some_and(|b| b != blank) {
            out.push(std::mem::take(&mut cur));
        }
        cur.push(c);
        cur_blank = Some(blank);
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}
