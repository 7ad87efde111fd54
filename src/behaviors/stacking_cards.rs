//! Scale-stack: cards pinned at staggered offsets shrink as the next one
//! slides over them.

use std::{cell::RefCell, rc::Rc};

use crate::{
    dom::{NodeId, StyleProps},
    error::ScrollFxResult,
    lifecycle::{Lifecycle, LifecycleState},
    options::Options,
    scroll::ScrubConfig,
    services::Services,
    threshold::{Edge, SpanEnd, Threshold},
};

use super::{ScrollAnimation, Target, guarded, query_all_logged, resolve_options, resolve_target};

pub const KIND: &str = "stacking-cards";

#[derive(Clone, Debug, PartialEq)]
pub struct StackingCardsOptions {
    pub card_selector: String,
    pub scale_amount: f64,
    pub base_top: f64,
    pub stagger_offset: f64,
    pub scroll_distance: f64,
}

impl StackingCardsOptions {
    pub fn defaults() -> Options {
        Options::new()
            .with("cardSelector", ".stack-card")
            .with("scaleAmount", 0.1)
            .with("baseTop", 100.0)
            .with("staggerOffset", 20.0)
            .with("scrollDistance", 600.0)
    }

    pub fn from_options(o: &Options) -> Self {
        Self {
            card_selector: o.text("cardSelector", ".stack-card"),
            scale_amount: o.number("scaleAmount", 0.1),
            base_top: o.number("baseTop", 100.0),
            stagger_offset: o.number("staggerOffset", 20.0),
            scroll_distance: o.number("scrollDistance", 600.0).max(0.0),
        }
    }
}

/// `1 - progress * scale_amount`, progress clamped to `[0, 1]`.
pub fn card_scale(progress: f64, scale_amount: f64) -> f64 {
    1.0 - progress.clamp(0.0, 1.0) * scale_amount
}

/// Static pin offset of card `index`; independent of scroll.
pub fn pinned_top(index: usize, base_top: f64, stagger_offset: f64) -> f64 {
    base_top + index as f64 * stagger_offset
}

struct Inner {
    lifecycle: Lifecycle,
    services: Services,
    root: Option<NodeId>,
    cards: Vec<NodeId>,
    options: StackingCardsOptions,
}

impl Inner {
    fn apply(&mut self, index: usize, progress: f64) {
        // the last card is never scaled
        if index + 1 >= self.cards.len() {
            return;
        }
        let scale = card_scale(progress, self.options.scale_amount);
        self.services
            .tween
            .set(self.cards[index], StyleProps::new().scale(scale));
    }
}

pub struct StackingCards {
    inner: Rc<RefCell<Inner>>,
}

impl StackingCards {
    pub fn new<'a>(services: &Services, target: impl Into<Target<'a>>, caller: &Options) -> Self {
        let root = resolve_target(services, target.into(), KIND);
        let options = root
            .map(|r| resolve_options(services, r, &StackingCardsOptions::defaults(), caller))
            .unwrap_or_else(|| StackingCardsOptions::defaults().merge(caller));
        let options = StackingCardsOptions::from_options(&options);

        let cards = match root {
            Some(r) => query_all_logged(&services.doc.borrow(), r, &options.card_selector, KIND),
            None => Vec::new(),
        };

        let inner = Rc::new(RefCell::new(Inner {
            lifecycle: Lifecycle::new(KIND),
            services: services.clone(),
            root,
            cards: cards.clone(),
            options: options.clone(),
        }));

        if root.is_none() {
            return Self { inner };
        }
        if cards.is_empty() {
            tracing::warn!(kind = KIND, selector = %options.card_selector, "no cards found, instance is inert");
            return Self { inner };
        }

        let alive = inner.borrow().lifecycle.alive_flag();
        for (i, card) in cards.iter().copied().enumerate() {
            let top = pinned_top(i, options.base_top, options.stagger_offset);
            services.tween.set(card, StyleProps::new().top(top));
            if i + 1 == cards.len() {
                continue;
            }
            let handle = services.scroll.observe_scrub(
                ScrubConfig {
                    trigger: card,
                    start: Threshold::new(Edge::Fraction(0.0), Edge::Pixels(top)),
                    end: SpanEnd::After(options.scroll_distance),
                    pin: false,
                },
                guarded(&inner, &alive, move |s: &mut Inner, p: f64| s.apply(i, p)),
            );
            inner.borrow_mut().lifecycle.observe(handle);
        }
        inner.borrow_mut().lifecycle.bind();
        Self { inner }
    }

    pub fn options(&self) -> StackingCardsOptions {
        self.inner.borrow().options.clone()
    }

    pub fn cards(&self) -> Vec<NodeId> {
        self.inner.borrow().cards.clone()
    }

    /// Drive card `index` directly, as its scrub observer would.
    pub fn update(&self, index: usize, progress: f64) -> ScrollFxResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.lifecycle.require_bound("update")?;
        inner.apply(index, progress);
        Ok(())
    }
}

impl ScrollAnimation for StackingCards {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn state(&self) -> LifecycleState {
        self.inner.borrow().lifecycle.state()
    }

    fn root(&self) -> Option<NodeId> {
        self.inner.borrow().root
    }

    fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        let was_bound = inner.lifecycle.state() != LifecycleState::Unbound;
        if !inner.lifecycle.destroy() || !was_bound {
            return;
        }
        for card in inner.cards.clone() {
            inner.services.tween.clear(card);
        }
    }

    fn live_handles(&self) -> usize {
        self.inner.borrow().lifecycle.live_handles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dom::Document, services::Simulation};
    use kurbo::Rect;

    fn page(n: usize) -> (Services, Simulation, Vec<NodeId>) {
        let mut doc = Document::new();
        let root = doc.create_element("section");
        doc.set_attr(root, "id", "stack");
        doc.append_child(doc.root(), root);
        let mut cards = Vec::new();
        for i in 0..n {
            let c = doc.create_element("div");
            doc.add_class(c, "stack-card");
            doc.set_rect(c, Rect::new(0.0, 1000.0 + 500.0 * i as f64, 400.0, 1400.0 + 500.0 * i as f64));
            doc.append_child(root, c);
            cards.push(c);
        }
        let (services, sim) = Services::simulated(doc, 800.0, 1);
        (services, sim, cards)
    }

    #[test]
    fn scale_spans_one_to_one_minus_amount() {
        assert_eq!(card_scale(0.0, 0.1), 1.0);
        assert_eq!(card_scale(1.0, 0.1), 0.9);
        assert_eq!(card_scale(7.0, 0.1), 0.9);
        assert_eq!(pinned_top(2, 100.0, 20.0), 140.0);
    }

    #[test]
    fn every_card_but_the_last_is_scrubbed() {
        let (services, sim, cards) = page(3);
        let stack = StackingCards::new(&services, "#stack", &Options::new());
        assert_eq!(stack.state(), LifecycleState::Bound);
        assert_eq!(sim.scroll.scrub_ids().len(), 2);

        for id in sim.scroll.scrub_ids() {
            sim.scroll.emit_progress(id, 0.0);
        }
        for c in &cards[..2] {
            assert_eq!(sim.doc.borrow().style(*c).scale, 1.0);
        }
        for id in sim.scroll.scrub_ids() {
            sim.scroll.emit_progress(id, 1.0);
        }
        for c in &cards[..2] {
            assert_eq!(sim.doc.borrow().style(*c).scale, 0.9);
        }
        let doc = sim.doc.borrow();
        assert_eq!(doc.style(cards[2]).scale, 1.0);
        assert_eq!(doc.style(cards[0]).top, Some(100.0));
        assert_eq!(doc.style(cards[2]).top, Some(140.0));
    }

    #[test]
    fn last_card_never_receives_a_scale() {
        let (services, _sim, cards) = page(2);
        let stack = StackingCards::new(&services, "#stack", &Options::new());
        stack.update(1, 1.0).unwrap();
        assert_eq!(services.doc.borrow().style(cards[1]).scale, 1.0);
    }

    #[test]
    fn repeated_progress_is_idempotent() {
        let (services, sim, cards) = page(2);
        let _stack = StackingCards::new(&services, "#stack", &Options::new());
        let id = sim.scroll.scrub_ids()[0];
        sim.scroll.emit_progress(id, 0.37);
        let first = sim.doc.borrow().style(cards[0]);
        sim.scroll.emit_progress(id, 0.37);
        assert_eq!(sim.doc.borrow().style(cards[0]), first);
    }

    #[test]
    fn attribute_options_override_caller() {
        let (services, sim, cards) = page(2);
        let root = services.doc.borrow().get_element_by_id("stack").unwrap();
        services
            .doc
            .borrow_mut()
            .set_attr(root, "data-anim-scale-amount", "0.15");
        let stack = StackingCards::new(&services, root, &Options::new().with("scaleAmount", 0.5));
        assert_eq!(stack.options().scale_amount, 0.15);
        sim.scroll.emit_progress(sim.scroll.scrub_ids()[0], 1.0);
        assert!((sim.doc.borrow().style(cards[0]).scale - 0.85).abs() < 1e-12);
    }

    #[test]
    fn unknown_attribute_keys_change_nothing() {
        let run = |extra: bool| {
            let (services, sim, cards) = page(3);
            if extra {
                let root = services.doc.borrow().get_element_by_id("stack").unwrap();
                let mut doc = services.doc.borrow_mut();
                doc.set_attr(root, "data-anim-made-up-key", "0.5");
                doc.set_attr(root, "data-anim-scale", "true");
            }
            let stack = StackingCards::new(&services, "#stack", &Options::new());
            for y in [0.0, 900.0, 1300.0, 2500.0] {
                sim.scroll.scroll_to(y);
            }
            let styles: Vec<_> = cards.iter().map(|c| sim.doc.borrow().style(*c)).collect();
            (stack.options(), sim.scroll.registrations(), styles)
        };
        assert_eq!(run(true), run(false));
    }

    #[test]
    fn missing_root_or_cards_yield_inert_instances() {
        let (services, sim, _) = page(0);
        let missing = StackingCards::new(&services, "#nope", &Options::new());
        assert_eq!(missing.state(), LifecycleState::Unbound);
        assert!(missing.update(0, 0.5).is_err());
        missing.destroy();
        missing.destroy();

        let empty = StackingCards::new(&services, "#stack", &Options::new());
        assert_eq!(empty.state(), LifecycleState::Unbound);
        assert_eq!(sim.scroll.registrations(), 0);
        empty.destroy();
    }

    #[test]
    fn unknown_node_id_yields_inert_instance() {
        let (services, sim, _) = page(2);
        let stale = StackingCards::new(&services, NodeId(999), &Options::new());
        assert_eq!(stale.state(), LifecycleState::Unbound);
        assert_eq!(stale.root(), None);
        assert_eq!(sim.scroll.registrations(), 0);
        stale.destroy();
    }

    #[test]
    fn destroy_stops_callbacks_including_in_flight_ones() {
        let (services, sim, cards) = page(2);
        let stack = StackingCards::new(&services, "#stack", &Options::new());
        let id = sim.scroll.scrub_ids()[0];
        sim.scroll.emit_progress(id, 0.5);
        stack.destroy();
        assert_eq!(stack.live_handles(), 0);
        assert_eq!(sim.scroll.live_observers(), 0);
        assert_eq!(sim.doc.borrow().style(cards[0]).scale, 1.0);

        sim.scroll.emit_progress_in_flight(id, 1.0);
        assert_eq!(sim.doc.borrow().style(cards[0]).scale, 1.0);
        assert!(stack.update(0, 1.0).is_err());
    }
}
