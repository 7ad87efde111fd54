//! Progress-indicator follower: a marker jumps to the item of whichever
//! section currently holds the middle of the viewport.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use kurbo::Vec2;

use crate::{
    dom::{NodeId, StyleProps},
    ease::Ease,
    handle::Disposable,
    lifecycle::{Lifecycle, LifecycleState},
    options::Options,
    scroll::{BoundaryConfig, BoundaryEvent},
    services::Services,
    threshold::{Edge, SpanEnd, Threshold},
    tween::TweenSpec,
};

use super::{
    ScrollAnimation, Target, guarded, guarded_once, query_all_logged, resolve_options,
    resolve_target,
};

pub const KIND: &str = "progress-indicator";

/// Section top reaches the viewport middle.
const BAND_START: Threshold = Threshold::new(Edge::Fraction(0.0), Edge::Fraction(0.5));
/// Section bottom reaches the viewport middle.
const BAND_END: Threshold = Threshold::new(Edge::Fraction(1.0), Edge::Fraction(0.5));

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressIndicatorOptions {
    pub section_selector: String,
    pub follower_selector: String,
    pub item_selector: String,
    pub padding: f64,
    pub item_height: f64,
    pub gap: f64,
    pub morph_duration: f64,
    pub morph_class: String,
    pub active_class: String,
    pub move_duration: f64,
    pub ease: Ease,
}

impl ProgressIndicatorOptions {
    pub fn defaults() -> Options {
        Options::new()
            .with("sectionSelector", "[data-progress-section]")
            .with("followerSelector", ".progress-follower")
            .with("itemSelector", ".progress-item")
            .with("padding", 8.0)
            .with("itemHeight", 24.0)
            .with("gap", 12.0)
            .with("morphDuration", 0.4)
            .with("morphClass", "is-morphing")
            .with("activeClass", "is-active")
            .with("moveDuration", 0.35)
            .with("ease", "power2.inOut")
    }

    pub fn from_options(o: &Options) -> Self {
        Self {
            section_selector: o.text("sectionSelector", "[data-progress-section]"),
            follower_selector: o.text("followerSelector", ".progress-follower"),
            item_selector: o.text("itemSelector", ".progress-item"),
            padding: o.number("padding", 8.0),
            item_height: o.number("itemHeight", 24.0),
            gap: o.number("gap", 12.0),
            morph_duration: o.number("morphDuration", 0.4).max(0.0),
            morph_class: o.text("morphClass", "is-morphing"),
            active_class: o.text("activeClass", "is-active"),
            move_duration: o.number("moveDuration", 0.35).max(0.0),
            ease: Ease::from_name(&o.text("ease", "power2.inOut")).unwrap_or(Ease::InOutCubic),
        }
    }
}

/// Follower y offset for the item at `index`.
pub fn follower_offset(index: usize, padding: f64, item_height: f64, gap: f64) -> f64 {
    padding + index as f64 * (item_height + gap)
}

struct Inner {
    this: Weak<RefCell<Inner>>,
    lifecycle: Lifecycle,
    services: Services,
    root: Option<NodeId>,
    options: ProgressIndicatorOptions,
    follower: Option<NodeId>,
    sections: Vec<NodeId>,
    items: Vec<NodeId>,
    active: Option<usize>,
    moving: Option<Disposable>,
    morph: Option<Disposable>,
}

impl Inner {
    fn on_boundary(&mut self, index: usize, ev: BoundaryEvent) {
        if ev.is_entering() {
            self.activate(index);
        }
    }

    fn activate(&mut self, index: usize) {
        if self.active == Some(index) || index >= self.sections.len() {
            return;
        }
        let Some(follower) = self.follower else {
            return;
        };
        tracing::debug!(kind = KIND, index, "section active");
        self.active = Some(index);

        {
            let mut doc = self.services.doc.borrow_mut();
            for (i, item) in self.items.iter().enumerate() {
                if i == index {
                    doc.add_class(*item, &self.options.active_class);
                } else {
                    doc.remove_class(*item, &self.options.active_class);
                }
            }
            doc.add_class(follower, &self.options.morph_class);
        }

        if let Some(prev) = self.moving.take() {
            prev.kill();
        }
        let o = &self.options;
        let y = follower_offset(index, o.padding, o.item_height, o.gap);
        let tween = self.services.tween.tween(
            follower,
            TweenSpec::new(
                StyleProps::new().translate(Vec2::new(0.0, y)),
                o.move_duration,
                o.ease,
            ),
        );
        self.moving = Some(tween.clone());
        self.lifecycle.transient(tween);
        self.hold_morph();
    }

    /// (Re)start the timer that clears the morph class.
    fn hold_morph(&mut self) {
        if let Some(prev) = self.morph.take() {
            prev.kill();
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let alive = self.lifecycle.alive_flag();
        let timer = self.services.timers.schedule(
            self.options.morph_duration,
            guarded_once(&this, &alive, |s: &mut Inner| s.end_morph()),
        );
        self.morph = Some(timer.clone());
        self.lifecycle.transient(timer);
    }

    fn end_morph(&mut self) {
        self.morph = None;
        if let Some(f) = self.follower {
            self.services
                .doc
                .borrow_mut()
                .remove_class(f, &self.options.morph_class);
        }
    }

    fn clear_classes(&mut self) {
        let mut doc = self.services.doc.borrow_mut();
        for item in &self.items {
            doc.remove_class(*item, &self.options.active_class);
        }
        if let Some(f) = self.follower {
            doc.remove_class(f, &self.options.morph_class);
        }
    }
}

pub struct ProgressIndicator {
    inner: Rc<RefCell<Inner>>,
}

impl ProgressIndicator {
    pub fn new<'a>(services: &Services, target: impl Into<Target<'a>>, caller: &Options) -> Self {
        let root = resolve_target(services, target.into(), KIND);
        let merged = match root {
            Some(r) => resolve_options(services, r, &ProgressIndicatorOptions::defaults(), caller),
            None => ProgressIndicatorOptions::defaults().merge(caller),
        };
        let options = ProgressIndicatorOptions::from_options(&merged);

        let inner = Rc::new_cyclic(|this| {
            RefCell::new(Inner {
                this: this.clone(),
                lifecycle: Lifecycle::new(KIND),
                services: services.clone(),
                root,
                options: options.clone(),
                follower: None,
                sections: Vec::new(),
                items: Vec::new(),
                active: None,
                moving: None,
                morph: None,
            })
        });
        let Some(root) = root else {
            return Self { inner };
        };

        let (follower, sections, items) = {
            let doc = services.doc.borrow();
            (
                query_all_logged(&doc, root, &options.follower_selector, KIND)
                    .first()
                    .copied(),
                query_all_logged(&doc, doc.root(), &options.section_selector, KIND),
                query_all_logged(&doc, root, &options.item_selector, KIND),
            )
        };
        let Some(follower) = follower else {
            tracing::warn!(kind = KIND, selector = %options.follower_selector, "follower not found, instance is inert");
            return Self { inner };
        };
        if sections.is_empty() {
            tracing::warn!(kind = KIND, selector = %options.section_selector, "no sections to track, instance is inert");
            return Self { inner };
        }
        if items.len() < sections.len() {
            tracing::debug!(kind = KIND, items = items.len(), sections = sections.len(), "fewer items than sections");
        }

        let alive = inner.borrow().lifecycle.alive_flag();
        let handles: Vec<Disposable> = sections
            .iter()
            .enumerate()
            .map(|(index, section)| {
                services.scroll.observe_boundary(
                    BoundaryConfig {
                        trigger: *section,
                        start: BAND_START,
                        end: Some(SpanEnd::At(BAND_END)),
                    },
                    guarded(&inner, &alive, move |s: &mut Inner, ev: BoundaryEvent| {
                        s.on_boundary(index, ev)
                    }),
                )
            })
            .collect();

        {
            let mut i = inner.borrow_mut();
            i.follower = Some(follower);
            i.sections = sections;
            i.items = items;
            for h in handles {
                i.lifecycle.observe(h);
            }
            i.lifecycle.bind();
        }
        Self { inner }
    }

    pub fn options(&self) -> ProgressIndicatorOptions {
        self.inner.borrow().options.clone()
    }

    /// Index of the active section, if any section has been entered.
    pub fn active(&self) -> Option<usize> {
        self.inner.borrow().active
    }

    pub fn follower(&self) -> Option<NodeId> {
        self.inner.borrow().follower
    }

    pub fn sections(&self) -> Vec<NodeId> {
        self.inner.borrow().sections.clone()
    }

    pub fn items(&self) -> Vec<NodeId> {
        self.inner.borrow().items.clone()
    }
}

impl ScrollAnimation for ProgressIndicator {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn state(&self) -> LifecycleState {
        self.inner.borrow().lifecycle.state()
    }

    fn root(&self) -> Option<NodeId> {
        self.inner.borrow().root
    }

    /// Drop the active section and park the follower on the first item.
    fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.lifecycle.state() != LifecycleState::Bound {
            return;
        }
        inner.lifecycle.cancel_transient();
        inner.moving = None;
        inner.morph = None;
        inner.active = None;
        inner.clear_classes();
        if let Some(f) = inner.follower {
            let y = inner.options.padding;
            inner
                .services
                .tween
                .set(f, StyleProps::new().translate(Vec2::new(0.0, y)));
        }
    }

    fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        let was_bound = inner.lifecycle.state() != LifecycleState::Unbound;
        if !inner.lifecycle.destroy() || !was_bound {
            return;
        }
        inner.moving = None;
        inner.morph = None;
        inner.clear_classes();
        if let Some(f) = inner.follower {
            inner.services.tween.clear(f);
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

    fn setup() -> (Services, Simulation) {
        let mut doc = Document::new();
        let nav = doc.create_element("nav");
        doc.set_attr(nav, "id", "toc");
        doc.append_child(doc.root(), nav);
        let follower = doc.create_element("div");
        doc.add_class(follower, "progress-follower");
        doc.append_child(nav, follower);
        for i in 0..3 {
            let item = doc.create_element("a");
            doc.add_class(item, "progress-item");
            doc.append_child(nav, item);

            let section = doc.create_element("section");
            doc.set_attr(section, "data-progress-section", "");
            let y = 1000.0 + 800.0 * i as f64;
            doc.set_rect(section, Rect::new(0.0, y, 800.0, y + 800.0));
            doc.append_child(doc.root(), section);
        }
        Services::simulated(doc, 800.0, 5)
    }

    fn follower_y(sim: &Simulation, fx: &ProgressIndicator) -> f64 {
        sim.doc.borrow().style(fx.follower().unwrap()).translate.y
    }

    #[test]
    fn offsets_step_by_item_and_gap() {
        assert_eq!(follower_offset(0, 8.0, 24.0, 12.0), 8.0);
        assert_eq!(follower_offset(2, 8.0, 24.0, 12.0), 80.0);
    }

    #[test]
    fn entering_and_reentering_sections_moves_the_follower() {
        let (services, sim) = setup();
        let fx = ProgressIndicator::new(&services, "#toc", &Options::new());
        assert_eq!(sim.scroll.boundary_ids().len(), 3);
        let items = fx.items();

        // section 0 band: 600..1400
        sim.scroll.scroll_to(700.0);
        assert_eq!(fx.active(), Some(0));
        assert_eq!(follower_y(&sim, &fx), 8.0);
        assert!(sim.doc.borrow().has_class(items[0], "is-active"));

        sim.scroll.scroll_to(1500.0);
        assert_eq!(fx.active(), Some(1));
        assert_eq!(follower_y(&sim, &fx), 44.0);
        assert!(!sim.doc.borrow().has_class(items[0], "is-active"));
        assert!(sim.doc.borrow().has_class(items[1], "is-active"));

        sim.scroll.scroll_to(1300.0);
        assert_eq!(fx.active(), Some(0));
        assert_eq!(follower_y(&sim, &fx), 8.0);
    }

    #[test]
    fn repeated_entry_does_not_retween() {
        let (services, sim) = setup();
        let fx = ProgressIndicator::new(&services, "#toc", &Options::new());
        let id = sim.scroll.boundary_ids()[1];
        sim.scroll.emit_boundary(id, BoundaryEvent::Enter);
        sim.scroll.emit_boundary(id, BoundaryEvent::EnterBack);
        assert_eq!(sim.tween.call_count(), 1);
        sim.scroll.emit_boundary(id, BoundaryEvent::Leave);
        assert_eq!(fx.active(), Some(1));
    }

    #[test]
    fn morph_class_is_held_then_cleared() {
        let (services, sim) = setup();
        let fx = ProgressIndicator::new(&services, "#toc", &Options::new());
        let follower = fx.follower().unwrap();
        let ids = sim.scroll.boundary_ids();

        sim.scroll.emit_boundary(ids[0], BoundaryEvent::Enter);
        assert!(sim.doc.borrow().has_class(follower, "is-morphing"));
        sim.timers.advance(0.3);
        sim.scroll.emit_boundary(ids[1], BoundaryEvent::Enter);
        assert_eq!(sim.timers.pending(), 1);

        sim.timers.advance(0.3);
        assert!(sim.doc.borrow().has_class(follower, "is-morphing"));
        sim.timers.advance(0.2);
        assert!(!sim.doc.borrow().has_class(follower, "is-morphing"));
    }

    #[test]
    fn section_changes_keep_one_move_in_flight() {
        let (services, sim) = setup();
        let fx = ProgressIndicator::new(&services, "#toc", &Options::new());
        let ids = sim.scroll.boundary_ids();
        sim.scroll.emit_boundary(ids[0], BoundaryEvent::Enter);
        sim.timers.advance(1.0);
        let base = fx.live_handles();

        for n in 0..200 {
            sim.scroll.emit_boundary(ids[(n + 1) % 2], BoundaryEvent::Enter);
            sim.timers.advance(1.0);
        }
        assert_eq!(fx.live_handles(), base);
        assert!(fx.live_handles() <= ids.len() + 2);
        assert_eq!(sim.tween.call_count(), 201);
    }

    #[test]
    fn destroy_clears_classes_and_timers() {
        let (services, sim) = setup();
        let fx = ProgressIndicator::new(&services, "#toc", &Options::new());
        let ids = sim.scroll.boundary_ids();
        sim.scroll.emit_boundary(ids[2], BoundaryEvent::Enter);
        let items = fx.items();

        fx.destroy();
        assert_eq!(sim.timers.pending(), 0);
        assert_eq!(sim.scroll.live_observers(), 0);
        assert!(!sim.doc.borrow().has_class(items[2], "is-active"));
        assert!(!sim.doc.borrow().has_class(fx.follower().unwrap(), "is-morphing"));

        sim.scroll.emit_boundary_in_flight(ids[0], BoundaryEvent::Enter);
        assert_eq!(fx.active(), Some(2));
        assert_eq!(sim.tween.call_count(), 1);
    }

    #[test]
    fn missing_follower_is_inert() {
        let mut doc = Document::new();
        let nav = doc.create_element("nav");
        doc.set_attr(nav, "id", "toc");
        doc.append_child(doc.root(), nav);
        let (services, sim) = Services::simulated(doc, 800.0, 5);
        let fx = ProgressIndicator::new(&services, "#toc", &Options::new());
        assert_eq!(fx.state(), LifecycleState::Unbound);
        assert_eq!(sim.scroll.registrations(), 0);
        fx.reset();
        fx.destroy();
    }
}
