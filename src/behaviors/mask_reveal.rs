//! One-shot reveal: a clip or an injected mask slides away the first time
//! the element crosses its threshold.

use std::{cell::RefCell, rc::Rc};

use kurbo::Vec2;

use crate::{
    dom::{ClipInset, NodeId, StyleProps},
    ease::Ease,
    error::ScrollFxResult,
    lifecycle::{Lifecycle, LifecycleState},
    options::Options,
    scroll::{BoundaryConfig, BoundaryEvent},
    services::Services,
    threshold::{Edge, Threshold},
    tween::TweenSpec,
};

use super::{ScrollAnimation, Target, guarded, resolve_options, resolve_target};

pub const KIND: &str = "mask-reveal";

const DEFAULT_THRESHOLD: Threshold = Threshold::new(Edge::Fraction(0.0), Edge::Fraction(0.8));

/// Side the content is revealed from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub enum Direction {
    #[default]
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Unrecognized values fall back to [`Direction::Left`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Self::Left,
            "right" => Self::Right,
            "up" | "top" => Self::Up,
            "down" | "bottom" => Self::Down,
            other => {
                tracing::debug!(direction = other, "unknown direction, using left");
                Self::Left
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaskRevealOptions {
    pub direction: Direction,
    pub threshold: Threshold,
    pub duration: f64,
    pub ease: Ease,
    pub use_clip_path: bool,
    pub reset_on_leave_back: bool,
}

impl MaskRevealOptions {
    pub fn defaults() -> Options {
        Options::new()
            .with("direction", "left")
            .with("threshold", "top 80%")
            .with("duration", 1.2)
            .with("ease", "power3.inOut")
            .with("useClipPath", true)
            .with("resetOnLeaveBack", true)
    }

    pub fn from_options(o: &Options) -> Self {
        Self {
            direction: Direction::parse(&o.text("direction", "left")),
            threshold: Threshold::parse_or(&o.text("threshold", "top 80%"), DEFAULT_THRESHOLD),
            duration: o.number("duration", 1.2).max(0.0),
            ease: Ease::from_name(&o.text("ease", "power3.inOut")).unwrap_or(Ease::InOutQuart),
            use_clip_path: o.boolean("useClipPath", true),
            reset_on_leave_back: o.boolean("resetOnLeaveBack", true),
        }
    }
}

/// Clip inset that hides the element entirely, opening from `dir`.
pub fn hidden_clip(dir: Direction) -> ClipInset {
    match dir {
        Direction::Left => ClipInset::new(0.0, 100.0, 0.0, 0.0),
        Direction::Right => ClipInset::new(0.0, 0.0, 0.0, 100.0),
        Direction::Up => ClipInset::new(100.0, 0.0, 0.0, 0.0),
        Direction::Down => ClipInset::new(0.0, 0.0, 100.0, 0.0),
    }
}

/// Offset that moves a mask of `size` fully off the element, uncovering
/// it from `dir`.
pub fn mask_exit(dir: Direction, size: Vec2) -> Vec2 {
    match dir {
        Direction::Left => Vec2::new(size.x, 0.0),
        Direction::Right => Vec2::new(-size.x, 0.0),
        Direction::Up => Vec2::new(0.0, -size.y),
        Direction::Down => Vec2::new(0.0, size.y),
    }
}

/// Node that is animated, with its pre-trigger and revealed props.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Plan {
    node: NodeId,
    hidden: StyleProps,
    revealed: StyleProps,
}

struct Inner {
    lifecycle: Lifecycle,
    services: Services,
    root: Option<NodeId>,
    options: MaskRevealOptions,
    plan: Option<Plan>,
    /// Mask overlay this instance injected, if any.
    mask: Option<NodeId>,
}

impl Inner {
    fn on_boundary(&mut self, ev: BoundaryEvent) {
        match ev {
            BoundaryEvent::Enter => {
                self.reveal();
            }
            BoundaryEvent::LeaveBack if self.options.reset_on_leave_back => self.reset(),
            _ => {}
        }
    }

    fn reveal(&mut self) -> bool {
        let Some(plan) = self.plan else {
            return false;
        };
        if !self.lifecycle.trigger() {
            return false;
        }
        let handle = self.services.tween.tween(
            plan.node,
            TweenSpec::new(plan.revealed, self.options.duration, self.options.ease),
        );
        self.lifecycle.transient(handle);
        true
    }

    fn reset(&mut self) {
        let Some(plan) = self.plan else {
            return;
        };
        if self.lifecycle.state() == LifecycleState::Destroyed {
            return;
        }
        self.lifecycle.cancel_transient();
        self.services.tween.set(plan.node, plan.hidden);
        self.lifecycle.rearm();
    }
}

pub struct MaskReveal {
    inner: Rc<RefCell<Inner>>,
}

impl MaskReveal {
    pub fn new<'a>(services: &Services, target: impl Into<Target<'a>>, caller: &Options) -> Self {
        let root = resolve_target(services, target.into(), KIND);
        let merged = match root {
            Some(r) => resolve_options(services, r, &MaskRevealOptions::defaults(), caller),
            None => MaskRevealOptions::defaults().merge(caller),
        };
        let options = MaskRevealOptions::from_options(&merged);

        let inner = Rc::new(RefCell::new(Inner {
            lifecycle: Lifecycle::new(KIND),
            services: services.clone(),
            root,
            options: options.clone(),
            plan: None,
            mask: None,
        }));
        let Some(root) = root else {
            return Self { inner };
        };

        let (plan, mask) = if options.use_clip_path {
            let plan = Plan {
                node: root,
                hidden: StyleProps::new().clip(hidden_clip(options.direction)),
                revealed: StyleProps::new().clip(ClipInset::NONE),
            };
            (plan, None)
        } else {
            let mut doc = services.doc.borrow_mut();
            let rect = doc.rect(root);
            let mask = doc.create_element("div");
            doc.add_class(mask, "scrollfx-mask");
            doc.set_rect(mask, rect);
            doc.append_child(root, mask);
            let plan = Plan {
                node: mask,
                hidden: StyleProps::new().translate(Vec2::ZERO),
                revealed: StyleProps::new()
                    .translate(mask_exit(options.direction, Vec2::new(rect.width(), rect.height()))),
            };
            (plan, Some(mask))
        };
        services.tween.set(plan.node, plan.hidden);

        let alive = inner.borrow().lifecycle.alive_flag();
        let handle = services.scroll.observe_boundary(
            BoundaryConfig {
                trigger: root,
                start: options.threshold,
                end: None,
            },
            guarded(&inner, &alive, |s: &mut Inner, ev: BoundaryEvent| {
                s.on_boundary(ev)
            }),
        );
        {
            let mut i = inner.borrow_mut();
            i.plan = Some(plan);
            i.mask = mask;
            i.lifecycle.observe(handle);
            i.lifecycle.bind();
        }
        Self { inner }
    }

    pub fn options(&self) -> MaskRevealOptions {
        self.inner.borrow().options.clone()
    }

    /// Injected mask overlay, when clip paths are disabled.
    pub fn mask(&self) -> Option<NodeId> {
        self.inner.borrow().mask
    }

    /// Fire the reveal as a threshold crossing would. `Ok(false)` when
    /// already triggered; an error when never bound or destroyed.
    pub fn reveal(&self) -> ScrollFxResult<bool> {
        let mut inner = self.inner.borrow_mut();
        inner.lifecycle.require_bound("reveal")?;
        Ok(inner.reveal())
    }
}

impl ScrollAnimation for MaskReveal {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn state(&self) -> LifecycleState {
        self.inner.borrow().lifecycle.state()
    }

    fn root(&self) -> Option<NodeId> {
        self.inner.borrow().root
    }

    fn reset(&self) {
        self.inner.borrow_mut().reset();
    }

    fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        let was_bound = inner.lifecycle.state() != LifecycleState::Unbound;
        if !inner.lifecycle.destroy() || !was_bound {
            return;
        }
        if let Some(mask) = inner.mask.take() {
            inner.services.doc.borrow_mut().remove(mask);
        }
        if let Some(root) = inner.root {
            inner.services.tween.clear(root);
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

    fn setup(attrs: &[(&str, &str)]) -> (Services, Simulation, NodeId) {
        let mut doc = Document::new();
        let el = doc.create_element("figure");
        doc.set_attr(el, "id", "pic");
        for (k, v) in attrs {
            doc.set_attr(el, k, *v);
        }
        doc.set_rect(el, Rect::new(0.0, 1000.0, 600.0, 1400.0));
        doc.append_child(doc.root(), el);
        let (services, sim) = Services::simulated(doc, 800.0, 1);
        (services, sim, el)
    }

    #[test]
    fn directions_fall_back_to_left() {
        assert_eq!(Direction::parse("RIGHT"), Direction::Right);
        assert_eq!(Direction::parse("diagonal"), Direction::Left);
        assert_eq!(Direction::parse(""), Direction::Left);
    }

    #[test]
    fn fires_once_per_armed_cycle() {
        let (services, sim, el) = setup(&[]);
        let reveal = MaskReveal::new(&services, "#pic", &Options::new());
        assert_eq!(sim.doc.borrow().style(el).clip, hidden_clip(Direction::Left));

        let id = sim.scroll.boundary_ids()[0];
        sim.scroll.emit_boundary(id, BoundaryEvent::Enter);
        sim.scroll.emit_boundary(id, BoundaryEvent::Enter);
        assert!(!reveal.reveal().unwrap());
        assert_eq!(sim.tween.call_count(), 1);
        assert_eq!(reveal.state(), LifecycleState::Triggered);
        assert_eq!(sim.doc.borrow().style(el).clip, ClipInset::NONE);

        reveal.reset();
        assert_eq!(reveal.state(), LifecycleState::Bound);
        assert_eq!(sim.doc.borrow().style(el).clip, hidden_clip(Direction::Left));

        sim.scroll.emit_boundary(id, BoundaryEvent::Enter);
        let calls = sim.tween.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
    }

    #[test]
    fn scrolling_back_above_start_rearms() {
        let (services, sim, el) = setup(&[]);
        let reveal = MaskReveal::new(&services, "#pic", &Options::new());
        // start = 1000 - 640 = 360
        sim.scroll.scroll_to(500.0);
        assert_eq!(reveal.state(), LifecycleState::Triggered);
        sim.scroll.scroll_to(100.0);
        assert_eq!(reveal.state(), LifecycleState::Bound);
        assert_eq!(sim.doc.borrow().style(el).clip, hidden_clip(Direction::Left));
        sim.scroll.scroll_to(500.0);
        assert_eq!(sim.tween.call_count(), 2);
    }

    #[test]
    fn mask_overlay_is_owned_and_removed() {
        let (services, sim, el) = setup(&[
            ("data-anim-use-clip-path", "false"),
            ("data-anim-direction", "up"),
        ]);
        let reveal = MaskReveal::new(&services, "#pic", &Options::new());
        let mask = reveal.mask().unwrap();
        assert!(sim.doc.borrow().is_connected(mask));
        assert_eq!(sim.doc.borrow().style(el).clip, ClipInset::NONE);

        assert!(reveal.reveal().unwrap());
        assert_eq!(
            sim.doc.borrow().style(mask).translate,
            Vec2::new(0.0, -400.0)
        );

        reveal.destroy();
        assert!(!sim.doc.borrow().is_connected(mask));
        assert_eq!(sim.scroll.live_observers(), 0);
        reveal.destroy();
        reveal.reset();
        assert_eq!(reveal.state(), LifecycleState::Destroyed);
        assert!(reveal.reveal().is_err());
    }

    #[test]
    fn in_flight_event_after_destroy_is_ignored() {
        let (services, sim, _) = setup(&[]);
        let reveal = MaskReveal::new(&services, "#pic", &Options::new());
        let id = sim.scroll.boundary_ids()[0];
        reveal.destroy();
        sim.scroll.emit_boundary_in_flight(id, BoundaryEvent::Enter);
        assert_eq!(sim.tween.call_count(), 0);
    }

    #[test]
    fn missing_root_is_inert() {
        let (services, sim, _) = setup(&[]);
        let reveal = MaskReveal::new(&services, ".absent", &Options::new());
        assert!(reveal.reveal().is_err());
        reveal.reset();
        reveal.destroy();
        assert_eq!(sim.scroll.registrations(), 0);
    }
}
