//! Legacy word-level burst: a one-shot radial explosion of words plus a
//! spray of injected particles, fired on a threshold crossing.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use kurbo::{Point, Rect};

use crate::{
    dom::{NodeId, StyleProps},
    ease::Ease,
    error::ScrollFxResult,
    lifecycle::{Lifecycle, LifecycleState},
    options::Options,
    scroll::{BoundaryConfig, BoundaryEvent},
    services::Services,
    threshold::{Edge, Threshold},
    tween::TweenSpec,
    vectors::{ExplosionVector, VectorParams, compute_vectors, reference_center},
};

use super::{
    ScrollAnimation, SplitBy, SplitText, Target, guarded, guarded_once, resolve_options,
    resolve_target,
};

pub const KIND: &str = "word-burst";

const DEFAULT_THRESHOLD: Threshold = Threshold::new(Edge::Fraction(0.0), Edge::Fraction(0.7));
const PARTICLE_SIZE: f64 = 6.0;

#[derive(Clone, Debug, PartialEq)]
pub struct WordBurstOptions {
    pub threshold: Threshold,
    pub duration: f64,
    pub stagger: f64,
    pub particle_count: usize,
    pub vectors: VectorParams,
    pub ease: Ease,
    pub word_class: String,
    pub particle_class: String,
    pub reset_on_leave_back: bool,
}

impl WordBurstOptions {
    pub fn defaults() -> Options {
        Options::new()
            .with("threshold", "top 70%")
            .with("duration", 1.0)
            .with("stagger", 0.04)
            .with("particleCount", 12.0)
            .with("minDistance", 120.0)
            .with("maxExtra", 200.0)
            .with("rotationRange", 90.0)
            .with("scaleMin", 0.6)
            .with("scaleMax", 1.4)
            .with("ease", "power2.out")
            .with("wordClass", "scrollfx-word")
            .with("particleClass", "scrollfx-particle")
            .with("resetOnLeaveBack", true)
    }

    pub fn from_options(o: &Options) -> Self {
        Self {
            threshold: Threshold::parse_or(&o.text("threshold", "top 70%"), DEFAULT_THRESHOLD),
            duration: o.number("duration", 1.0).max(0.0),
            stagger: o.number("stagger", 0.04).max(0.0),
            particle_count: o.number("particleCount", 12.0).clamp(0.0, 256.0) as usize,
            vectors: VectorParams {
                min_distance: o.number("minDistance", 120.0),
                max_extra: o.number("maxExtra", 200.0),
                rotation_range: o.number("rotationRange", 90.0),
                scale_min: o.number("scaleMin", 0.6),
                scale_max: o.number("scaleMax", 1.4),
            },
            ease: Ease::from_name(&o.text("ease", "power2.out")).unwrap_or(Ease::OutCubic),
            word_class: o.text("wordClass", "scrollfx-word"),
            particle_class: o.text("particleClass", "scrollfx-particle"),
            reset_on_leave_back: o.boolean("resetOnLeaveBack", true),
        }
    }
}

/// Tween for each burst vector; word `i` starts `i * stagger` seconds late.
pub fn burst_tweens(
    vectors: &[ExplosionVector],
    duration: f64,
    stagger: f64,
    ease: Ease,
) -> Vec<TweenSpec> {
    vectors
        .iter()
        .enumerate()
        .map(|(i, v)| TweenSpec::new(v.at(1.0), duration, ease).delay(stagger * i as f64))
        .collect()
}

struct Inner {
    this: Weak<RefCell<Inner>>,
    lifecycle: Lifecycle,
    services: Services,
    root: Option<NodeId>,
    options: WordBurstOptions,
    split: Option<SplitText>,
    particles: Vec<NodeId>,
}

impl Inner {
    fn words(&self) -> &[NodeId] {
        self.split.as_ref().map_or(&[], |s| s.tracked.as_slice())
    }

    fn on_boundary(&mut self, ev: BoundaryEvent) {
        match ev {
            BoundaryEvent::Enter => {
                self.burst();
            }
            BoundaryEvent::LeaveBack if self.options.reset_on_leave_back => self.reset(),
            _ => {}
        }
    }

    fn spawn_particles(&mut self, root: NodeId, center: Point) {
        let mut doc = self.services.doc.borrow_mut();
        let half = PARTICLE_SIZE / 2.0;
        for _ in 0..self.options.particle_count {
            let p = doc.create_element("span");
            doc.add_class(p, &self.options.particle_class);
            doc.set_rect(
                p,
                Rect::new(center.x - half, center.y - half, center.x + half, center.y + half),
            );
            doc.append_child(root, p);
            self.particles.push(p);
        }
    }

    fn remove_particles(&mut self) {
        let mut doc = self.services.doc.borrow_mut();
        for p in self.particles.drain(..) {
            doc.remove(p);
        }
    }

    /// Returns `true` when the burst fired.
    fn burst(&mut self) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        if !self.lifecycle.trigger() {
            return false;
        }

        let (word_rects, fallback): (Vec<Rect>, _) = {
            let doc = self.services.doc.borrow();
            (
                self.words().iter().map(|n| doc.rect(*n)).collect(),
                doc.rect(root).center(),
            )
        };
        let center = reference_center(&word_rects, fallback);
        self.spawn_particles(root, center);
        let particle_rects: Vec<Rect> = {
            let doc = self.services.doc.borrow();
            self.particles.iter().map(|n| doc.rect(*n)).collect()
        };

        let (word_vectors, particle_vectors) = {
            let mut rng = self.services.rng.borrow_mut();
            (
                compute_vectors(&word_rects, center, self.options.vectors, &mut *rng),
                compute_vectors(&particle_rects, center, self.options.vectors, &mut *rng),
            )
        };

        let o = &self.options;
        let mut handles = Vec::new();
        for (node, spec) in self
            .words()
            .iter()
            .zip(burst_tweens(&word_vectors, o.duration, o.stagger, o.ease))
        {
            handles.push(self.services.tween.tween(*node, spec));
        }
        for (node, spec) in self
            .particles
            .iter()
            .zip(burst_tweens(&particle_vectors, o.duration, 0.0, o.ease))
        {
            handles.push(self.services.tween.tween(*node, spec));
        }
        for h in handles {
            self.lifecycle.transient(h);
        }
        self.schedule_cleanup();
        true
    }

    /// Remove the particles once the last word tween has had time to finish.
    fn schedule_cleanup(&mut self) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let n = self.words().len().saturating_sub(1) as f64;
        let after = self.options.duration + self.options.stagger * n;
        let alive = self.lifecycle.alive_flag();
        let timer = self.services.timers.schedule(
            after,
            guarded_once(&this, &alive, |s: &mut Inner| s.remove_particles()),
        );
        self.lifecycle.transient(timer);
    }

    fn reset(&mut self) {
        if !matches!(
            self.lifecycle.state(),
            LifecycleState::Bound | LifecycleState::Triggered
        ) {
            return;
        }
        self.lifecycle.cancel_transient();
        self.remove_particles();
        for w in self.words().to_vec() {
            self.services.tween.set(w, StyleProps::identity());
        }
        self.lifecycle.rearm();
    }
}

pub struct WordBurst {
    inner: Rc<RefCell<Inner>>,
}

impl WordBurst {
    pub fn new<'a>(services: &Services, target: impl Into<Target<'a>>, caller: &Options) -> Self {
        let root = resolve_target(services, target.into(), KIND);
        let merged = match root {
            Some(r) => resolve_options(services, r, &WordBurstOptions::defaults(), caller),
            None => WordBurstOptions::defaults().merge(caller),
        };
        let options = WordBurstOptions::from_options(&merged);

        let inner = Rc::new_cyclic(|this| {
            RefCell::new(Inner {
                this: this.clone(),
                lifecycle: Lifecycle::new(KIND),
                services: services.clone(),
                root,
                options: options.clone(),
                split: None,
                particles: Vec::new(),
            })
        });
        let Some(root) = root else {
            return Self { inner };
        };

        let split = SplitText::split(
            &mut services.doc.borrow_mut(),
            root,
            SplitBy::Words,
            &options.word_class,
        );
        if split.tracked.is_empty() {
            tracing::warn!(kind = KIND, "no words to track, instance is inert");
            split.revert(&mut services.doc.borrow_mut());
            return Self { inner };
        }
        inner.borrow_mut().split = Some(split);

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
            i.lifecycle.observe(handle);
            i.lifecycle.bind();
        }
        services.scroll.refresh_all();
        Self { inner }
    }

    pub fn options(&self) -> WordBurstOptions {
        self.inner.borrow().options.clone()
    }

    pub fn words(&self) -> Vec<NodeId> {
        self.inner.borrow().words().to_vec()
    }

    /// Particle nodes currently in the document.
    pub fn particles(&self) -> Vec<NodeId> {
        self.inner.borrow().particles.clone()
    }

    /// Fire the burst as a threshold crossing would. `Ok(false)` when
    /// already triggered; an error when never bound or destroyed.
    pub fn burst(&self) -> ScrollFxResult<bool> {
        let mut inner = self.inner.borrow_mut();
        inner.lifecycle.require_bound("burst")?;
        Ok(inner.burst())
    }
}

impl ScrollAnimation for WordBurst {
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
        inner.remove_particles();
        if let Some(split) = inner.split.take() {
            split.revert(&mut inner.services.doc.borrow_mut());
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
    use kurbo::Vec2;

    fn setup() -> (Services, Simulation, NodeId) {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.set_attr(p, "id", "burst");
        doc.set_attr(p, "data-anim-particle-count", "5");
        doc.set_text(p, "big bang theory");
        doc.set_rect(p, Rect::new(0.0, 1200.0, 600.0, 1260.0));
        doc.append_child(doc.root(), p);
        let (services, sim) = Services::simulated(doc, 800.0, 9);
        (services, sim, p)
    }

    #[test]
    fn words_are_staggered() {
        let v = ExplosionVector {
            offset: Vec2::new(10.0, 0.0),
            rotation_deg: 0.0,
            scale: 1.0,
        };
        let specs = burst_tweens(&[v, v, v], 1.0, 0.04, Ease::OutCubic);
        assert_eq!(specs[0].delay, 0.0);
        assert_eq!(specs[2].delay, 0.08);
        assert!(specs.iter().all(|s| s.props.opacity == Some(0.0)));
    }

    #[test]
    fn bursts_once_and_owns_its_particles() {
        let (services, sim, p) = setup();
        let burst = WordBurst::new(&services, "#burst", &Options::new());
        assert_eq!(burst.words().len(), 3);
        assert!(burst.particles().is_empty());

        let id = sim.scroll.boundary_ids()[0];
        sim.scroll.emit_boundary(id, BoundaryEvent::Enter);
        sim.scroll.emit_boundary(id, BoundaryEvent::Enter);
        let particles = burst.particles();
        assert_eq!(particles.len(), 5);
        assert_eq!(sim.tween.call_count(), 3 + 5);
        assert!(particles.iter().all(|n| sim.doc.borrow().parent(*n) == Some(p)));
        assert_eq!(burst.state(), LifecycleState::Triggered);
    }

    #[test]
    fn particles_are_cleaned_up_after_the_burst() {
        let (services, sim, _) = setup();
        let burst = WordBurst::new(&services, "#burst", &Options::new());
        assert!(burst.burst().unwrap());
        assert!(!burst.burst().unwrap());
        let particles = burst.particles();
        assert_eq!(sim.timers.pending(), 1);

        sim.timers.advance(0.5);
        assert_eq!(burst.particles().len(), 5);
        sim.timers.advance(1.0);
        assert!(burst.particles().is_empty());
        assert!(particles.iter().all(|n| !sim.doc.borrow().is_connected(*n)));
    }

    #[test]
    fn reset_restores_words_and_rearms() {
        let (services, sim, _) = setup();
        let burst = WordBurst::new(&services, "#burst", &Options::new());
        // start = 1200 - 560 = 640
        sim.scroll.scroll_to(700.0);
        assert_eq!(burst.particles().len(), 5);
        let words = burst.words();
        assert_ne!(sim.doc.borrow().style(words[0]).opacity, 1.0);

        sim.scroll.scroll_to(0.0);
        assert_eq!(burst.state(), LifecycleState::Bound);
        assert!(burst.particles().is_empty());
        assert!(
            words
                .iter()
                .all(|w| sim.doc.borrow().style(*w) == crate::dom::Style::default())
        );

        sim.scroll.scroll_to(700.0);
        assert_eq!(burst.state(), LifecycleState::Triggered);
    }

    #[test]
    fn destroy_removes_everything_it_created() {
        let (services, sim, p) = setup();
        let burst = WordBurst::new(&services, "#burst", &Options::new());
        let id = sim.scroll.boundary_ids()[0];
        assert!(burst.burst().unwrap());
        let particles = burst.particles();

        burst.destroy();
        assert!(burst.burst().is_err());
        assert!(particles.iter().all(|n| !sim.doc.borrow().is_connected(*n)));
        assert!(sim.doc.borrow().children(p).is_empty());
        assert_eq!(sim.doc.borrow().text(p), "big bang theory");
        assert_eq!(burst.live_handles(), 0);

        let calls = sim.tween.call_count();
        sim.scroll.emit_boundary_in_flight(id, BoundaryEvent::Enter);
        sim.timers.advance(5.0);
        assert_eq!(sim.tween.call_count(), calls);
        assert_eq!(sim.timers.pending(), 0);
    }

    #[test]
    fn missing_root_is_inert() {
        let (services, sim, _) = setup();
        let burst = WordBurst::new(&services, "#absent", &Options::new());
        assert_eq!(burst.state(), LifecycleState::Unbound);
        assert!(burst.burst().is_err());
        burst.reset();
        burst.destroy();
        assert_eq!(sim.scroll.registrations(), 0);
        assert!(sim.doc.borrow().get_element_by_id("burst").is_some());
    }
}
