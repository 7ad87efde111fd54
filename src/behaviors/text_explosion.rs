//! Character-level phased decomposition over a pinned scrub.
//!
//! Progress runs through `hold | transition | settled`. Inside the
//! transition every character moves along a precomputed outward vector,
//! later characters lagging by a stagger offset.

use std::{cell::RefCell, rc::Rc};

use kurbo::Rect;

use crate::{
    dom::{NodeId, StyleProps},
    ease::Ease,
    error::ScrollFxResult,
    lifecycle::{Lifecycle, LifecycleState},
    options::Options,
    scroll::ScrubConfig,
    services::Services,
    threshold::{Edge, SpanEnd, Threshold},
    timeline::{PhaseTimeline, stagger_offset, staggered},
    vectors::{ExplosionVector, VectorParams, compute_vectors, reference_center},
};

use super::{ScrollAnimation, SplitBy, SplitText, Target, guarded, resolve_options, resolve_target};

pub const KIND: &str = "text-explosion";

const PIN_START: Threshold = Threshold::new(Edge::Fraction(0.0), Edge::Fraction(0.0));

#[derive(Clone, Debug, PartialEq)]
pub struct TextExplosionOptions {
    pub hold: f64,
    pub end: f64,
    pub scroll_distance: f64,
    pub vectors: VectorParams,
    pub stagger: f64,
    pub ease: Ease,
    pub char_class: String,
}

impl TextExplosionOptions {
    pub fn defaults() -> Options {
        Options::new()
            .with("hold", 0.35)
            .with("end", 0.85)
            .with("scrollDistance", 2000.0)
            .with("minDistance", 150.0)
            .with("maxExtra", 250.0)
            .with("rotationRange", 720.0)
            .with("scaleMin", 0.3)
            .with("scaleMax", 1.8)
            .with("stagger", 0.3)
            .with("ease", "power2.out")
            .with("charClass", "scrollfx-char")
    }

    pub fn from_options(o: &Options) -> Self {
        Self {
            hold: o.number("hold", 0.35),
            end: o.number("end", 0.85),
            scroll_distance: o.number("scrollDistance", 2000.0).max(0.0),
            vectors: VectorParams {
                min_distance: o.number("minDistance", 150.0),
                max_extra: o.number("maxExtra", 250.0),
                rotation_range: o.number("rotationRange", 720.0),
                scale_min: o.number("scaleMin", 0.3),
                scale_max: o.number("scaleMax", 1.8),
            },
            stagger: o.number("stagger", 0.3),
            ease: Ease::from_name(&o.text("ease", "power2.out")).unwrap_or(Ease::OutCubic),
            char_class: o.text("charClass", "scrollfx-char"),
        }
    }
}

/// Per-character visual state at scrub `progress`.
///
/// A pure function of its inputs: the same progress always yields the same
/// frame, whatever direction the scroll came from.
pub fn explosion_frame(
    progress: f64,
    timeline: &PhaseTimeline,
    stagger: f64,
    ease: Ease,
    vectors: &[ExplosionVector],
) -> Vec<StyleProps> {
    let position = timeline.local_position(progress);
    let n = vectors.len();
    vectors
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let t = staggered(position, stagger_offset(i, n, stagger));
            v.at(ease.apply(t))
        })
        .collect()
}

struct Inner {
    lifecycle: Lifecycle,
    services: Services,
    root: Option<NodeId>,
    options: TextExplosionOptions,
    timeline: PhaseTimeline,
    split: Option<SplitText>,
    vectors: Vec<ExplosionVector>,
    progress: f64,
    refresh_pending: bool,
}

impl Inner {
    fn tracked(&self) -> &[NodeId] {
        self.split.as_ref().map_or(&[], |s| s.tracked.as_slice())
    }

    fn recompute_vectors(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        let (rects, fallback): (Vec<Rect>, _) = {
            let doc = self.services.doc.borrow();
            (
                self.tracked().iter().map(|n| doc.rect(*n)).collect(),
                doc.rect(root).center(),
            )
        };
        let center = reference_center(&rects, fallback);
        let mut rng = self.services.rng.borrow_mut();
        self.vectors = compute_vectors(&rects, center, self.options.vectors, &mut *rng);
    }

    fn apply(&mut self, progress: f64) {
        self.progress = progress;
        if self.refresh_pending && !self.timeline.is_transitioning(progress) {
            tracing::debug!(kind = KIND, progress, "running deferred refresh");
            self.refresh_pending = false;
            self.recompute_vectors();
        }

        match self.lifecycle.state() {
            LifecycleState::Bound if progress > self.timeline.hold() => {
                self.lifecycle.trigger();
            }
            LifecycleState::Triggered if progress <= self.timeline.hold() => {
                self.lifecycle.rearm();
            }
            _ => {}
        }

        let frame = explosion_frame(
            progress,
            &self.timeline,
            self.options.stagger,
            self.options.ease,
            &self.vectors,
        );
        for (node, props) in self.tracked().iter().zip(frame) {
            self.services.tween.set(*node, props);
        }
    }

    fn refresh(&mut self) {
        if !matches!(
            self.lifecycle.state(),
            LifecycleState::Bound | LifecycleState::Triggered
        ) {
            return;
        }
        if self.timeline.is_transitioning(self.progress) {
            tracing::debug!(kind = KIND, progress = self.progress, "refresh deferred mid-transition");
            self.refresh_pending = true;
            return;
        }
        self.recompute_vectors();
        self.apply(self.progress);
    }
}

pub struct TextExplosion {
    inner: Rc<RefCell<Inner>>,
}

impl TextExplosion {
    pub fn new<'a>(services: &Services, target: impl Into<Target<'a>>, caller: &Options) -> Self {
        let root = resolve_target(services, target.into(), KIND);
        let merged = match root {
            Some(r) => resolve_options(services, r, &TextExplosionOptions::defaults(), caller),
            None => TextExplosionOptions::defaults().merge(caller),
        };
        let options = TextExplosionOptions::from_options(&merged);
        let timeline = PhaseTimeline::from_boundaries(options.hold, options.end);

        let inner = Rc::new(RefCell::new(Inner {
            lifecycle: Lifecycle::new(KIND),
            services: services.clone(),
            root,
            options: options.clone(),
            timeline,
            split: None,
            vectors: Vec::new(),
            progress: 0.0,
            refresh_pending: false,
        }));
        let Some(root) = root else {
            return Self { inner };
        };

        let split = SplitText::split(
            &mut services.doc.borrow_mut(),
            root,
            SplitBy::Chars,
            &options.char_class,
        );
        if split.tracked.is_empty() {
            tracing::warn!(kind = KIND, "no characters to track, instance is inert");
            split.revert(&mut services.doc.borrow_mut());
            return Self { inner };
        }

        {
            let mut i = inner.borrow_mut();
            i.split = Some(split);
            i.recompute_vectors();
            i.apply(0.0);
        }

        let alive = inner.borrow().lifecycle.alive_flag();
        let handle = services.scroll.observe_scrub(
            ScrubConfig {
                trigger: root,
                start: PIN_START,
                end: SpanEnd::After(options.scroll_distance),
                pin: true,
            },
            guarded(&inner, &alive, |s: &mut Inner, p: f64| s.apply(p)),
        );
        {
            let mut i = inner.borrow_mut();
            i.lifecycle.observe(handle);
            i.lifecycle.bind();
        }
        // the split changed the layout under every other observer
        services.scroll.refresh_all();
        Self { inner }
    }

    pub fn options(&self) -> TextExplosionOptions {
        self.inner.borrow().options.clone()
    }

    pub fn timeline(&self) -> PhaseTimeline {
        self.inner.borrow().timeline.clone()
    }

    /// Character nodes that move; whitespace is not tracked.
    pub fn tracked(&self) -> Vec<NodeId> {
        self.inner.borrow().tracked().to_vec()
    }

    pub fn vectors(&self) -> Vec<ExplosionVector> {
        self.inner.borrow().vectors.clone()
    }

    /// `true` while a refresh is waiting for the transition to end.
    pub fn refresh_pending(&self) -> bool {
        self.inner.borrow().refresh_pending
    }

    pub fn update(&self, progress: f64) -> ScrollFxResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.lifecycle.require_bound("update")?;
        inner.apply(progress.clamp(0.0, 1.0));
        Ok(())
    }
}

impl ScrollAnimation for TextExplosion {
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
        let mut inner = self.inner.borrow_mut();
        if !matches!(
            inner.lifecycle.state(),
            LifecycleState::Bound | LifecycleState::Triggered
        ) {
            return;
        }
        inner.lifecycle.cancel_transient();
        inner.apply(0.0);
        inner.lifecycle.rearm();
    }

    fn refresh(&self) {
        self.inner.borrow_mut().refresh();
    }

    fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        let was_bound = inner.lifecycle.state() != LifecycleState::Unbound;
        if !inner.lifecycle.destroy() || !was_bound {
            return;
        }
        if let Some(split) = inner.split.take() {
            split.revert(&mut inner.services.doc.borrow_mut());
        }
        inner.vectors.clear();
    }

    fn live_handles(&self) -> usize {
        self.inner.borrow().lifecycle.live_handles()
    }
}
