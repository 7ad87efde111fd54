//! Parallax/clip reveal: two scrubs over the same section drive the media
//! translation and clip, and a one-shot crossing reveals sibling blocks one
//! after another, then the target.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use kurbo::Vec2;

use crate::{
    dom::{ClipInset, NodeId, StyleProps},
    ease::Ease,
    error::ScrollFxResult,
    lifecycle::{Lifecycle, LifecycleState},
    options::Options,
    scroll::{BoundaryConfig, BoundaryEvent, ScrubConfig},
    services::Services,
    threshold::{Edge, SpanEnd, Threshold},
    tween::TweenSpec,
};

use super::{
    ScrollAnimation, Target, guarded, guarded_once, query_all_logged, resolve_options,
    resolve_target,
};

pub const KIND: &str = "parallax-reveal";

const fn fraction(el: f64, vp: f64) -> Threshold {
    Threshold::new(Edge::Fraction(el), Edge::Fraction(vp))
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParallaxRevealOptions {
    pub media_selector: String,
    pub block_selector: String,
    pub target_selector: String,
    pub parallax_distance: f64,
    pub parallax_start: Threshold,
    pub parallax_end: SpanEnd,
    pub clip_start: Threshold,
    pub clip_end: SpanEnd,
    pub clip_from: f64,
    pub block_threshold: Threshold,
    pub block_delay: f64,
    pub block_duration: f64,
    pub block_offset: f64,
    pub target_duration: f64,
    pub ease: Ease,
    pub reset_on_leave_back: bool,
}

impl ParallaxRevealOptions {
    pub fn defaults() -> Options {
        Options::new()
            .with("mediaSelector", ".parallax-media")
            .with("blockSelector", ".reveal-block")
            .with("targetSelector", ".reveal-target")
            .with("parallaxDistance", 120.0)
            .with("parallaxStart", "top bottom")
            .with("parallaxEnd", "bottom top")
            .with("clipStart", "top 90%")
            .with("clipEnd", "top 30%")
            .with("clipFrom", 100.0)
            .with("blockThreshold", "top 60%")
            .with("blockDelay", 0.15)
            .with("blockDuration", 0.6)
            .with("blockOffset", 40.0)
            .with("targetDuration", 0.5)
            .with("ease", "power2.out")
            .with("resetOnLeaveBack", true)
    }

    pub fn from_options(o: &Options) -> Self {
        Self {
            media_selector: o.text("mediaSelector", ".parallax-media"),
            block_selector: o.text("blockSelector", ".reveal-block"),
            target_selector: o.text("targetSelector", ".reveal-target"),
            parallax_distance: o.number("parallaxDistance", 120.0),
            parallax_start: Threshold::parse_or(
                &o.text("parallaxStart", "top bottom"),
                fraction(0.0, 1.0),
            ),
            parallax_end: SpanEnd::parse_or(
                &o.text("parallaxEnd", "bottom top"),
                SpanEnd::At(fraction(1.0, 0.0)),
            ),
            clip_start: Threshold::parse_or(&o.text("clipStart", "top 90%"), fraction(0.0, 0.9)),
            clip_end: SpanEnd::parse_or(
                &o.text("clipEnd", "top 30%"),
                SpanEnd::At(fraction(0.0, 0.3)),
            ),
            clip_from: o.number("clipFrom", 100.0).clamp(0.0, 100.0),
            block_threshold: Threshold::parse_or(
                &o.text("blockThreshold", "top 60%"),
                fraction(0.0, 0.6),
            ),
            block_delay: o.number("blockDelay", 0.15).max(0.0),
            block_duration: o.number("blockDuration", 0.6).max(0.0),
            block_offset: o.number("blockOffset", 40.0),
            target_duration: o.number("targetDuration", 0.5).max(0.0),
            ease: Ease::from_name(&o.text("ease", "power2.out")).unwrap_or(Ease::OutCubic),
            reset_on_leave_back: o.boolean("resetOnLeaveBack", true),
        }
    }
}

/// Media translation at parallax progress `p`.
pub fn parallax_state(p: f64, distance: f64) -> StyleProps {
    StyleProps::new().translate(Vec2::new(0.0, -distance * p))
}

/// Media clip at clip progress `p`: `from` percent hidden at the bottom,
/// opening to nothing hidden.
pub fn clip_state(p: f64, from: f64) -> StyleProps {
    StyleProps::new().clip(ClipInset::new(0.0, 0.0, from * (1.0 - p), 0.0))
}

/// Start times of the block reveals and of the target reveal.
///
/// Block `i` starts at `i * delay`; the target starts once the last block
/// has finished, at `(n - 1) * delay + duration`.
pub fn reveal_schedule(blocks: usize, delay: f64, duration: f64) -> (Vec<f64>, f64) {
    let starts: Vec<f64> = (0..blocks).map(|i| i as f64 * delay).collect();
    let target = starts.last().map_or(0.0, |last| last + duration);
    (starts, target)
}

fn block_hidden(offset: f64) -> StyleProps {
    StyleProps::new().translate(Vec2::new(0.0, offset)).opacity(0.0)
}

fn block_shown() -> StyleProps {
    StyleProps::new().translate(Vec2::ZERO).opacity(1.0)
}

struct Inner {
    this: Weak<RefCell<Inner>>,
    lifecycle: Lifecycle,
    services: Services,
    root: Option<NodeId>,
    options: ParallaxRevealOptions,
    media: Option<NodeId>,
    blocks: Vec<NodeId>,
    target: Option<NodeId>,
}

impl Inner {
    fn on_parallax(&mut self, p: f64) {
        if let Some(m) = self.media {
            self.services
                .tween
                .set(m, parallax_state(p, self.options.parallax_distance));
        }
    }

    fn on_clip(&mut self, p: f64) {
        if let Some(m) = self.media {
            self.services.tween.set(m, clip_state(p, self.options.clip_from));
        }
    }

    fn on_boundary(&mut self, ev: BoundaryEvent) {
        match ev {
            BoundaryEvent::Enter => {
                self.reveal();
            }
            BoundaryEvent::LeaveBack if self.options.reset_on_leave_back => self.reset(),
            _ => {}
        }
    }

    fn hide(&self) {
        for b in &self.blocks {
            self.services.tween.set(*b, block_hidden(self.options.block_offset));
        }
        if let Some(t) = self.target {
            self.services.tween.set(t, StyleProps::new().opacity(0.0));
        }
    }

    fn reveal(&mut self) -> bool {
        if self.blocks.is_empty() && self.target.is_none() {
            return false;
        }
        if !self.lifecycle.trigger() {
            return false;
        }
        let Some(this) = self.this.upgrade() else {
            return false;
        };
        let alive = self.lifecycle.alive_flag();
        let (starts, target_at) = reveal_schedule(
            self.blocks.len(),
            self.options.block_delay,
            self.options.block_duration,
        );
        let mut timers = Vec::with_capacity(starts.len() + 1);
        for (i, at) in starts.into_iter().enumerate() {
            timers.push(self.services.timers.schedule(
                at,
                guarded_once(&this, &alive, move |s: &mut Inner| s.reveal_block(i)),
            ));
        }
        if self.target.is_some() {
            timers.push(self.services.timers.schedule(
                target_at,
                guarded_once(&this, &alive, |s: &mut Inner| s.reveal_target()),
            ));
        }
        for t in timers {
            self.lifecycle.transient(t);
        }
        true
    }

    fn reveal_block(&mut self, i: usize) {
        let Some(&block) = self.blocks.get(i) else {
            return;
        };
        let handle = self.services.tween.tween(
            block,
            TweenSpec::new(block_shown(), self.options.block_duration, self.options.ease),
        );
        self.lifecycle.transient(handle);
    }

    fn reveal_target(&mut self) {
        let Some(target) = self.target else {
            return;
        };
        let handle = self.services.tween.tween(
            target,
            TweenSpec::new(
                StyleProps::new().opacity(1.0),
                self.options.target_duration,
                self.options.ease,
            ),
        );
        self.lifecycle.transient(handle);
    }

    fn reset(&mut self) {
        if !matches!(
            self.lifecycle.state(),
            LifecycleState::Bound | LifecycleState::Triggered
        ) {
            return;
        }
        self.lifecycle.cancel_transient();
        self.hide();
        self.lifecycle.rearm();
    }
}

pub struct ParallaxReveal {
    inner: Rc<RefCell<Inner>>,
}

impl ParallaxReveal {
    pub fn new<'a>(services: &Services, target: impl Into<Target<'a>>, caller: &Options) -> Self {
        let root = resolve_target(services, target.into(), KIND);
        let merged = match root {
            Some(r) => resolve_options(services, r, &ParallaxRevealOptions::defaults(), caller),
            None => ParallaxRevealOptions::defaults().merge(caller),
        };
        let options = ParallaxRevealOptions::from_options(&merged);

        let inner = Rc::new_cyclic(|this| {
            RefCell::new(Inner {
                this: this.clone(),
                lifecycle: Lifecycle::new(KIND),
                services: services.clone(),
                root,
                options: options.clone(),
                media: None,
                blocks: Vec::new(),
                target: None,
            })
        });
        let Some(root) = root else {
            return Self { inner };
        };

        let (media, blocks, target) = {
            let doc = services.doc.borrow();
            let media = query_all_logged(&doc, root, &options.media_selector, KIND)
                .first()
                .copied();
            let blocks = query_all_logged(&doc, root, &options.block_selector, KIND);
            // the target may sit outside the section
            let target = query_all_logged(&doc, root, &options.target_selector, KIND)
                .first()
                .copied()
                .or_else(|| {
                    query_all_logged(&doc, doc.root(), &options.target_selector, KIND)
                        .first()
                        .copied()
                });
            (media, blocks, target)
        };
        if media.is_none() && blocks.is_empty() && target.is_none() {
            tracing::warn!(kind = KIND, "no media, blocks or target found, instance is inert");
            return Self { inner };
        }
        if media.is_none() {
            tracing::warn!(kind = KIND, selector = %options.media_selector, "no media, parallax disabled");
        }

        let alive = inner.borrow().lifecycle.alive_flag();
        let mut handles = Vec::new();
        if media.is_some() {
            handles.push(services.scroll.observe_scrub(
                ScrubConfig {
                    trigger: root,
                    start: options.parallax_start,
                    end: options.parallax_end,
                    pin: false,
                },
                guarded(&inner, &alive, |s: &mut Inner, p: f64| s.on_parallax(p)),
            ));
            handles.push(services.scroll.observe_scrub(
                ScrubConfig {
                    trigger: root,
                    start: options.clip_start,
                    end: options.clip_end,
                    pin: false,
                },
                guarded(&inner, &alive, |s: &mut Inner, p: f64| s.on_clip(p)),
            ));
        }
        if !blocks.is_empty() || target.is_some() {
            handles.push(services.scroll.observe_boundary(
                BoundaryConfig {
                    trigger: root,
                    start: options.block_threshold,
                    end: None,
                },
                guarded(&inner, &alive, |s: &mut Inner, ev: BoundaryEvent| {
                    s.on_boundary(ev)
                }),
            ));
        }

        {
            let mut i = inner.borrow_mut();
            i.media = media;
            i.blocks = blocks;
            i.target = target;
            i.on_parallax(0.0);
            i.on_clip(0.0);
            i.hide();
            for h in handles {
                i.lifecycle.observe(h);
            }
            i.lifecycle.bind();
        }
        Self { inner }
    }

    pub fn options(&self) -> ParallaxRevealOptions {
        self.inner.borrow().options.clone()
    }

    pub fn media(&self) -> Option<NodeId> {
        self.inner.borrow().media
    }

    pub fn blocks(&self) -> Vec<NodeId> {
        self.inner.borrow().blocks.clone()
    }

    pub fn target(&self) -> Option<NodeId> {
        self.inner.borrow().target
    }

    /// Start the staggered block reveal as a threshold crossing would.
    pub fn reveal(&self) -> ScrollFxResult<bool> {
        let mut inner = self.inner.borrow_mut();
        inner.lifecycle.require_bound("reveal")?;
        Ok(inner.reveal())
    }
}

impl ScrollAnimation for ParallaxReveal {
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
        let nodes: Vec<NodeId> = inner
            .media
            .iter()
            .chain(inner.blocks.iter())
            .chain(inner.target.iter())
            .copied()
            .collect();
        for n in nodes {
            inner.services.tween.clear(n);
        }
    }

    fn live_handles(&self) -> usize {
        self.inner.borrow().lifecycle.live_handles()
    }
}
