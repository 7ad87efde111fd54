//! Scale-grow: one continuous scrub from `startScale` to `endScale`.

use std::{cell::RefCell, rc::Rc};

use crate::{
    dom::{NodeId, StyleProps},
    ease::Ease,
    error::ScrollFxResult,
    lifecycle::{Lifecycle, LifecycleState},
    options::Options,
    scroll::ScrubConfig,
    services::Services,
    threshold::{Edge, SpanEnd, Threshold},
};

use super::{ScrollAnimation, Target, guarded, resolve_options, resolve_target};

pub const KIND: &str = "scale-grow";

const DEFAULT_START: Threshold = Threshold::new(Edge::Fraction(0.0), Edge::Fraction(1.0));
const DEFAULT_END: Threshold = Threshold::new(Edge::Fraction(0.0), Edge::Fraction(0.0));

#[derive(Clone, Debug, PartialEq)]
pub struct ScaleGrowOptions {
    pub start_scale: f64,
    pub end_scale: f64,
    pub start: Threshold,
    pub end: SpanEnd,
    pub ease: Ease,
    /// External trigger selector; empty means the element itself.
    pub trigger: String,
    pub fade_in: bool,
    pub start_opacity: f64,
}

impl ScaleGrowOptions {
    pub fn defaults() -> Options {
        Options::new()
            .with("startScale", 0.8)
            .with("endScale", 1.0)
            .with("start", "top bottom")
            .with("end", "top top")
            .with("ease", "none")
            .with("trigger", "")
            .with("fadeIn", false)
            .with("startOpacity", 0.0)
    }

    pub fn from_options(o: &Options) -> Self {
        Self {
            start_scale: o.number("startScale", 0.8),
            end_scale: o.number("endScale", 1.0),
            start: Threshold::parse_or(&o.text("start", "top bottom"), DEFAULT_START),
            end: SpanEnd::parse_or(&o.text("end", "top top"), SpanEnd::At(DEFAULT_END)),
            ease: Ease::from_name(&o.text("ease", "none")).unwrap_or(Ease::Linear),
            trigger: o.text("trigger", ""),
            fade_in: o.boolean("fadeIn", false),
            start_opacity: o.number("startOpacity", 0.0).clamp(0.0, 1.0),
        }
    }
}

/// Visual state at scrub `progress`.
pub fn grow_state(progress: f64, opts: &ScaleGrowOptions) -> StyleProps {
    let t = opts.ease.apply(progress);
    let props = StyleProps::new().scale(opts.start_scale + (opts.end_scale - opts.start_scale) * t);
    if opts.fade_in {
        props.opacity(opts.start_opacity + (1.0 - opts.start_opacity) * t)
    } else {
        props
    }
}

struct Inner {
    lifecycle: Lifecycle,
    services: Services,
    root: Option<NodeId>,
    options: ScaleGrowOptions,
}

impl Inner {
    fn apply(&mut self, progress: f64) {
        if let Some(root) = self.root {
            self.services.tween.set(root, grow_state(progress, &self.options));
        }
    }
}

pub struct ScaleGrow {
    inner: Rc<RefCell<Inner>>,
}

impl ScaleGrow {
    pub fn new<'a>(services: &Services, target: impl Into<Target<'a>>, caller: &Options) -> Self {
        let root = resolve_target(services, target.into(), KIND);
        let merged = match root {
            Some(r) => resolve_options(services, r, &ScaleGrowOptions::defaults(), caller),
            None => ScaleGrowOptions::defaults().merge(caller),
        };
        let options = ScaleGrowOptions::from_options(&merged);

        let inner = Rc::new(RefCell::new(Inner {
            lifecycle: Lifecycle::new(KIND),
            services: services.clone(),
            root,
            options: options.clone(),
        }));
        let Some(root) = root else {
            return Self { inner };
        };

        let trigger = if options.trigger.trim().is_empty() {
            root
        } else {
            let doc = services.doc.borrow();
            match doc.query(doc.root(), &options.trigger) {
                Ok(Some(t)) => t,
                _ => {
                    tracing::warn!(kind = KIND, trigger = %options.trigger, "trigger not found, using the element itself");
                    root
                }
            }
        };

        // initial frame so the element never flashes at full size
        services.tween.set(root, grow_state(0.0, &options));

        let alive = inner.borrow().lifecycle.alive_flag();
        let handle = services.scroll.observe_scrub(
            ScrubConfig {
                trigger,
                start: options.start,
                end: options.end,
                pin: false,
            },
            guarded(&inner, &alive, |s: &mut Inner, p: f64| s.apply(p)),
        );
        {
            let mut i = inner.borrow_mut();
            i.lifecycle.observe(handle);
            i.lifecycle.bind();
        }
        Self { inner }
    }

    pub fn options(&self) -> ScaleGrowOptions {
        self.inner.borrow().options.clone()
    }

    pub fn update(&self, progress: f64) -> ScrollFxResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.lifecycle.require_bound("update")?;
        inner.apply(progress);
        Ok(())
    }
}

impl ScrollAnimation for ScaleGrow {
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
        if inner.lifecycle.destroy() && was_bound {
            if let Some(root) = inner.root {
                inner.services.tween.clear(root);
            }
        }
    }

    fn live_handles(&self) -> usize {
        self.inner.borrow().lifecycle.live_handles()
    }
}
