//! Composition root: every collaborator an instance needs, passed explicitly.

use std::{cell::RefCell, rc::Rc};

use crate::{
    config::EngineConfig,
    dom::{Document, SharedDocument},
    random::{RandomSource, SplitMix64},
    scroll::{ScrollTracker, SimulatedScroll},
    tween::{ImmediateTweener, ManualTimers, Timers, Tweener},
};

#[derive(Clone)]
pub struct Services {
    pub doc: SharedDocument,
    pub scroll: Rc<dyn ScrollTracker>,
    pub tween: Rc<dyn Tweener>,
    pub timers: Rc<dyn Timers>,
    pub rng: Rc<RefCell<dyn RandomSource>>,
    pub config: EngineConfig,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Concrete handles to the in-process collaborators behind a
/// [`Services::simulated`] root.
#[derive(Clone)]
pub struct Simulation {
    pub doc: SharedDocument,
    pub scroll: Rc<SimulatedScroll>,
    pub tween: Rc<ImmediateTweener>,
    pub timers: Rc<ManualTimers>,
}

impl Services {
    /// Wire the in-process collaborators around `doc`.
    pub fn simulated(doc: Document, viewport_height: f64, seed: u64) -> (Self, Simulation) {
        let doc = doc.into_shared();
        let sim = Simulation {
            doc: doc.clone(),
            scroll: Rc::new(SimulatedScroll::new(doc.clone(), viewport_height)),
            tween: Rc::new(ImmediateTweener::new(doc.clone())),
            timers: Rc::new(ManualTimers::new()),
        };
        let services = Self {
            doc,
            scroll: sim.scroll.clone(),
            tween: sim.tween.clone(),
            timers: sim.timers.clone(),
            rng: Rc::new(RefCell::new(SplitMix64::new(seed))),
            config: EngineConfig::default(),
        };
        (services, sim)
    }

    pub fn with_rng(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Rc::new(RefCell::new(rng));
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}
