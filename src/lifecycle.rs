//! Per-instance state machine and handle ownership.

use std::{cell::Cell, rc::Rc};

use crate::{
    error::{ScrollFxError, ScrollFxResult},
    handle::{Disposable, HandleSet},
};

/// Shared flag checked by every callback before touching instance state.
pub type AliveFlag = Rc<Cell<bool>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum LifecycleState {
    /// Never bound: configuration miss or missing elements.
    Unbound,
    /// Observing; one-shot behaviors are armed.
    Bound,
    /// One-shot behavior has fired; cleared by a reset.
    Triggered,
    Destroyed,
}

/// Observation handles plus transient tween/timer handles of one instance.
#[derive(Debug)]
pub struct Lifecycle {
    kind: &'static str,
    state: LifecycleState,
    observers: HandleSet,
    transient: HandleSet,
    alive: AliveFlag,
}

impl Lifecycle {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            state: LifecycleState::Unbound,
            observers: HandleSet::default(),
            transient: HandleSet::default(),
            alive: Rc::new(Cell::new(true)),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn alive_flag(&self) -> AliveFlag {
        self.alive.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// `Unbound -> Bound`. No effect in any other state.
    pub fn bind(&mut self) {
        if self.state == LifecycleState::Unbound {
            tracing::debug!(kind = self.kind, "bound");
            self.state = LifecycleState::Bound;
        }
    }

    /// Keep a scroll observation handle until destroy.
    pub fn observe(&mut self, handle: Disposable) {
        self.observers.push(handle);
    }

    /// Keep a tween or timer handle; cancelled on reset and destroy.
    pub fn transient(&mut self, handle: Disposable) {
        self.transient.push(handle);
    }

    pub fn cancel_transient(&mut self) {
        self.transient.kill_all();
    }

    /// `Bound -> Triggered`. Returns `false` when not armed, which makes
    /// repeated boundary crossings no-ops.
    pub fn trigger(&mut self) -> bool {
        if self.state != LifecycleState::Bound {
            return false;
        }
        tracing::debug!(kind = self.kind, "triggered");
        self.state = LifecycleState::Triggered;
        true
    }

    /// `Triggered -> Bound`. Returns `true` if the instance was re-armed.
    pub fn rearm(&mut self) -> bool {
        if self.state != LifecycleState::Triggered {
            return false;
        }
        tracing::debug!(kind = self.kind, "re-armed");
        self.state = LifecycleState::Bound;
        true
    }

    /// Release every handle. Returns `true` only for the call that did the
    /// work; later calls are no-ops.
    pub fn destroy(&mut self) -> bool {
        if self.state == LifecycleState::Destroyed {
            return false;
        }
        self.alive.set(false);
        self.observers.kill_all();
        self.transient.kill_all();
        tracing::debug!(kind = self.kind, "destroyed");
        self.state = LifecycleState::Destroyed;
        true
    }

    /// Error unless the instance is bound (armed or triggered).
    pub fn require_bound(&self, op: &str) -> ScrollFxResult<()> {
        match self.state {
            LifecycleState::Bound | LifecycleState::Triggered => Ok(()),
            state => Err(ScrollFxError::lifecycle(format!(
                "{} {op} called while {state:?}",
                self.kind
            ))),
        }
    }

    /// Live observation plus transient handles.
    pub fn live_handles(&self) -> usize {
        self.observers.live() + self.transient.live()
    }
}
