//! Tween and timer collaborators.

use std::cell::{Cell, RefCell};

use crate::{
    dom::{NodeId, SharedDocument, StyleProps},
    ease::Ease,
    handle::Disposable,
};

/// Animate `props` on a node over `duration` seconds after `delay`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct TweenSpec {
    pub props: StyleProps,
    pub duration: f64,
    pub ease: Ease,
    pub delay: f64,
}

impl TweenSpec {
    pub fn new(props: StyleProps, duration: f64, ease: Ease) -> Self {
        Self {
            props,
            duration,
            ease,
            delay: 0.0,
        }
    }

    pub fn delay(mut self, secs: f64) -> Self {
        self.delay = secs;
        self
    }
}

pub trait Tweener {
    /// Start a tween; the handle cancels it immediately.
    fn tween(&self, target: NodeId, spec: TweenSpec) -> Disposable;

    /// Write `props` without animating.
    fn set(&self, target: NodeId, props: StyleProps);

    /// Drop every inline style the engine wrote to `target`.
    fn clear(&self, target: NodeId);
}

/// One recorded [`Tweener::tween`] call.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TweenCall {
    pub target: NodeId,
    pub spec: TweenSpec,
}

/// Tweener that jumps straight to the end values and records every call.
pub struct ImmediateTweener {
    doc: SharedDocument,
    next_id: Cell<u64>,
    calls: RefCell<Vec<TweenCall>>,
}

impl ImmediateTweener {
    pub fn new(doc: SharedDocument) -> Self {
        Self {
            doc,
            next_id: Cell::new(1),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<TweenCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Calls that targeted `node`, oldest first.
    pub fn calls_for(&self, node: NodeId) -> Vec<TweenCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.target == node)
            .cloned()
            .collect()
    }
}

impl Tweener for ImmediateTweener {
    fn tween(&self, target: NodeId, spec: TweenSpec) -> Disposable {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.calls.borrow_mut().push(TweenCall { target, spec });
        self.doc.borrow_mut().apply_style(target, &spec.props);
        Disposable::new(id)
    }

    fn set(&self, target: NodeId, props: StyleProps) {
        self.doc.borrow_mut().apply_style(target, &props);
    }

    fn clear(&self, target: NodeId) {
        self.doc.borrow_mut().clear_style(target);
    }
}

pub type TimerCallback = Box<dyn FnOnce()>;

pub trait Timers {
    /// Run `f` once after `delay_secs`, unless the handle is killed first.
    fn schedule(&self, delay_secs: f64, f: TimerCallback) -> Disposable;
}

struct Pending {
    at: f64,
    seq: u64,
    handle: Disposable,
    f: TimerCallback,
}

/// Timer queue advanced explicitly by the caller.
#[derive(Default)]
pub struct ManualTimers {
    now: Cell<f64>,
    seq: Cell<u64>,
    pending: RefCell<Vec<Pending>>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now.get()
    }

    /// Timers that are scheduled and not cancelled.
    pub fn pending(&self) -> usize {
        self.pending
            .borrow()
            .iter()
            .filter(|p| p.handle.is_alive())
            .count()
    }

    /// Advance the clock, firing due timers in deadline order. Timers
    /// scheduled by a callback fire in the same call if they are due.
    pub fn advance(&self, secs: f64) {
        let target = self.now.get() + secs.max(0.0);
        while let Some(p) = self.pop_due(target) {
            // callbacks observe the clock at their own deadline
            self.now.set(self.now.get().max(p.at));
            if p.handle.is_alive() {
                p.handle.kill();
                (p.f)();
            }
        }
        self.now.set(target);
    }

    fn pop_due(&self, target: f64) -> Option<Pending> {
        let mut pending = self.pending.borrow_mut();
        pending.retain(|p| p.handle.is_alive());
        let idx = pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.at <= target)
            .min_by(|(_, a), (_, b)| a.at.total_cmp(&b.at).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)?;
        Some(pending.remove(idx))
    }
}

impl Timers for ManualTimers {
    fn schedule(&self, delay_secs: f64, f: TimerCallback) -> Disposable {
        let seq = self.seq.get() + 1;
        self.seq.set(seq);
        let handle = Disposable::new(seq);
        self.pending.borrow_mut().push(Pending {
            at: self.now.get() + delay_secs.max(0.0),
            seq,
            handle: handle.clone(),
            f,
        });
        handle
    }
}
