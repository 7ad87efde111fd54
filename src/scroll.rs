//! Scroll-tracking collaborator.
//!
//! Behaviors subscribe through [`ScrollTracker`]; the host supplies the
//! implementation. [`SimulatedScroll`] resolves thresholds against the
//! in-memory [`Document`](crate::dom::Document) and is used by the CLI and
//! tests.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    dom::{NodeId, SharedDocument},
    handle::Disposable,
    threshold::{SpanEnd, Threshold},
};

pub type ProgressCallback = Box<dyn FnMut(f64)>;
pub type BoundaryCallback = Box<dyn FnMut(BoundaryEvent)>;

/// Discrete crossing of a boundary observer's start or end position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum BoundaryEvent {
    /// Scrolling forward past the start.
    Enter,
    /// Scrolling forward past the end.
    Leave,
    /// Scrolling backward past the end.
    EnterBack,
    /// Scrolling backward past the start.
    LeaveBack,
}

impl BoundaryEvent {
    pub fn is_entering(self) -> bool {
        matches!(self, Self::Enter | Self::EnterBack)
    }
}

/// Continuous scrub over `[start, end]` of a trigger element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrubConfig {
    pub trigger: NodeId,
    pub start: Threshold,
    pub end: SpanEnd,
    /// Hold the trigger in place for the length of the span.
    pub pin: bool,
}

/// Boundary observer; `end: None` means "bottom top" (element fully gone).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryConfig {
    pub trigger: NodeId,
    pub start: Threshold,
    pub end: Option<SpanEnd>,
}

pub trait ScrollTracker {
    /// Register a scrub observer. `on_update` receives progress in `[0, 1]`.
    fn observe_scrub(&self, config: ScrubConfig, on_update: ProgressCallback) -> Disposable;

    /// Register a boundary observer.
    fn observe_boundary(&self, config: BoundaryConfig, on_event: BoundaryCallback) -> Disposable;

    /// Re-measure every observer after structural changes.
    fn refresh_all(&self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    Before,
    Inside,
    After,
}

enum ObserverKind {
    Scrub {
        config: ScrubConfig,
        callback: Rc<RefCell<ProgressCallback>>,
        last: Option<f64>,
    },
    Boundary {
        config: BoundaryConfig,
        callback: Rc<RefCell<BoundaryCallback>>,
        region: Region,
    },
}

struct Observer {
    handle: Disposable,
    kind: ObserverKind,
}

enum Dispatch {
    Progress(Disposable, Rc<RefCell<ProgressCallback>>, f64),
    Boundary(Disposable, Rc<RefCell<BoundaryCallback>>, BoundaryEvent),
}

impl Dispatch {
    fn run(self, check_alive: bool) {
        match self {
            Self::Progress(handle, cb, p) => {
                if !check_alive || handle.is_alive() {
                    (&mut *cb.borrow_mut())(p);
                }
            }
            Self::Boundary(handle, cb, ev) => {
                if !check_alive || handle.is_alive() {
                    (&mut *cb.borrow_mut())(ev);
                }
            }
        }
    }
}

/// In-process scroll tracker driven by explicit `scroll_to` calls.
///
/// Observers registered mid-dispatch are picked up on the next sync. No
/// callback is ever delivered during registration.
pub struct SimulatedScroll {
    doc: SharedDocument,
    viewport_height: Cell<f64>,
    scroll_y: Cell<f64>,
    next_id: Cell<u64>,
    registrations: Cell<usize>,
    refreshes: Cell<usize>,
    observers: RefCell<Vec<Observer>>,
}

impl SimulatedScroll {
    pub fn new(doc: SharedDocument, viewport_height: f64) -> Self {
        Self {
            doc,
            viewport_height: Cell::new(viewport_height),
            scroll_y: Cell::new(0.0),
            next_id: Cell::new(1),
            registrations: Cell::new(0),
            refreshes: Cell::new(0),
            observers: RefCell::new(Vec::new()),
        }
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }

    /// Move the viewport and dispatch every resulting update.
    pub fn scroll_to(&self, y: f64) {
        self.scroll_y.set(y);
        self.sync();
    }

    /// Resize the viewport and re-dispatch against the new thresholds.
    /// Instances re-measure their own geometry through `Engine::refresh`.
    pub fn set_viewport_height(&self, h: f64) {
        self.viewport_height.set(h);
        self.sync();
    }

    /// Total number of observers ever registered.
    pub fn registrations(&self) -> usize {
        self.registrations.get()
    }

    /// Observers whose handle has not been killed.
    pub fn live_observers(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|o| o.handle.is_alive())
            .count()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.get()
    }

    /// Deliver `progress` to one scrub observer, skipping killed handles.
    pub fn emit_progress(&self, handle_id: u64, progress: f64) {
        if let Some(d) = self.progress_dispatch(handle_id, progress) {
            d.run(true);
        }
    }

    /// Deliver `event` to one boundary observer, skipping killed handles.
    pub fn emit_boundary(&self, handle_id: u64, event: BoundaryEvent) {
        if let Some(d) = self.boundary_dispatch(handle_id, event) {
            d.run(true);
        }
    }

    /// Deliver `progress` even if the handle was killed, as a callback that
    /// was already queued for the current tick would be.
    pub fn emit_progress_in_flight(&self, handle_id: u64, progress: f64) {
        if let Some(d) = self.progress_dispatch(handle_id, progress) {
            d.run(false);
        }
    }

    /// Boundary counterpart of [`SimulatedScroll::emit_progress_in_flight`].
    pub fn emit_boundary_in_flight(&self, handle_id: u64, event: BoundaryEvent) {
        if let Some(d) = self.boundary_dispatch(handle_id, event) {
            d.run(false);
        }
    }

    /// Ids of live scrub observers in registration order.
    pub fn scrub_ids(&self) -> Vec<u64> {
        self.ids(|k| matches!(k, ObserverKind::Scrub { .. }))
    }

    /// Ids of live boundary observers in registration order.
    pub fn boundary_ids(&self) -> Vec<u64> {
        self.ids(|k| matches!(k, ObserverKind::Boundary { .. }))
    }

    /// Trigger node and pin flag of a scrub observer.
    pub fn scrub_config(&self, handle_id: u64) -> Option<ScrubConfig> {
        self.observers
            .borrow()
            .iter()
            .find_map(|o| match &o.kind {
                ObserverKind::Scrub { config, .. } if o.handle.id() == handle_id => Some(*config),
                _ => None,
            })
    }

    fn ids(&self, pred: impl Fn(&ObserverKind) -> bool) -> Vec<u64> {
        self.observers
            .borrow()
            .iter()
            .filter(|o| o.handle.is_alive() && pred(&o.kind))
            .map(|o| o.handle.id())
            .collect()
    }

    fn progress_dispatch(&self, handle_id: u64, progress: f64) -> Option<Dispatch> {
        let observers = self.observers.borrow();
        observers.iter().find_map(|o| match &o.kind {
            ObserverKind::Scrub { callback, .. } if o.handle.id() == handle_id => Some(
                Dispatch::Progress(o.handle.clone(), callback.clone(), progress.clamp(0.0, 1.0)),
            ),
            _ => None,
        })
    }

    fn boundary_dispatch(&self, handle_id: u64, event: BoundaryEvent) -> Option<Dispatch> {
        let observers = self.observers.borrow();
        observers.iter().find_map(|o| match &o.kind {
            ObserverKind::Boundary { callback, .. } if o.handle.id() == handle_id => Some(
                Dispatch::Boundary(o.handle.clone(), callback.clone(), event),
            ),
            _ => None,
        })
    }

    fn next_handle(&self) -> Disposable {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.registrations.set(self.registrations.get() + 1);
        Disposable::new(id)
    }

    fn span(&self, trigger: NodeId, start: Threshold, end: SpanEnd) -> (f64, f64) {
        let doc = self.doc.borrow();
        let rect = doc.rect(trigger);
        let vh = self.viewport_height.get();
        let s = start.scroll_position(rect, vh);
        (s, end.scroll_position(s, rect, vh))
    }

    fn sync(&self) {
        let y = self.scroll_y.get();
        let mut queue = Vec::new();
        {
            let mut observers = self.observers.borrow_mut();
            observers.retain(|o| o.handle.is_alive());
            for o in observers.iter_mut() {
                match &mut o.kind {
                    ObserverKind::Scrub {
                        config,
                        callback,
                        last,
                    } => {
                        let (s, e) = self.span(config.trigger, config.start, config.end);
                        let p = scrub_progress(y, s, e);
                        if *last != Some(p) {
                            *last = Some(p);
                            queue.push(Dispatch::Progress(o.handle.clone(), callback.clone(), p));
                        }
                    }
                    ObserverKind::Boundary {
                        config,
                        callback,
                        region,
                    } => {
                        let end = config.end.unwrap_or(SpanEnd::At(BOTTOM_TOP));
                        let (s, e) = self.span(config.trigger, config.start, end);
                        let next = region_of(y, s, e);
                        for ev in crossings(*region, next) {
                            queue.push(Dispatch::Boundary(o.handle.clone(), callback.clone(), ev));
                        }
                        *region = next;
                    }
                }
            }
        }
        for d in queue {
            d.run(true);
        }
    }
}

const BOTTOM_TOP: Threshold = Threshold::new(
    crate::threshold::Edge::Fraction(1.0),
    crate::threshold::Edge::Fraction(0.0),
);

fn scrub_progress(y: f64, start: f64, end: f64) -> f64 {
    if end <= start {
        return if y >= start { 1.0 } else { 0.0 };
    }
    ((y - start) / (end - start)).clamp(0.0, 1.0)
}

fn region_of(y: f64, start: f64, end: f64) -> Region {
    if y < start {
        Region::Before
    } else if y < end.max(start) {
        Region::Inside
    } else {
        Region::After
    }
}

fn crossings(from: Region, to: Region) -> Vec<BoundaryEvent> {
    use BoundaryEvent::*;
    match (from, to) {
        (Region::Before, Region::Inside) => vec![Enter],
        (Region::Before, Region::After) => vec![Enter, Leave],
        (Region::Inside, Region::After) => vec![Leave],
        (Region::After, Region::Inside) => vec![EnterBack],
        (Region::After, Region::Before) => vec![EnterBack, LeaveBack],
        (Region::Inside, Region::Before) => vec![LeaveBack],
        _ => Vec::new(),
    }
}

impl ScrollTracker for SimulatedScroll {
    fn observe_scrub(&self, config: ScrubConfig, on_update: ProgressCallback) -> Disposable {
        let handle = self.next_handle();
        self.observers.borrow_mut().push(Observer {
            handle: handle.clone(),
            kind: ObserverKind::Scrub {
                config,
                callback: Rc::new(RefCell::new(on_update)),
                last: None,
            },
        });
        handle
    }

    fn observe_boundary(&self, config: BoundaryConfig, on_event: BoundaryCallback) -> Disposable {
        let handle = self.next_handle();
        self.observers.borrow_mut().push(Observer {
            handle: handle.clone(),
            kind: ObserverKind::Boundary {
                config,
                callback: Rc::new(RefCell::new(on_event)),
                region: Region::Before,
            },
        });
        handle
    }

    fn refresh_all(&self) {
        self.refreshes.set(self.refreshes.get() + 1);
        self.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use kurbo::Rect;

    fn setup() -> (SharedDocument, NodeId, SimulatedScroll) {
        let mut doc = Document::new();
        let n = doc.create_element("section");
        doc.append_child(doc.root(), n);
        doc.set_rect(n, Rect::new(0.0, 1000.0, 400.0, 1400.0));
        let doc = doc.into_shared();
        let scroll = SimulatedScroll::new(doc.clone(), 800.0);
        (doc, n, scroll)
    }

    #[test]
    fn scrub_reports_clamped_progress() {
        let (_doc, n, scroll) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        scroll.observe_scrub(
            ScrubConfig {
                trigger: n,
                start: Threshold::parse("top bottom").unwrap(),
                end: SpanEnd::After(400.0),
                pin: false,
            },
            Box::new(move |p| sink.borrow_mut().push(p)),
        );
        assert!(seen.borrow().is_empty());
        scroll.scroll_to(0.0);
        scroll.scroll_to(400.0);
        scroll.scroll_to(400.0);
        scroll.scroll_to(5000.0);
        assert_eq!(*seen.borrow(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn boundary_events_follow_direction() {
        let (_doc, n, scroll) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        scroll.observe_boundary(
            BoundaryConfig {
                trigger: n,
                start: Threshold::parse("top 80%").unwrap(),
                end: None,
            },
            Box::new(move |ev| sink.borrow_mut().push(ev)),
        );
        // start = 1000 - 640 = 360, end = 1400
        scroll.scroll_to(100.0);
        scroll.scroll_to(500.0);
        scroll.scroll_to(1500.0);
        scroll.scroll_to(1000.0);
        scroll.scroll_to(0.0);
        use BoundaryEvent::*;
        assert_eq!(*seen.borrow(), vec![Enter, Leave, EnterBack, LeaveBack]);
    }

    #[test]
    fn killed_observers_are_skipped_but_in_flight_delivery_is_possible() {
        let (_doc, n, scroll) = setup();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let handle = scroll.observe_scrub(
            ScrubConfig {
                trigger: n,
                start: Threshold::parse("top bottom").unwrap(),
                end: SpanEnd::After(100.0),
                pin: false,
            },
            Box::new(move |_| c.set(c.get() + 1)),
        );
        assert_eq!(scroll.live_observers(), 1);
        scroll.emit_progress(handle.id(), 0.3);
        handle.kill();
        scroll.emit_progress(handle.id(), 0.4);
        assert_eq!(count.get(), 1);
        scroll.emit_progress_in_flight(handle.id(), 0.5);
        assert_eq!(count.get(), 2);
        scroll.scroll_to(300.0);
        assert_eq!(scroll.live_observers(), 0);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn viewport_resize_moves_thresholds() {
        let (_doc, n, scroll) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        scroll.observe_boundary(
            BoundaryConfig {
                trigger: n,
                start: Threshold::parse("top 80%").unwrap(),
                end: None,
            },
            Box::new(move |ev| sink.borrow_mut().push(ev)),
        );
        // start = 1000 - 640 = 360
        scroll.scroll_to(300.0);
        assert!(seen.borrow().is_empty());
        // start = 1000 - 800 = 200
        scroll.set_viewport_height(1000.0);
        assert_eq!(scroll.scroll_y(), 300.0);
        assert_eq!(*seen.borrow(), vec![BoundaryEvent::Enter]);
    }

    #[test]
    fn degenerate_span_is_a_step() {
        assert_eq!(scrub_progress(10.0, 10.0, 10.0), 1.0);
        assert_eq!(scrub_progress(9.0, 10.0, 5.0), 0.0);
    }
}
