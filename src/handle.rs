use std::{cell::Cell, rc::Rc};

/// Cancellation handle shared between a collaborator and its subscriber.
///
/// The issuer keeps a clone and checks [`Disposable::is_alive`] before every
/// dispatch; the subscriber calls [`Disposable::kill`] on teardown.
#[derive(Clone, Debug)]
pub struct Disposable {
    id: u64,
    alive: Rc<Cell<bool>>,
}

impl Disposable {
    /// Create a live handle with an issuer-assigned id.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            alive: Rc::new(Cell::new(true)),
        }
    }

    /// Issuer-assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mark the handle dead. Idempotent.
    pub fn kill(&self) {
        self.alive.set(false);
    }

    /// `true` until [`Disposable::kill`] has been called on any clone.
    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }
}

/// Set of handles owned by one instance, released together.
#[derive(Debug, Default)]
pub struct HandleSet {
    handles: Vec<Disposable>,
}

impl HandleSet {
    pub fn push(&mut self, handle: Disposable) {
        self.handles.retain(Disposable::is_alive);
        self.handles.push(handle);
    }

    /// Number of handles still alive.
    pub fn live(&self) -> usize {
        self.handles.iter().filter(|h| h.is_alive()).count()
    }

    pub fn kill_all(&mut self) {
        for h in self.handles.drain(..) {
            h.kill();
        }
    }
}
