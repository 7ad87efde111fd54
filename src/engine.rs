//! Top-level owner of a page's animations.

use crate::{
    behaviors::ScrollAnimation,
    dom::NodeId,
    lifecycle::LifecycleState,
    registry::{BoundInstance, Registry},
    services::Services,
};

/// Registry plus the instances it bound, torn down together.
#[derive(Debug)]
pub struct Engine {
    registry: Registry,
    instances: Vec<BoundInstance>,
}

impl Engine {
    pub fn new(services: Services) -> Self {
        Self {
            registry: Registry::new(services),
            instances: Vec::new(),
        }
    }

    pub fn services(&self) -> &Services {
        self.registry.services()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn instances(&self) -> &[BoundInstance] {
        &self.instances
    }

    /// Discover under `root` and keep what was bound. Returns how many
    /// instances were added.
    pub fn init(&mut self, root: NodeId) -> usize {
        let found = self.registry.discover_and_instantiate(root);
        let n = found.len();
        self.instances.extend(found);
        n
    }

    /// Discover under the document root.
    pub fn init_document(&mut self) -> usize {
        let root = self.services().doc.borrow().root();
        self.init(root)
    }

    /// Re-measure after a resize or reflow: every instance first, then the
    /// tracker.
    pub fn refresh(&self) {
        for i in &self.instances {
            i.animation.refresh();
        }
        self.services().scroll.refresh_all();
    }

    /// Destroy every instance. Bound ids stay reserved.
    pub fn destroy(&mut self) {
        for i in self.instances.drain(..) {
            i.animation.destroy();
        }
        tracing::debug!("engine destroyed");
    }

    pub fn live_handles(&self) -> usize {
        self.instances.iter().map(|i| i.animation.live_handles()).sum()
    }

    pub fn active_count(&self) -> usize {
        self.instances
            .iter()
            .filter(|i| i.animation.state() != LifecycleState::Unbound)
            .count()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.destroy();
    }
}
