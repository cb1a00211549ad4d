//! Bookkeeping for renderer-side allocations.
//!
//! Every primitive holds one geometry and one material handle. Disposing a
//! cup releases both, and the tracker counts what is still alive. The
//! Canvas2D host keys its texture patterns by the material [`ResourceId`].

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Geometry,
    Material,
}

#[derive(Debug, Default)]
pub struct ResourceTracker {
    next_id: u64,
    live: HashMap<ResourceId, ResourceKind>,
    released_total: u64,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, kind: ResourceKind) -> ResourceId {
        self.next_id += 1;
        let id = ResourceId(self.next_id);
        self.live.insert(id, kind);
        id
    }

    /// Release a handle. Returns `false` if it was not live.
    pub fn release(&mut self, id: ResourceId) -> bool {
        if self.live.remove(&id).is_some() {
            self.released_total += 1;
            true
        } else {
            log::warn!("release of unknown or already released resource {}", id.0);
            false
        }
    }

    pub fn is_live(&self, id: ResourceId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_of(&self, kind: ResourceKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    pub fn allocated_total(&self) -> u64 {
        self.next_id
    }

    pub fn released_total(&self) -> u64 {
        self.released_total
    }
}
