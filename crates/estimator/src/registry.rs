//! Anchor registry: anchor id -> owned anchor state.
//!
//! Anchors are registered lazily as ids show up on the stream and are never
//! evicted during a run. The registry is owned by the estimation engine,
//! which is itself driven by a single pipeline task, so all access is
//! exclusive by construction.

use std::collections::HashMap;

use contracts::AnchorId;

use crate::anchor::Anchor;

/// Mapping from anchor id to owned anchor state.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    anchors: HashMap<AnchorId, Anchor>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.anchors.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Anchor> {
        self.anchors.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Anchor> {
        self.anchors.get_mut(id)
    }

    /// Register an anchor, replacing any prior entry with the same id.
    pub fn insert(&mut self, anchor: Anchor) {
        self.anchors.insert(anchor.id().clone(), anchor);
    }

    /// The subset of `ids` not yet registered, preserving order.
    pub fn unknown_ids(&self, ids: &[AnchorId]) -> Vec<AnchorId> {
        ids.iter()
            .filter(|id| !self.contains(id.as_str()))
            .cloned()
            .collect()
    }

    /// Iterate over all registered anchors.
    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }
}
