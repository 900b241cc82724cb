use std::collections::HashSet;

use crate::geometry::Rect;
use crate::registry::WidgetId;

/// Exact placement that was tried for a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlacementKey {
    pub id: WidgetId,
    pub rect: Rect,
}

impl PlacementKey {
    pub fn new(id: WidgetId, rect: Rect) -> Self {
        Self { id, rect }
    }
}

/// Placements known to be infeasible against the current resting layout.
///
/// Only exact matches count; a neighbouring rect is always re-resolved.
#[derive(Debug, Default, Clone)]
pub struct NegativeCache {
    entries: HashSet<PlacementKey>,
    hits: u64,
}

impl NegativeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`, counting a hit when it is present.
    pub fn check(&mut self, key: &PlacementKey) -> bool {
        let hit = self.entries.contains(key);
        if hit {
            self.hits = self.hits.saturating_add(1);
        }
        hit
    }

    pub fn insert(&mut self, key: PlacementKey) {
        self.entries.insert(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}
