use std::collections::BTreeSet;

use crate::registry::WidgetId;

use super::edge::{Edge, EdgeKind};

/// Unordered pair of widgets whose intervals overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlapPair {
    low: WidgetId,
    high: WidgetId,
}

impl OverlapPair {
    pub fn new(a: WidgetId, b: WidgetId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> WidgetId {
        self.low
    }

    pub fn high(&self) -> WidgetId {
        self.high
    }

    pub fn contains(&self, id: WidgetId) -> bool {
        self.low == id || self.high == id
    }
}

/// Report every pair of intervals that overlap on one axis.
///
/// Pairs come back once each, in the order the sweep line discovers them
/// (ascending by the coordinate where the later interval opens).
pub fn sweep(edges: &[Edge]) -> Vec<OverlapPair> {
    let mut ordered = edges.to_vec();
    ordered.sort_unstable_by_key(|edge| (edge.coord, edge.kind, edge.owner));

    let mut occupancy = 0i32;
    let mut open: BTreeSet<WidgetId> = BTreeSet::new();
    let mut pairs = Vec::new();

    for edge in ordered {
        occupancy += edge.kind.delta();
        match edge.kind {
            EdgeKind::Open => {
                if occupancy > 1 {
                    pairs.extend(open.iter().map(|other| OverlapPair::new(*other, edge.owner)));
                }
                open.insert(edge.owner);
            }
            EdgeKind::Close => {
                open.remove(&edge.owner);
            }
        }
    }

    pairs
}
