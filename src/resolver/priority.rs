use std::collections::BTreeMap;

use crate::registry::WidgetId;

use super::sweep::OverlapPair;

/// Rank of a widget during one resolution; smaller ranks stay put.
///
/// Variant order matters: the anchor sorts before every resting widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// The widget being moved or resized.
    Anchor,
    /// A resident widget, ranked by the row it rested on when the
    /// resolution began, then by id.
    Resting { row: u32, id: WidgetId },
}

/// Priorities frozen at the start of a resolution.
#[derive(Debug, Clone)]
pub struct PriorityTable {
    ranks: BTreeMap<WidgetId, Priority>,
}

impl PriorityTable {
    pub fn new<I>(anchor: WidgetId, resting_rows: I) -> Self
    where
        I: IntoIterator<Item = (WidgetId, u32)>,
    {
        let mut ranks: BTreeMap<_, _> = resting_rows
            .into_iter()
            .map(|(id, row)| (id, Priority::Resting { row, id }))
            .collect();
        ranks.insert(anchor, Priority::Anchor);
        Self { ranks }
    }

    /// Widgets missing from the table rank below everything else.
    pub fn rank(&self, id: WidgetId) -> Priority {
        self.ranks.get(&id).copied().unwrap_or(Priority::Resting {
            row: u32::MAX,
            id,
        })
    }

    /// Split a conflicting pair into `(keep, move)`.
    pub fn arbitrate(&self, pair: OverlapPair) -> (WidgetId, WidgetId) {
        let (a, b) = (pair.low(), pair.high());
        if self.rank(a) <= self.rank(b) {
            (a, b)
        } else {
            (b, a)
        }
    }
}
