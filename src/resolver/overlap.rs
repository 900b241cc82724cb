use std::collections::{BTreeMap, HashSet};

use crate::geometry::Rect;
use crate::registry::WidgetId;

use super::edge::{Edge, Span};
use super::sweep::{OverlapPair, sweep};

/// Per-widget spans on both axes, mutated in place while a cascade runs.
#[derive(Debug, Clone, Default)]
pub struct SweepState {
    x: BTreeMap<WidgetId, Span>,
    y: BTreeMap<WidgetId, Span>,
}

impl SweepState {
    pub fn from_boxes<I>(boxes: I) -> Self
    where
        I: IntoIterator<Item = (WidgetId, Rect)>,
    {
        let mut state = Self::default();
        for (id, rect) in boxes {
            state.x.insert(id, Span::cells(rect.x, rect.width));
            state.y.insert(id, Span::cells(rect.y, rect.height));
        }
        state
    }

    pub fn y_span(&self, id: WidgetId) -> Option<Span> {
        self.y.get(&id).copied()
    }

    pub(crate) fn y_span_mut(&mut self, id: WidgetId) -> Option<&mut Span> {
        self.y.get_mut(&id)
    }

    pub fn x_overlaps(&self) -> HashSet<OverlapPair> {
        sweep(&axis_edges(&self.x)).into_iter().collect()
    }

    pub fn y_overlaps(&self) -> Vec<OverlapPair> {
        sweep(&axis_edges(&self.y))
    }

    /// Pairs overlapping on Y that also overlap on X, in Y discovery order.
    pub fn conflicts(&self, x_overlaps: &HashSet<OverlapPair>) -> Vec<OverlapPair> {
        self.y_overlaps()
            .into_iter()
            .filter(|pair| x_overlaps.contains(pair))
            .collect()
    }
}

fn axis_edges(spans: &BTreeMap<WidgetId, Span>) -> Vec<Edge> {
    spans
        .iter()
        .flat_map(|(id, span)| span.edges(*id))
        .collect()
}

/// Pairs of boxes that truly intersect in two dimensions.
pub fn detect<I>(boxes: I) -> Vec<OverlapPair>
where
    I: IntoIterator<Item = (WidgetId, Rect)>,
{
    let state = SweepState::from_boxes(boxes);
    let x_overlaps = state.x_overlaps();
    state.conflicts(&x_overlaps)
}
