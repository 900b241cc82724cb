use crate::registry::WidgetId;

/// Scale applied to cell coordinates before sweeping.
pub const TRIPLE: i64 = 3;

/// Whether an edge opens or closes its owner's interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    Open,
    Close,
}

impl EdgeKind {
    pub fn delta(self) -> i32 {
        match self {
            EdgeKind::Open => 1,
            EdgeKind::Close => -1,
        }
    }
}

/// One sweep-line event on a single axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub coord: i64,
    pub owner: WidgetId,
    pub kind: EdgeKind,
}

/// An interval `[start, start + len)` in tripled units.
///
/// `open` sits one unit after the first cell boundary and `close` one unit
/// before the last, so intervals that merely touch never share a coordinate
/// range while overlapping ones always do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub open: i64,
    pub close: i64,
}

impl Span {
    pub fn cells(start: u32, len: u32) -> Self {
        let start = i64::from(start);
        let end = start + i64::from(len);
        Self {
            open: start * TRIPLE + 1,
            close: end * TRIPLE - 1,
        }
    }

    /// First cell after the interval.
    pub fn end_cell(&self) -> i64 {
        (self.close + 1) / TRIPLE
    }

    pub fn shift_cells(&mut self, cells: i64) {
        self.open += cells * TRIPLE;
        self.close += cells * TRIPLE;
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.open < other.close && other.open < self.close
    }

    pub fn edges(&self, owner: WidgetId) -> [Edge; 2] {
        [
            Edge {
                coord: self.open,
                owner,
                kind: EdgeKind::Open,
            },
            Edge {
                coord: self.close,
                owner,
                kind: EdgeKind::Close,
            },
        ]
    }
}
