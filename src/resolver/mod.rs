//! Overlap resolution for a single widget's proposed placement.
//!
//! Coordinates are tripled and nudged inward (`3a + 1`, `3(a + w) - 1`) so
//! that widgets sharing an edge are never reported as overlapping. The
//! sweep, the 2-D detector and the priority table are independent pieces;
//! [`CascadeResolver`] drives them to a fixed point.

mod cascade;
mod edge;
mod overlap;
mod priority;
mod sweep;

pub use cascade::{Cascade, CascadeResolver, DEFAULT_MAX_PASSES, Infeasible, Resolution};
pub use edge::{Edge, EdgeKind, Span, TRIPLE};
pub use overlap::{SweepState, detect};
pub use priority::{Priority, PriorityTable};
pub use sweep::{OverlapPair, sweep};
