//! Speculative placement: trial, commit, cancel, and the gesture session
//! that drives them from a stream of input samples.

mod cache;
mod gesture;
mod transaction;

pub use cache::{NegativeCache, PlacementKey};
pub use gesture::{Gesture, GestureKind, GestureStep};
pub use transaction::{PendingPlacement, PlacementOutcome, PlacementTransaction, TrialReport};
