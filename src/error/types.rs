use thiserror::Error;

use crate::geometry::{Rect, Size};
use crate::registry::WidgetId;

/// Unified result type for the widget grid engine.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors surfaced by the grid engine.
///
/// A placement that cannot be resolved is not an error; it comes back as a
/// rejected trial.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("widget `{0}` is not registered")]
    UnknownId(WidgetId),
    #[error("capacity {requested} would strand widget `{widget}` at {rect}")]
    Capacity {
        requested: Size,
        widget: WidgetId,
        rect: Rect,
    },
    #[error("rect {0} has zero width or height")]
    EmptyRect(Rect),
    #[error("rect {0} extends past the coordinate range")]
    RectOverflow(Rect),
    #[error("no accepted placement of widget `{id}` at {rect} to commit")]
    NotAccepted { id: WidgetId, rect: Rect },
    #[error("widgets `{0}` and `{1}` overlap")]
    Overlap(WidgetId, WidgetId),
    #[error("widget id `{0}` appears more than once")]
    DuplicateId(WidgetId),
    #[error("widget id `{0}` is outside the assignable range")]
    InvalidId(WidgetId),
    #[error("a gesture on widget `{0}` is already active")]
    GestureActive(WidgetId),
    #[error("no gesture is active")]
    NoGesture,
    #[error("layout snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}
