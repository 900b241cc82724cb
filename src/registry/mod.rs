//! Grid registry: widget records, id assignment, capacity and snapshots.

mod core;
mod snapshot;

pub use self::core::{GridRegistry, Widget, WidgetId};
pub use snapshot::{LayoutSnapshot, WidgetRecord};
