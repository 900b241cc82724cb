//! Overlap resolution for dashboard-style widget grids.
//!
//! Widgets occupy axis-aligned rectangles on an integer grid. When one
//! widget is dragged or resized, the widgets it lands on are pushed down
//! until the layout is overlap free again, or the placement is rejected.
//! Trials are speculative: displaced widgets carry a pending shift until
//! the placement is committed or cancelled.

pub mod engine;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod metrics;
pub mod placement;
pub mod registry;
pub mod resolver;

pub use engine::audit::{
    GridAudit, GridAuditEvent, GridAuditEventBuilder, GridAuditStage, NullGridAudit,
};
pub use engine::{EngineConfig, GridEngine};
pub use error::{GridError, Result};
pub use geometry::{Rect, Size};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{MetricSnapshot, PlacementMetrics};
pub use placement::{
    Gesture, GestureKind, GestureStep, NegativeCache, PendingPlacement, PlacementKey,
    PlacementOutcome, PlacementTransaction, TrialReport,
};
pub use registry::{GridRegistry, LayoutSnapshot, Widget, WidgetId, WidgetRecord};
pub use resolver::{
    Cascade, CascadeResolver, DEFAULT_MAX_PASSES, Infeasible, OverlapPair, Priority,
    PriorityTable, Resolution, detect,
};
