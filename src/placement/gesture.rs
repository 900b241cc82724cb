use crate::geometry::{Rect, Size};
use crate::registry::WidgetId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Drag,
    Resize,
}

impl GestureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GestureKind::Drag => "drag",
            GestureKind::Resize => "resize",
        }
    }
}

/// Result of feeding one input sample into a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureStep {
    /// The clamped candidate equals what is already shown; nothing ran.
    Unchanged(Rect),
    Accepted(Rect),
    Rejected(Rect),
}

impl GestureStep {
    pub fn rect(&self) -> Rect {
        match self {
            GestureStep::Unchanged(rect)
            | GestureStep::Accepted(rect)
            | GestureStep::Rejected(rect) => *rect,
        }
    }
}

/// An in-progress drag or resize of one widget, in cell units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gesture {
    id: WidgetId,
    kind: GestureKind,
    origin: Rect,
    shown: Rect,
    accepted: Option<Rect>,
}

impl Gesture {
    pub fn new(id: WidgetId, kind: GestureKind, origin: Rect) -> Self {
        Self {
            id,
            kind,
            origin,
            shown: origin,
            accepted: None,
        }
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    pub fn kind(&self) -> GestureKind {
        self.kind
    }

    pub fn origin(&self) -> Rect {
        self.origin
    }

    /// The rect the widget currently occupies on screen.
    pub fn shown(&self) -> Rect {
        self.shown
    }

    /// Last accepted placement, the one `end` commits.
    pub fn accepted(&self) -> Option<Rect> {
        self.accepted
    }

    /// Keep the widget's size and clamp its origin inside the grid.
    pub fn drag_candidate(&self, grid: Size, x: u32, y: u32) -> Rect {
        let max_x = grid.width.saturating_sub(self.shown.width);
        let max_y = grid.height.saturating_sub(self.shown.height);
        self.shown.with_origin(x.min(max_x), y.min(max_y))
    }

    /// Keep the widget's origin and clamp its size to at least one cell and
    /// at most the space left before the grid edge.
    pub fn resize_candidate(&self, grid: Size, width: u32, height: u32) -> Rect {
        let max_width = grid.width.saturating_sub(self.shown.x).max(1);
        let max_height = grid.height.saturating_sub(self.shown.y).max(1);
        self.shown
            .with_size(width.clamp(1, max_width), height.clamp(1, max_height))
    }

    pub(crate) fn accept(&mut self, rect: Rect) {
        self.shown = rect;
        self.accepted = Some(rect);
    }

    /// Forget accepted progress after the pending trial was invalidated.
    pub(crate) fn reset(&mut self) {
        self.shown = self.origin;
        self.accepted = None;
    }

    /// Start over from a new resting rect after a commit moved the widget.
    pub(crate) fn rebase(&mut self, origin: Rect) {
        self.origin = origin;
        self.reset();
    }
}
