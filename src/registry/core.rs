use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::geometry::{Rect, Size};

/// Stable widget identifier. Ids start at 1 and are never reused by a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(u64);

impl WidgetId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A widget's resting rectangle plus the speculative shift of an
/// uncommitted placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Widget {
    id: WidgetId,
    rect: Rect,
    pending_shift: u32,
}

impl Widget {
    fn new(id: WidgetId, rect: Rect) -> Self {
        Self {
            id,
            rect,
            pending_shift: 0,
        }
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// Last committed rectangle.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn pending_shift(&self) -> u32 {
        self.pending_shift
    }

    /// Where the widget should be drawn while a trial is pending.
    pub fn display_rect(&self) -> Rect {
        self.rect.shifted_down(self.pending_shift)
    }
}

/// Owns every widget on one grid together with the grid capacity.
#[derive(Debug, Clone)]
pub struct GridRegistry {
    size: Size,
    widgets: BTreeMap<WidgetId, Widget>,
    next_id: u64,
    dirty: BTreeSet<WidgetId>,
}

impl GridRegistry {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            widgets: BTreeMap::new(),
            next_id: 1,
            dirty: BTreeSet::new(),
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Store a widget at `rect` under a fresh id. Overlap with resident
    /// widgets is not checked; capacity grows to cover `rect`.
    pub fn register(&mut self, rect: Rect) -> Result<WidgetId> {
        if rect.is_empty() {
            return Err(GridError::EmptyRect(rect));
        }
        if rect.overflows() {
            return Err(GridError::RectOverflow(rect));
        }
        let id = WidgetId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(GridError::InvalidId(id))?;
        self.size = self.size.union(Size::covering(&rect));
        self.widgets.insert(id, Widget::new(id, rect));
        self.dirty.insert(id);
        Ok(id)
    }

    /// Remove a widget. Removing an absent id is a no-op.
    pub fn unregister(&mut self, id: WidgetId) -> Option<Widget> {
        self.dirty.remove(&id);
        self.widgets.remove(&id)
    }

    pub fn get(&self, id: WidgetId) -> Option<&Widget> {
        self.widgets.get(&id)
    }

    pub fn widget(&self, id: WidgetId) -> Result<&Widget> {
        self.widgets.get(&id).ok_or(GridError::UnknownId(id))
    }

    pub fn contains(&self, id: WidgetId) -> bool {
        self.widgets.contains_key(&id)
    }

    /// Widgets in ascending id order.
    pub fn all(&self) -> impl Iterator<Item = (WidgetId, &Widget)> + '_ {
        self.widgets.iter().map(|(id, widget)| (*id, widget))
    }

    /// Change the grid bounds. Shrinking fails if any widget would no
    /// longer fit.
    pub fn resize_capacity(&mut self, size: Size) -> Result<()> {
        if let Some(widget) = self
            .widgets
            .values()
            .find(|widget| !widget.rect.fits_within(size))
        {
            return Err(GridError::Capacity {
                requested: size,
                widget: widget.id,
                rect: widget.rect,
            });
        }
        self.size = size;
        Ok(())
    }

    pub fn take_dirty(&mut self) -> Vec<(WidgetId, Widget)> {
        let ids: Vec<_> = std::mem::take(&mut self.dirty).into_iter().collect();
        ids.into_iter()
            .filter_map(|id| self.widgets.get(&id).map(|widget| (id, *widget)))
            .collect()
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub(crate) fn set_rect(&mut self, id: WidgetId, rect: Rect) -> Result<()> {
        let widget = self
            .widgets
            .get_mut(&id)
            .ok_or(GridError::UnknownId(id))?;
        if widget.rect != rect {
            widget.rect = rect;
            self.dirty.insert(id);
        }
        Ok(())
    }

    pub(crate) fn set_pending_shift(&mut self, id: WidgetId, shift: u32) -> Result<()> {
        let widget = self
            .widgets
            .get_mut(&id)
            .ok_or(GridError::UnknownId(id))?;
        if widget.pending_shift != shift {
            widget.pending_shift = shift;
            self.dirty.insert(id);
        }
        Ok(())
    }

    /// Fold the pending shift into the resting rectangle.
    pub(crate) fn settle_shift(&mut self, id: WidgetId) -> Result<()> {
        let widget = self
            .widgets
            .get_mut(&id)
            .ok_or(GridError::UnknownId(id))?;
        if widget.pending_shift > 0 {
            widget.rect = widget.rect.shifted_down(widget.pending_shift);
            widget.pending_shift = 0;
            self.dirty.insert(id);
        }
        Ok(())
    }

    /// Rebuild from validated records. Ids must be positive and leave room
    /// for the next assignment.
    pub(crate) fn restore(size: Size, widgets: Vec<(WidgetId, Rect)>) -> Result<Self> {
        let highest = widgets.iter().map(|(id, _)| *id).max();
        let next_id = match highest {
            Some(id) => id.0.checked_add(1).ok_or(GridError::InvalidId(id))?,
            None => 1,
        };
        let dirty = widgets.iter().map(|(id, _)| *id).collect();
        let widgets = widgets
            .into_iter()
            .map(|(id, rect)| (id, Widget::new(id, rect)))
            .collect();
        Ok(Self {
            size,
            widgets,
            next_id,
            dirty,
        })
    }
}
