//! Plain-record view of a grid's resting layout.
//!
//! Persisting a layout is left to the host; these records are the exchange
//! format. Pending shifts are never part of a snapshot.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::geometry::{Rect, Size};
use crate::resolver::detect;

use super::core::{GridRegistry, WidgetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetRecord {
    pub id: WidgetId,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl WidgetRecord {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub width: u32,
    pub height: u32,
    pub widgets: Vec<WidgetRecord>,
}

impl LayoutSnapshot {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Content hash of the layout, used to tell whether anything moved.
    pub fn digest(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.width.to_le_bytes());
        hasher.update(&self.height.to_le_bytes());
        for record in &self.widgets {
            hasher.update(&record.id.get().to_le_bytes());
            for value in [record.x, record.y, record.width, record.height] {
                hasher.update(&value.to_le_bytes());
            }
        }
        hasher.finalize()
    }
}

impl GridRegistry {
    pub fn snapshot(&self) -> LayoutSnapshot {
        let size = self.size();
        LayoutSnapshot {
            width: size.width,
            height: size.height,
            widgets: self
                .all()
                .map(|(id, widget)| {
                    let rect = widget.rect();
                    WidgetRecord {
                        id,
                        x: rect.x,
                        y: rect.y,
                        width: rect.width,
                        height: rect.height,
                    }
                })
                .collect(),
        }
    }

    /// Rebuild a registry from records, keeping their ids. The layout must
    /// already be valid: unique positive ids, non-empty rects inside the
    /// bounds, no overlaps.
    pub fn from_snapshot(snapshot: &LayoutSnapshot) -> Result<Self> {
        let size = snapshot.size();
        let mut seen = BTreeSet::new();
        let mut widgets = Vec::with_capacity(snapshot.widgets.len());

        for record in &snapshot.widgets {
            let rect = record.rect();
            if record.id.get() == 0 {
                return Err(GridError::InvalidId(record.id));
            }
            if !seen.insert(record.id) {
                return Err(GridError::DuplicateId(record.id));
            }
            if rect.is_empty() {
                return Err(GridError::EmptyRect(rect));
            }
            if rect.overflows() {
                return Err(GridError::RectOverflow(rect));
            }
            if !rect.fits_within(size) {
                return Err(GridError::Capacity {
                    requested: size,
                    widget: record.id,
                    rect,
                });
            }
            widgets.push((record.id, rect));
        }

        if let Some(pair) = detect(widgets.iter().copied()).first() {
            return Err(GridError::Overlap(pair.low(), pair.high()));
        }

        GridRegistry::restore(size, widgets)
    }
}
