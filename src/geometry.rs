use std::fmt;

use serde::{Deserialize, Serialize};

/// Grid capacity measured in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Smallest size that contains `rect` when anchored at the origin.
    pub fn covering(rect: &Rect) -> Self {
        Self::new(rect.right(), rect.bottom())
    }

    pub fn union(self, other: Size) -> Self {
        Self::new(self.width.max(other.width), self.height.max(other.height))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Cell-aligned rectangle covering `[x, x + width) × [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Far edges cannot be represented; `right`/`bottom` would saturate.
    pub fn overflows(&self) -> bool {
        self.x.checked_add(self.width).is_none() || self.y.checked_add(self.height).is_none()
    }

    pub fn shifted_down(&self, rows: u32) -> Self {
        Self {
            y: self.y.saturating_add(rows),
            ..*self
        }
    }

    pub fn with_origin(&self, x: u32, y: u32) -> Self {
        Self { x, y, ..*self }
    }

    pub fn with_size(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..*self
        }
    }

    /// Half-open intersection test; rectangles sharing only an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn fits_within(&self, size: Size) -> bool {
        self.right() <= size.width && self.bottom() <= size.height
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{} {}x{})", self.x, self.y, self.width, self.height)
    }
}
