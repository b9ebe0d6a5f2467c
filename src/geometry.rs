//! Extents of resolved data.
//!
//! Renderers size their axes from these before drawing a data array.

use glam::Vec3;

use crate::item::DataItem;

/// Per-axis maximum absolute coordinate over a set of items.
///
/// Returns [`Vec3::ZERO`] for an empty slice.
#[must_use]
pub fn limit_values(items: &[DataItem]) -> Vec3 {
    items
        .iter()
        .fold(Vec3::ZERO, |limits, item| limits.max(item.position().abs()))
}

/// An axis-aligned box enclosing a set of positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Bounds3 {
    /// Create a box from two corners.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box enclosing every item, or `None` if there are no items.
    #[must_use]
    pub fn from_items(items: &[DataItem]) -> Option<Self> {
        let first = items.first()?.position();
        Some(items.iter().skip(1).fold(Self::new(first, first), |bounds, item| {
            bounds.including(item.position())
        }))
    }

    /// Grow the box to include a point.
    #[must_use]
    pub fn including(self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    /// Check if a point is inside the box (inclusive).
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Extent along each axis.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center point of the box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}
