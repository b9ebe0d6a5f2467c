//! Positioned chart data items.

use glam::{Quat, Vec3};

/// A single positioned value in a 3D chart.
///
/// Items are immutable once constructed: the `with_*` methods return a new
/// item, and proxies replace items wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DataItem {
    position: Vec3,
    rotation: Option<Quat>,
    value: f32,
}

/// Ordered sequence of data items in row-major source order.
pub type DataArray = Vec<DataItem>;

impl DataItem {
    /// Create an item at the given position with no rotation and zero value.
    #[must_use]
    pub const fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: None,
            value: 0.0,
        }
    }

    /// Create an item from individual coordinates.
    #[must_use]
    pub const fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vec3::new(x, y, z))
    }

    /// Return a copy moved to another position.
    #[must_use]
    pub const fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Return a copy with the given rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Return a copy with the given auxiliary value.
    #[must_use]
    pub const fn with_value(mut self, value: f32) -> Self {
        self.value = value;
        self
    }

    /// Item position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// X coordinate.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.position.x
    }

    /// Y coordinate.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.position.y
    }

    /// Z coordinate.
    #[must_use]
    pub const fn z(&self) -> f32 {
        self.position.z
    }

    /// Item rotation, if any.
    #[must_use]
    pub const fn rotation(&self) -> Option<Quat> {
        self.rotation
    }

    /// Auxiliary value.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }
}

impl From<Vec3> for DataItem {
    fn from(position: Vec3) -> Self {
        Self::new(position)
    }
}

impl From<(f32, f32, f32)> for DataItem {
    fn from((x, y, z): (f32, f32, f32)) -> Self {
        Self::from_xyz(x, y, z)
    }
}
