//! Integer grid coordinates

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One cell of the infinite grid, addressed on the horizontal (x, z) plane.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub z: i32,
}

impl GridCoord {
    pub const ORIGIN: GridCoord = GridCoord { x: 0, z: 0 };

    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Cell containing a world-space position (floor of the horizontal components).
    pub fn from_world(position: Vec3, cell_size: f32) -> Self {
        Self {
            x: (position.x / cell_size).floor() as i32,
            z: (position.z / cell_size).floor() as i32,
        }
    }

    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x.wrapping_add(dx),
            z: self.z.wrapping_add(dz),
        }
    }

    pub fn distance_squared_to(self, other: GridCoord) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dz = self.z as i64 - other.z as i64;
        dx * dx + dz * dz
    }

    /// Euclidean distance in grid units.
    pub fn distance_to(self, other: GridCoord) -> f64 {
        (self.distance_squared_to(other) as f64).sqrt()
    }

    /// Inclusive radius test; compares squared distances so exact boundaries hold.
    pub fn within_radius(self, other: GridCoord, radius: f32) -> bool {
        if radius.is_nan() || radius < 0.0 {
            return false;
        }
        let radius = radius as f64;
        self.distance_squared_to(other) as f64 <= radius * radius
    }

    /// Cells in `[-half_x, half_x) x [-half_z, half_z)` around `self`, x-major.
    ///
    /// The upper bound is open, so a window of half-width 2 spans offsets -2..=1.
    pub fn window(self, half_x: i32, half_z: i32) -> impl Iterator<Item = GridCoord> {
        let half_x = half_x.max(0);
        let half_z = half_z.max(0);
        (-half_x..half_x).flat_map(move |dx| (-half_z..half_z).map(move |dz| self.offset(dx, dz)))
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from((x, z): (i32, i32)) -> Self {
        Self::new(x, z)
    }
}
