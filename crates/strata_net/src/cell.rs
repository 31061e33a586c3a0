//! Mapping between world space and grid cells

use serde::{Deserialize, Serialize};
use strata_core::glam::Vec3;
use strata_core::GridCoord;

/// Cell configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    pub cell_size: f32, // World units per cell edge
}

impl Default for CellConfig {
    fn default() -> Self {
        Self { cell_size: 1.0 }
    }
}

/// Convert world position to the cell containing it
pub fn world_pos_to_cell(pos: Vec3, config: &CellConfig) -> GridCoord {
    GridCoord::from_world(pos, config.cell_size)
}

/// World-space corner of a cell at ground level
pub fn cell_to_world(coord: GridCoord, config: &CellConfig) -> Vec3 {
    Vec3::new(
        coord.x as f32 * config.cell_size,
        0.0,
        coord.z as f32 * config.cell_size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_round_trip_lands_inside_cell() {
        let config = CellConfig { cell_size: 2.5 };
        let coord = GridCoord::new(-3, 8);
        let corner = cell_to_world(coord, &config);
        assert_eq!(world_pos_to_cell(corner + Vec3::new(0.1, 3.0, 2.4), &config), coord);
    }
}
