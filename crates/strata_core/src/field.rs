//! Deterministic height field
//!
//! Only coordinates travel over the wire; every observer regenerates a
//! cell's height locally, so this has to be a pure function of its
//! inputs. Each [`FieldGenerator`] owns its noise tables outright and
//! can be shared freely across threads.

use crate::coord::GridCoord;
use crate::math::{CellRng, CoordHashing, Seed, Vec2};
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DETAIL_SCALE: f32 = 10.0;

/// Shape of the generated field. Must match on every peer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldParams {
    /// Grid cells per noise period; larger values give gentler slopes.
    pub detail_scale: f32,
    /// Noise-space offset, usually taken from the generator's world placement.
    pub offset: Vec2,
    /// Weight of per-cell jitter blended over the smooth field, in `[0, 1]`.
    pub roughness: f32,
    pub hashing: CoordHashing,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            detail_scale: DEFAULT_DETAIL_SCALE,
            offset: Vec2::ZERO,
            roughness: 0.0,
            hashing: CoordHashing::default(),
        }
    }
}

impl FieldParams {
    pub fn with_detail_scale(detail_scale: f32) -> Self {
        Self {
            detail_scale,
            ..Self::default()
        }
    }
}

pub struct FieldGenerator {
    seed: Seed,
    params: FieldParams,
    noise: Perlin,
}

impl FieldGenerator {
    pub fn new(seed: Seed, params: FieldParams) -> Self {
        debug_assert!(params.detail_scale > 0.0, "detail scale must be positive");
        Self {
            seed,
            params,
            noise: Perlin::new(seed.0 as u32),
        }
    }

    pub fn seed(&self) -> Seed {
        self.seed
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    /// Height of a cell in `[0, 1]`.
    pub fn height(&self, coord: GridCoord) -> f32 {
        let detail = self.params.detail_scale as f64;
        let u = coord.x as f64 / detail + self.params.offset.x as f64;
        let v = coord.z as f64 / detail + self.params.offset.y as f64;
        let smooth = ((self.noise.get([u, v]) + 1.0) * 0.5) as f32;

        let roughness = self.params.roughness.clamp(0.0, 1.0);
        let height = if roughness > 0.0 {
            let jitter = CellRng::for_cell(self.seed, coord, self.params.hashing).next_f32();
            smooth * (1.0 - roughness) + jitter * roughness
        } else {
            smooth
        };
        height.clamp(0.0, 1.0)
    }
}

/// One-shot sample with default parameters apart from `detail_scale`.
pub fn generate(seed: Seed, x: i32, z: i32, detail_scale: f32) -> f32 {
    FieldGenerator::new(seed, FieldParams::with_detail_scale(detail_scale)).height(GridCoord::new(x, z))
}
