//! Deterministic math utilities
//!
//! Re-exports glam and provides the seeded hashing every peer uses to
//! derive per-cell state. Nothing here touches global random state.

pub use glam::*;

use crate::coord::GridCoord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// World seed, assigned once by the authority and replicated to every observer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(pub i32);

impl Seed {
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a (seed, x, z) triple is folded into per-cell state.
///
/// Changing this changes generated content, so both peers must agree on it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordHashing {
    /// SplitMix64 over the packed coordinate, collision-free per seed.
    #[default]
    Mixed,
    /// `seed + x * 1000 + z`; (1, 0) and (0, 1000) share state.
    Legacy,
}

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

#[inline]
fn splitmix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Per-cell state derived from the world seed.
pub fn cell_hash(seed: Seed, coord: GridCoord, hashing: CoordHashing) -> u64 {
    match hashing {
        CoordHashing::Legacy => {
            let combined = seed
                .0
                .wrapping_add(coord.x.wrapping_mul(1000))
                .wrapping_add(coord.z);
            combined as u32 as u64
        }
        CoordHashing::Mixed => {
            let packed = ((coord.x as u32 as u64) << 32) | coord.z as u32 as u64;
            let salt = splitmix64((seed.0 as u32 as u64).wrapping_add(GOLDEN_GAMMA));
            splitmix64(packed ^ salt)
        }
    }
}

/// Small deterministic generator owned by a single caller (SplitMix64 stream).
#[derive(Debug, Clone)]
pub struct CellRng {
    state: u64,
}

impl CellRng {
    pub fn new(state: u64) -> Self {
        Self { state }
    }

    pub fn for_cell(seed: Seed, coord: GridCoord, hashing: CoordHashing) -> Self {
        Self::new(cell_hash(seed, coord, hashing))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        splitmix64(self.state)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}
