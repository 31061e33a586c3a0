//! Strata Core
//!
//! Contains the deterministic building blocks shared by every peer:
//! - Grid coordinates and windows
//! - Seeded coordinate hashing and the height field generator
//! - The two-timer cycle clock driving the authority loop
//! - Cell object pooling

pub mod coord;
pub mod field;
pub mod math;
pub mod pool;
pub mod time;

pub use glam;

pub use coord::GridCoord;
pub use field::{FieldGenerator, FieldParams};
pub use math::{CoordHashing, Seed};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
