//! Cell object pooling
//!
//! Materialized cells are recycled instead of destroyed. A handle is
//! either active (keyed by a coordinate, owned by the reconciler) or
//! pooled (unkeyed, owned by [`CellPool`]).

mod cell_pool;
mod factory;
mod headless;

pub use cell_pool::{Acquired, CellPool};
pub use factory::CellFactory;
pub use headless::{HeadlessCell, HeadlessFactory};
