//! Observer tracking on the authority
//!
//! Keeps the last known cell of every observer so the scheduler can tell
//! when the required set needs recomputing.

use crate::cell::{world_pos_to_cell, CellConfig};
use crate::ObserverId;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use strata_core::glam::Vec3;
use strata_core::GridCoord;
use tracing::debug;

/// Looks up the world-space position of a tracked entity.
///
/// `None` means the entity no longer exists; the tracker drops it.
pub trait PositionSource {
    fn position_of(&self, id: ObserverId) -> Option<Vec3>;
}

impl PositionSource for HashMap<ObserverId, Vec3> {
    fn position_of(&self, id: ObserverId) -> Option<Vec3> {
        self.get(&id).copied()
    }
}

impl PositionSource for BTreeMap<ObserverId, Vec3> {
    fn position_of(&self, id: ObserverId) -> Option<Vec3> {
        self.get(&id).copied()
    }
}

impl PositionSource for DashMap<ObserverId, Vec3> {
    fn position_of(&self, id: ObserverId) -> Option<Vec3> {
        self.get(&id).map(|entry| *entry.value())
    }
}

/// Registry of observers and their last known cell (`None` until first sighting).
#[derive(Debug, Default)]
pub struct ObserverTracker {
    records: BTreeMap<ObserverId, Option<GridCoord>>,
    cell_config: CellConfig,
}

impl ObserverTracker {
    pub fn new(cell_config: CellConfig) -> Self {
        Self {
            records: BTreeMap::new(),
            cell_config,
        }
    }

    /// Start tracking; returns false if already tracked.
    pub fn track(&mut self, id: ObserverId) -> bool {
        if self.records.contains_key(&id) {
            return false;
        }
        self.records.insert(id, None);
        true
    }

    pub fn untrack(&mut self, id: ObserverId) -> bool {
        self.records.remove(&id).is_some()
    }

    pub fn contains(&self, id: ObserverId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn cell_of(&self, id: ObserverId) -> Option<GridCoord> {
        self.records.get(&id).copied().flatten()
    }

    /// Observers with a known cell, ordered by id.
    pub fn located(&self) -> impl Iterator<Item = (ObserverId, GridCoord)> + '_ {
        self.records
            .iter()
            .filter_map(|(&id, &cell)| cell.map(|cell| (id, cell)))
    }

    /// Untrack every observer `source` no longer knows. Returns how many went.
    pub fn prune(&mut self, source: &impl PositionSource) -> usize {
        let before = self.records.len();
        self.records.retain(|&id, _| {
            let known = source.position_of(id).is_some();
            if !known {
                debug!(%id, "observer reference gone, untracking");
            }
            known
        });
        before - self.records.len()
    }

    /// Refresh every observer's cell from `source`.
    ///
    /// Observers the source no longer knows are dropped first. Returns true
    /// if any remaining observer changed cell or was seen for the first time.
    pub fn detect_movement(&mut self, source: &impl PositionSource) -> bool {
        self.prune(source);

        let mut moved = false;
        for (&id, last) in self.records.iter_mut() {
            let Some(position) = source.position_of(id) else {
                continue;
            };
            let cell = world_pos_to_cell(position, &self.cell_config);
            if *last != Some(cell) {
                debug!(%id, %cell, "observer moved");
                *last = Some(cell);
                moved = true;
            }
        }
        moved
    }
}
