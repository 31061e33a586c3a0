//! Observer-side reconciliation of the replicated cell set
//!
//! Applies authority events against a local pool of cell objects. Each
//! coordinate is either Absent or Active:
//!
//! ```text
//! Absent --Add--> Active --Remove--> Absent
//! Active --Clear--> Absent
//! ```
//!
//! Add on Active and Remove on Absent are no-ops, which also covers
//! duplicate delivery.

use crate::cell::{cell_to_world, CellConfig};
use crate::mirror::{ReplicaMirror, Replay};
use crate::replication::{CellEvent, CellOp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strata_core::glam::Vec3;
use strata_core::pool::{Acquired, CellFactory, CellPool};
use strata_core::{FieldGenerator, FieldParams, GridCoord, Seed};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub field: FieldParams,
    pub cell: CellConfig,
    /// World units for a field height of 1.0.
    pub height_scale: f32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            field: FieldParams::default(),
            cell: CellConfig::default(),
            height_scale: 4.0,
        }
    }
}

/// Materializes the authority's cell set locally.
///
/// Construction needs the seed, so no cell can be generated before the
/// authority has delivered it.
pub struct ClientCellReconciler<F: CellFactory> {
    factory: F,
    generator: FieldGenerator,
    config: ReconcilerConfig,
    active: HashMap<GridCoord, F::Handle>,
    pool: CellPool<F::Handle>,
    mirror: ReplicaMirror,
    peak_active: usize,
}

impl<F: CellFactory> ClientCellReconciler<F> {
    pub fn new(factory: F, seed: Seed, config: ReconcilerConfig) -> Self {
        Self {
            factory,
            generator: FieldGenerator::new(seed, config.field),
            config,
            active: HashMap::new(),
            pool: CellPool::new(),
            mirror: ReplicaMirror::new(),
            peak_active: 0,
        }
    }

    pub fn seed(&self) -> Seed {
        self.generator.seed()
    }

    pub fn apply(&mut self, event: &CellEvent) {
        if self.mirror.apply(event) == Replay::Replayed {
            return;
        }
        match event.op {
            CellOp::Add { coord } => self.materialize(coord),
            CellOp::Remove { coord, .. } => self.recycle(coord),
            CellOp::Clear => self.recycle_all(),
        }
    }

    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a CellEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Replace local state with a catch-up snapshot of the authority's set.
    pub fn load_snapshot(&mut self, seq: u64, cells: &[GridCoord]) {
        self.mirror.load_snapshot(seq, cells);
        let stale: Vec<GridCoord> = self
            .active
            .keys()
            .copied()
            .filter(|&coord| !self.mirror.contains(coord))
            .collect();
        for coord in stale {
            self.recycle(coord);
        }
        for &coord in cells {
            self.materialize(coord);
        }
        debug!(seq, cells = cells.len(), "snapshot loaded");
    }

    fn materialize(&mut self, coord: GridCoord) {
        if self.active.contains_key(&coord) {
            return;
        }
        let (mut handle, how) = self.pool.acquire(&mut self.factory);
        let height = self.generator.height(coord);
        let position = cell_to_world(coord, &self.config.cell) + Vec3::Y * (height * self.config.height_scale);
        self.factory.set_position(&mut handle, position);
        self.factory.activate(&mut handle);
        trace!(%coord, height, recycled = how == Acquired::Recycled, "cell materialized");

        self.active.insert(coord, handle);
        self.peak_active = self.peak_active.max(self.active.len());
    }

    fn recycle(&mut self, coord: GridCoord) {
        let Some(handle) = self.active.remove(&coord) else {
            return;
        };
        self.release(handle);
    }

    fn recycle_all(&mut self) {
        let handles: Vec<F::Handle> = self.active.drain().map(|(_, handle)| handle).collect();
        for handle in handles {
            self.release(handle);
        }
    }

    fn release(&mut self, mut handle: F::Handle) {
        if !self.factory.is_alive(&handle) {
            trace!("active cell handle already destroyed, skipping");
            return;
        }
        self.factory.deactivate(&mut handle);
        self.pool.put(handle);
    }

    pub fn is_active(&self, coord: GridCoord) -> bool {
        self.active.contains_key(&coord)
    }

    pub fn handle(&self, coord: GridCoord) -> Option<&F::Handle> {
        self.active.get(&coord)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn pooled_count(&self) -> usize {
        self.pool.pooled()
    }

    /// Handles ever instantiated.
    pub fn created_count(&self) -> usize {
        self.pool.created()
    }

    pub fn peak_active(&self) -> usize {
        self.peak_active
    }

    pub fn mirror(&self) -> &ReplicaMirror {
        &self.mirror
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::ReplicatedCellSet;
    use strata_core::pool::HeadlessFactory;

    fn reconciler() -> ClientCellReconciler<HeadlessFactory> {
        ClientCellReconciler::new(HeadlessFactory::new(), Seed(31), ReconcilerConfig::default())
    }

    fn sync(set: &mut ReplicatedCellSet, client: &mut ClientCellReconciler<HeadlessFactory>) {
        let events = set.drain_events();
        client.apply_all(&events);
    }

    #[test]
    fn test_add_places_cell_at_generated_height() {
        let mut set = ReplicatedCellSet::new();
        let mut client = reconciler();
        let coord = GridCoord::new(3, -4);
        set.add(coord);
        sync(&mut set, &mut client);

        let generator = FieldGenerator::new(Seed(31), FieldParams::default());
        let handle = client.handle(coord).unwrap();
        assert!(handle.active);
        assert_eq!(handle.position.x, 3.0);
        assert_eq!(handle.position.z, -4.0);
        assert_eq!(handle.position.y, generator.height(coord) * 4.0);
    }

    #[test]
    fn test_pool_is_used_before_allocating() {
        let mut set = ReplicatedCellSet::new();
        let mut client = reconciler();
        for coord in GridCoord::ORIGIN.window(2, 2) {
            set.add(coord);
        }
        sync(&mut set, &mut client);
        assert_eq!(client.created_count(), 16);

        set.retain(|c| c.x < 0);
        sync(&mut set, &mut client);
        assert_eq!(client.active_count(), 8);
        assert_eq!(client.pooled_count(), 8);

        // New cells come out of the pool
        for coord in GridCoord::new(10, 10).window(2, 1) {
            set.add(coord);
        }
        sync(&mut set, &mut client);
        assert_eq!(client.created_count(), 16);
        assert_eq!(client.pooled_count(), 0);
        assert_eq!(client.active_count(), 16);
    }

    #[test]
    fn test_handle_count_never_exceeds_peak_active() {
        let mut set = ReplicatedCellSet::new();
        let mut client = reconciler();
        let mut last_total = 0;

        for step in 0..20 {
            let center = GridCoord::new(step * 3, step % 4);
            for coord in center.window(3, 3) {
                set.add(coord);
            }
            set.retain(|c| c.within_radius(center, 4.5));
            sync(&mut set, &mut client);

            let total = client.active_count() + client.pooled_count();
            assert!(total >= last_total);
            assert!(total <= client.peak_active());
            assert_eq!(total, client.created_count());
            last_total = total;
        }
    }

    #[test]
    fn test_clear_deactivates_everything() {
        let mut set = ReplicatedCellSet::new();
        let mut client = reconciler();
        for coord in GridCoord::ORIGIN.window(3, 2) {
            set.add(coord);
        }
        sync(&mut set, &mut client);
        assert_eq!(client.active_count(), 24);

        set.clear();
        let events = set.drain_events();
        assert_eq!(events.len(), 1);
        client.apply_all(&events);

        assert_eq!(client.active_count(), 0);
        assert_eq!(client.pooled_count(), 24);
        assert!(client.mirror().is_empty());
    }

    #[test]
    fn test_duplicate_events_are_harmless() {
        let mut set = ReplicatedCellSet::new();
        let mut client = reconciler();
        set.add(GridCoord::ORIGIN);
        let events = set.drain_events();
        client.apply_all(&events);
        client.apply_all(&events);

        // A fresh add of an active coordinate (new seq) is also a no-op
        client.apply(&CellEvent {
            seq: 2,
            op: CellOp::Add { coord: GridCoord::ORIGIN },
        });
        client.apply(&CellEvent {
            seq: 3,
            op: CellOp::Remove { coord: GridCoord::new(8, 8), index: 0 },
        });
        assert_eq!(client.active_count(), 1);
        assert_eq!(client.created_count(), 1);
    }

    #[test]
    fn test_destroyed_handles_are_not_pooled() {
        let mut set = ReplicatedCellSet::new();
        let mut client = reconciler();
        set.add(GridCoord::ORIGIN);
        set.add(GridCoord::new(1, 0));
        sync(&mut set, &mut client);

        let doomed = client.handle(GridCoord::ORIGIN).unwrap().id;
        client.factory_mut().destroy(doomed);
        set.clear();
        sync(&mut set, &mut client);

        assert_eq!(client.pooled_count(), 1);
        assert_eq!(client.active_count(), 0);
    }

    #[test]
    fn test_snapshot_reuses_existing_handles() {
        let mut client = reconciler();
        client.load_snapshot(10, &[GridCoord::new(0, 0), GridCoord::new(0, 1)]);
        let kept = client.handle(GridCoord::new(0, 1)).unwrap().id;

        client.load_snapshot(20, &[GridCoord::new(0, 1), GridCoord::new(5, 5)]);
        assert_eq!(client.handle(GridCoord::new(0, 1)).unwrap().id, kept);
        assert!(client.is_active(GridCoord::new(5, 5)));
        assert!(!client.is_active(GridCoord::new(0, 0)));
        assert_eq!(client.created_count(), 2);
        assert_eq!(client.mirror().last_seq(), 20);
    }
}
