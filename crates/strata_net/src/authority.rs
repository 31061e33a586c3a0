//! Authority-side streaming scheduler
//!
//! Decides which cells must exist around the tracked observers and edits
//! the [`ReplicatedCellSet`] toward that decision. Two cadences drive it:
//! a sync step (movement detection, then adding the required window) and
//! a cleanup step (evicting cells no observer is near). Time comes in
//! through [`AuthorityScheduler::tick`], so the whole loop can be stepped
//! deterministically.

use crate::cell::CellConfig;
use crate::observer::{ObserverTracker, PositionSource};
use crate::replication::{CellEvent, ReplicatedCellSet};
use crate::ObserverId;
use std::collections::HashSet;
use std::time::Duration;
use strata_core::time::{CycleClock, CycleStep, DEFAULT_CLEANUP_INTERVAL, DEFAULT_SYNC_INTERVAL};
use strata_core::{GridCoord, Seed};
use strata_metrics::{time_phase, OpCounter, OpKind, PhaseProfiler};
use tracing::{debug, info};

/// Timed phase names, as passed to [`AuthorityScheduler::phase_average`].
pub const PHASE_RECOMPUTE: &str = "recompute";
pub const PHASE_EVICT: &str = "evict";

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Window half-width along x, in cells.
    pub world_size_x: i32,
    /// Window half-width along z, in cells.
    pub world_size_z: i32,
    /// Cells farther than this (grid units) from every observer are evicted.
    pub active_radius: f32,
    pub sync_interval: Duration,
    pub cleanup_interval: Duration,
    pub cell: CellConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            world_size_x: 8,
            world_size_z: 8,
            active_radius: 12.0,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            cell: CellConfig::default(),
        }
    }
}

/// What one call to [`AuthorityScheduler::tick`] did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub steps: Vec<CycleStep>,
    pub moved: bool,
    pub added: usize,
    pub removed: usize,
}

impl TickReport {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

pub struct AuthorityScheduler {
    config: SchedulerConfig,
    seed: Seed,
    cells: ReplicatedCellSet,
    tracker: ObserverTracker,
    clock: CycleClock,
    ops: OpCounter,
    phases: PhaseProfiler,
}

impl AuthorityScheduler {
    pub fn new(config: SchedulerConfig, seed: Seed) -> Self {
        info!(
            %seed,
            window_x = config.world_size_x,
            window_z = config.world_size_z,
            radius = config.active_radius,
            "authority scheduler ready"
        );
        Self {
            clock: CycleClock::new(config.sync_interval, config.cleanup_interval),
            tracker: ObserverTracker::new(config.cell),
            cells: ReplicatedCellSet::new(),
            ops: OpCounter::new(),
            phases: PhaseProfiler::new(64),
            seed,
            config,
        }
    }

    pub fn seed(&self) -> Seed {
        self.seed
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn cells(&self) -> &ReplicatedCellSet {
        &self.cells
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn tracker(&self) -> &ObserverTracker {
        &self.tracker
    }

    pub fn clock(&self) -> &CycleClock {
        &self.clock
    }

    pub fn ops(&self) -> &OpCounter {
        &self.ops
    }

    pub fn phase_average(&self, phase: &str) -> Duration {
        self.phases.average(phase)
    }

    pub fn phase_max(&self, phase: &str) -> Duration {
        self.phases.max(phase)
    }

    pub fn track_observer(&mut self, id: ObserverId) -> bool {
        self.tracker.track(id)
    }

    pub fn untrack_observer(&mut self, id: ObserverId) -> bool {
        self.tracker.untrack(id)
    }

    /// Advance the cycle clock by `elapsed` and run every step that came due.
    ///
    /// Does nothing beyond advancing the clock while no observer is tracked.
    /// Cleanup steps first untrack observers `positions` no longer knows,
    /// then evict, so an observer that vanishes takes its cells with it.
    pub fn tick(&mut self, elapsed: Duration, positions: &impl PositionSource) -> TickReport {
        let steps = self.clock.advance(elapsed);
        let mut report = TickReport::default();
        if self.tracker.is_empty() {
            report.steps = steps;
            return report;
        }

        for &step in &steps {
            match step {
                CycleStep::Sync => {
                    self.ops.record(OpKind::SyncStep, 1);
                    let (moved, added) = self.sync(positions);
                    report.moved |= moved;
                    report.added += added;
                }
                CycleStep::Cleanup => {
                    self.ops.record(OpKind::CleanupStep, 1);
                    self.tracker.prune(positions);
                    report.removed += self.evict_distant();
                }
            }
        }
        report.steps = steps;
        if report.changed() {
            debug!(
                added = report.added,
                removed = report.removed,
                total = self.cells.len(),
                "cell set updated"
            );
        }
        report
    }

    /// One sync pass: detect movement, recompute only if something moved.
    pub fn sync(&mut self, positions: &impl PositionSource) -> (bool, usize) {
        let moved = self.detect_movement(positions);
        let added = if moved { self.recompute_required_set() } else { 0 };
        (moved, added)
    }

    pub fn detect_movement(&mut self, positions: &impl PositionSource) -> bool {
        self.tracker.detect_movement(positions)
    }

    /// Add every required coordinate not already present. Returns how many were added.
    pub fn recompute_required_set(&mut self) -> usize {
        let cells = &mut self.cells;
        let tracker = &self.tracker;
        let config = &self.config;
        let added = time_phase!(self.phases, PHASE_RECOMPUTE, {
            required_cells(tracker, config)
                .into_iter()
                .filter(|&coord| cells.add(coord))
                .count()
        });
        self.ops.record(OpKind::Add, added as u64);
        added
    }

    /// Remove every coordinate outside `active_radius` of all located observers.
    pub fn evict_distant(&mut self) -> usize {
        let observers: Vec<GridCoord> = self.tracker.located().map(|(_, cell)| cell).collect();
        let radius = self.config.active_radius;
        let cells = &mut self.cells;
        let removed = time_phase!(self.phases, PHASE_EVICT, {
            cells.retain(|coord| observers.iter().any(|&o| coord.within_radius(o, radius)))
        });
        self.ops.record(OpKind::Remove, removed as u64);
        removed
    }

    /// Drop every cell with a single clear event.
    pub fn reset(&mut self) {
        info!(cells = self.cells.len(), "clearing replicated cell set");
        self.cells.clear();
        self.ops.record(OpKind::Clear, 1);
    }

    pub fn drain_events(&mut self) -> Vec<CellEvent> {
        self.cells.drain_events()
    }
}

fn required_cells(tracker: &ObserverTracker, config: &SchedulerConfig) -> Vec<GridCoord> {
    let mut seen = HashSet::new();
    tracker
        .located()
        .flat_map(|(_, center)| center.window(config.world_size_x, config.world_size_z))
        .filter(|&coord| seen.insert(coord))
        .collect()
}
