//! Authoritative replicated cell set
//!
//! The authority mutates the set; every mutation is recorded as a typed,
//! sequence-numbered event. Observers never see the set itself, only the
//! events, and rebuild it by folding them in order (see [`crate::mirror`]).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strata_core::GridCoord;
use tracing::trace;

/// One structural change to the replicated set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CellOp {
    Add { coord: GridCoord },
    /// `index` is the position the coordinate occupied when it was removed.
    Remove { coord: GridCoord, index: u32 },
    Clear,
}

/// A change stamped with its position in the authority's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub op: CellOp,
}

/// Ordered, duplicate-free set of coordinates owned by the authority.
#[derive(Debug, Default)]
pub struct ReplicatedCellSet {
    cells: Vec<GridCoord>,
    members: HashSet<GridCoord>,
    seq: u64,
    outbox: Vec<CellEvent>,
}

impl ReplicatedCellSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, op: CellOp) {
        self.seq += 1;
        trace!(seq = self.seq, ?op, "cell op");
        self.outbox.push(CellEvent { seq: self.seq, op });
    }

    /// Append `coord`; returns false (and emits nothing) if already present.
    pub fn add(&mut self, coord: GridCoord) -> bool {
        if !self.members.insert(coord) {
            return false;
        }
        self.cells.push(coord);
        self.emit(CellOp::Add { coord });
        true
    }

    /// Remove `coord`; returns false (and emits nothing) if absent.
    pub fn remove(&mut self, coord: GridCoord) -> bool {
        if !self.members.remove(&coord) {
            return false;
        }
        let Some(index) = self.cells.iter().position(|&c| c == coord) else {
            return false;
        };
        self.cells.remove(index);
        self.emit(CellOp::Remove {
            coord,
            index: index as u32,
        });
        true
    }

    /// Remove every coordinate failing `keep`, front to back.
    ///
    /// Each emitted index is valid against the set as it stands when that
    /// event is applied. Returns the number removed.
    pub fn retain(&mut self, mut keep: impl FnMut(GridCoord) -> bool) -> usize {
        let mut removed = 0;
        let mut index = 0;
        while index < self.cells.len() {
            let coord = self.cells[index];
            if keep(coord) {
                index += 1;
                continue;
            }
            self.cells.remove(index);
            self.members.remove(&coord);
            self.emit(CellOp::Remove {
                coord,
                index: index as u32,
            });
            removed += 1;
        }
        removed
    }

    /// Empty the set with a single `Clear`, whatever its size.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.members.clear();
        self.emit(CellOp::Clear);
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.members.contains(&coord)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Current insertion order.
    pub fn iter(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.cells.iter().copied()
    }

    pub fn as_slice(&self) -> &[GridCoord] {
        &self.cells
    }

    /// Sequence number of the last emitted event (0 before any).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Hand emitted events to the transport, oldest first.
    pub fn drain_events(&mut self) -> Vec<CellEvent> {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::ReplicaMirror;

    fn c(x: i32, z: i32) -> GridCoord {
        GridCoord::new(x, z)
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut set = ReplicatedCellSet::new();
        assert!(set.add(c(1, 2)));
        assert!(!set.add(c(1, 2)));

        let events = set.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].op, CellOp::Add { coord: c(1, 2) });
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_reports_index_and_ignores_absent() {
        let mut set = ReplicatedCellSet::new();
        set.add(c(0, 0));
        set.add(c(5, 5));
        set.add(c(9, 9));
        set.drain_events();

        assert!(!set.remove(c(4, 4)));
        assert!(set.remove(c(5, 5)));
        assert_eq!(
            set.drain_events(),
            vec![CellEvent {
                seq: 4,
                op: CellOp::Remove { coord: c(5, 5), index: 1 }
            }]
        );
        assert_eq!(set.as_slice(), &[c(0, 0), c(9, 9)]);
    }

    #[test]
    fn test_clear_emits_single_event() {
        let mut set = ReplicatedCellSet::new();
        for coord in GridCoord::ORIGIN.window(3, 3) {
            set.add(coord);
        }
        set.drain_events();

        set.clear();
        let events = set.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].op, CellOp::Clear);
        assert!(set.is_empty());

        // Clearing an empty set still emits
        set.clear();
        assert_eq!(set.drain_events().len(), 1);
    }

    #[test]
    fn test_retain_indices_replay_in_order() {
        let mut set = ReplicatedCellSet::new();
        for x in 0..8 {
            set.add(c(x, 0));
        }
        let mut mirror = ReplicaMirror::new();
        for event in set.drain_events() {
            mirror.apply(&event);
        }

        let removed = set.retain(|coord| coord.x % 3 == 0);
        assert_eq!(removed, 5);
        let events = set.drain_events();
        let indices: Vec<u32> = events
            .iter()
            .filter_map(|e| match e.op {
                CellOp::Remove { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![1, 1, 2, 2, 3]);

        for event in &events {
            mirror.apply(event);
        }
        assert_eq!(mirror.as_slice(), set.as_slice());
    }

    #[test]
    fn test_replay_matches_live_set_at_every_step() {
        let mut set = ReplicatedCellSet::new();
        let mut mirror = ReplicaMirror::new();
        let mut history = Vec::new();

        // Walk a window across the grid, evicting behind it
        for step in 0..12 {
            let center = c(step * 2, -step);
            for coord in center.window(3, 2) {
                set.add(coord);
            }
            set.retain(|coord| coord.within_radius(center, 4.0));
            if step == 7 {
                set.clear();
            }
            set.add(center);

            for event in set.drain_events() {
                mirror.apply(&event);
                history.push(event);
            }
            let live: HashSet<_> = set.iter().collect();
            let replayed: HashSet<_> = mirror.iter().collect();
            assert_eq!(live, replayed, "diverged at step {step}");
        }

        let mut fresh = ReplicaMirror::new();
        for event in &history {
            fresh.apply(event);
        }
        assert_eq!(fresh.as_slice(), set.as_slice());
        assert_eq!(fresh.last_seq(), set.seq());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = CellEvent {
            seq: 3,
            op: CellOp::Remove { coord: c(-1, 2), index: 0 },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"seq":3,"op":"remove","coord":{"x":-1,"z":2},"index":0}"#);
        let back: CellEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
