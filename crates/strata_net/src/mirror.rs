//! Observer-side fold over the replicated event log

use crate::replication::{CellEvent, CellOp};
use std::collections::HashSet;
use strata_core::GridCoord;
use tracing::{debug, warn};

/// Outcome of feeding one event to a [`ReplicaMirror`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Membership changed.
    Applied,
    /// Valid event with nothing to do (add of a present cell, remove of an absent one).
    Redundant,
    /// Sequence number already seen; the event was dropped.
    Replayed,
}

/// Read-only view of the authority's set, rebuilt purely from events.
#[derive(Debug, Default)]
pub struct ReplicaMirror {
    cells: Vec<GridCoord>,
    members: HashSet<GridCoord>,
    last_seq: u64,
    gaps: u64,
}

impl ReplicaMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &CellEvent) -> Replay {
        if event.seq <= self.last_seq {
            debug!(seq = event.seq, last = self.last_seq, "dropping replayed cell event");
            return Replay::Replayed;
        }
        if event.seq != self.last_seq + 1 {
            // Ordered reliable delivery is the transport's job; we only report it.
            warn!(
                expected = self.last_seq + 1,
                got = event.seq,
                "gap in cell event stream, replica may diverge"
            );
            self.gaps += 1;
        }
        self.last_seq = event.seq;

        match event.op {
            CellOp::Add { coord } => {
                if !self.members.insert(coord) {
                    return Replay::Redundant;
                }
                self.cells.push(coord);
            }
            CellOp::Remove { coord, index } => {
                if !self.members.remove(&coord) {
                    return Replay::Redundant;
                }
                let index = index as usize;
                if self.cells.get(index) == Some(&coord) {
                    self.cells.remove(index);
                } else if let Some(found) = self.cells.iter().position(|&c| c == coord) {
                    debug!(%coord, index, found, "remove index out of step, using lookup");
                    self.cells.remove(found);
                }
            }
            CellOp::Clear => {
                self.cells.clear();
                self.members.clear();
            }
        }
        Replay::Applied
    }

    /// Replace the whole view with a catch-up snapshot taken at `seq`.
    pub fn load_snapshot(&mut self, seq: u64, cells: &[GridCoord]) {
        self.cells.clear();
        self.members.clear();
        for &coord in cells {
            if self.members.insert(coord) {
                self.cells.push(coord);
            }
        }
        self.last_seq = seq;
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

    pub fn iter(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.cells.iter().copied()
    }

    pub fn as_slice(&self) -> &[GridCoord] {
        &self.cells
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    /// Sequence gaps observed so far.
    pub fn gaps(&self) -> u64 {
        self.gaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(seq: u64, x: i32, z: i32) -> CellEvent {
        CellEvent {
            seq,
            op: CellOp::Add { coord: GridCoord::new(x, z) },
        }
    }

    #[test]
    fn test_duplicate_delivery_is_dropped() {
        let mut mirror = ReplicaMirror::new();
        assert_eq!(mirror.apply(&add(1, 0, 0)), Replay::Applied);
        assert_eq!(mirror.apply(&add(1, 0, 0)), Replay::Replayed);
        assert_eq!(mirror.len(), 1);
    }

    #[test]
    fn test_redundant_ops_are_no_ops() {
        let mut mirror = ReplicaMirror::new();
        mirror.apply(&add(1, 2, 2));
        assert_eq!(mirror.apply(&add(2, 2, 2)), Replay::Redundant);
        let remove_absent = CellEvent {
            seq: 3,
            op: CellOp::Remove { coord: GridCoord::new(7, 7), index: 0 },
        };
        assert_eq!(mirror.apply(&remove_absent), Replay::Redundant);
        assert_eq!(mirror.as_slice(), &[GridCoord::new(2, 2)]);
        assert_eq!(mirror.gaps(), 0);
    }

    #[test]
    fn test_gap_is_counted_but_applied() {
        let mut mirror = ReplicaMirror::new();
        mirror.apply(&add(1, 0, 0));
        assert_eq!(mirror.apply(&add(5, 1, 0)), Replay::Applied);
        assert_eq!(mirror.gaps(), 1);
        assert_eq!(mirror.last_seq(), 5);
    }

    #[test]
    fn test_stale_remove_index_falls_back_to_lookup() {
        let mut mirror = ReplicaMirror::new();
        mirror.apply(&add(1, 0, 0));
        mirror.apply(&add(2, 1, 0));
        mirror.apply(&add(3, 2, 0));
        mirror.apply(&CellEvent {
            seq: 4,
            op: CellOp::Remove { coord: GridCoord::new(2, 0), index: 0 },
        });
        assert_eq!(mirror.as_slice(), &[GridCoord::new(0, 0), GridCoord::new(1, 0)]);
    }

    #[test]
    fn test_snapshot_sets_baseline() {
        let mut mirror = ReplicaMirror::new();
        mirror.apply(&add(1, 9, 9));
        mirror.load_snapshot(40, &[GridCoord::new(1, 1), GridCoord::new(2, 2)]);
        assert!(!mirror.contains(GridCoord::new(9, 9)));
        assert_eq!(mirror.apply(&add(40, 3, 3)), Replay::Replayed);
        assert_eq!(mirror.apply(&add(41, 3, 3)), Replay::Applied);
        assert_eq!(mirror.len(), 3);
    }
}
