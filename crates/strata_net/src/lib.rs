//! Strata Network Layer
//!
//! Authority-side streaming of the cell set around moving observers,
//! the replicated event log that carries it, and the observer-side
//! reconciliation that materializes cells locally.

pub mod authority;
pub mod cell;
pub mod client;
pub mod error;
pub mod host;
pub mod mirror;
pub mod observer;
pub mod protocol;
pub mod reconciler;
pub mod replication;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use authority::{AuthorityScheduler, SchedulerConfig, TickReport};
pub use cell::CellConfig;
pub use client::{ClientEvent, Connection, CountAudit, ObserverClient};
pub use error::NetError;
pub use host::{AuthorityHost, HostHandle, HostReport};
pub use mirror::{ReplicaMirror, Replay};
pub use observer::{ObserverTracker, PositionSource};
pub use reconciler::{ClientCellReconciler, ReconcilerConfig};
pub use replication::{CellEvent, CellOp, ReplicatedCellSet};

/// Network protocol version
pub const PROTOCOL_VERSION: u32 = 1;

/// Observer (connected peer) ID
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(pub u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}
