//! Authority host over ordered in-process channels
//!
//! The host task is the single writer: it owns the scheduler, handles
//! inbound frames and timer deadlines strictly one at a time, and fans
//! every drained batch of cell events out to each observer's own channel.
//! One unbounded channel per observer gives per-source ordering.

use crate::authority::{AuthorityScheduler, SchedulerConfig, PHASE_EVICT, PHASE_RECOMPUTE};
use crate::client::Connection;
use crate::protocol::{decode, encode, ClientMessage, ServerMessage};
use crate::{ObserverId, PROTOCOL_VERSION};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_core::glam::Vec3;
use strata_core::time::CycleStep;
use strata_core::{FieldParams, Seed};
use strata_metrics::OpKind;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// A frame from an observer, tagged with the connection it came in on.
#[derive(Debug)]
pub struct Inbound {
    pub from: ObserverId,
    pub frame: String,
}

struct Shared {
    next_id: AtomicU64,
    /// Connections that have not said hello yet.
    pending: DashMap<ObserverId, mpsc::UnboundedSender<String>>,
}

/// Cloneable entry point for connecting observers and stopping the host.
#[derive(Clone)]
pub struct HostHandle {
    inbound: mpsc::UnboundedSender<Inbound>,
    shared: Arc<Shared>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl HostHandle {
    pub fn connect(&self) -> Connection {
        let id = ObserverId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.pending.insert(id, tx);
        debug!(%id, "connection opened");
        Connection::new(id, self.inbound.clone(), rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Totals reported when the host stops.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HostReport {
    pub sync_steps: u64,
    pub cleanup_steps: u64,
    pub events_sent: u64,
    pub observers_joined: usize,
    pub peak_cells: usize,
    pub final_cells: usize,
    /// Scheduler op totals and phase timings; zero without the `metrics` feature.
    pub cells_added: u64,
    pub cells_removed: u64,
    pub clears: u64,
    pub recompute_avg: Duration,
    pub recompute_max: Duration,
    pub evict_avg: Duration,
    pub evict_max: Duration,
}

pub struct AuthorityHost {
    scheduler: AuthorityScheduler,
    field: FieldParams,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
    subscribers: BTreeMap<ObserverId, mpsc::UnboundedSender<String>>,
    positions: HashMap<ObserverId, Vec3>,
    report: HostReport,
}

impl AuthorityHost {
    pub fn new(config: SchedulerConfig, seed: Seed, field: FieldParams) -> (Self, HostHandle) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            next_id: AtomicU64::new(1),
            pending: DashMap::new(),
        });

        let host = Self {
            scheduler: AuthorityScheduler::new(config, seed),
            field,
            inbound: inbound_rx,
            shared: Arc::clone(&shared),
            shutdown: shutdown_rx,
            subscribers: BTreeMap::new(),
            positions: HashMap::new(),
            report: HostReport::default(),
        };
        let handle = HostHandle {
            inbound: inbound_tx,
            shared,
            shutdown: Arc::new(shutdown_tx),
        };
        (host, handle)
    }

    pub fn scheduler(&self) -> &AuthorityScheduler {
        &self.scheduler
    }

    /// Cooperative loop: wake on the next clock deadline or inbound frame,
    /// process it, tick, publish. Returns once shut down.
    pub async fn run(mut self) -> HostReport {
        info!(seed = %self.scheduler.seed(), "authority host running");
        let mut last = Instant::now();
        loop {
            let wait = self.scheduler.clock().remaining();
            tokio::select! {
                changed = self.shutdown.changed() => {
                    let stop = changed.is_err() || *self.shutdown.borrow();
                    if stop {
                        break;
                    }
                }
                inbound = self.inbound.recv() => match inbound {
                    Some(inbound) => self.handle(inbound),
                    None => break,
                },
                _ = sleep(wait) => {}
            }
            let now = Instant::now();
            self.step(now - last);
            last = now;
        }

        self.report.final_cells = self.scheduler.cell_count();
        let ops = self.scheduler.ops();
        self.report.cells_added = ops.get(OpKind::Add);
        self.report.cells_removed = ops.get(OpKind::Remove);
        self.report.clears = ops.get(OpKind::Clear);
        self.report.recompute_avg = self.scheduler.phase_average(PHASE_RECOMPUTE);
        self.report.recompute_max = self.scheduler.phase_max(PHASE_RECOMPUTE);
        self.report.evict_avg = self.scheduler.phase_average(PHASE_EVICT);
        self.report.evict_max = self.scheduler.phase_max(PHASE_EVICT);
        info!(
            cells = self.report.final_cells,
            events = self.report.events_sent,
            "authority host stopped"
        );
        self.report
    }

    /// Advance the scheduler and publish whatever it emitted.
    pub fn step(&mut self, elapsed: Duration) {
        let tick = self.scheduler.tick(elapsed, &self.positions);
        for step in &tick.steps {
            match step {
                CycleStep::Sync => self.report.sync_steps += 1,
                CycleStep::Cleanup => self.report.cleanup_steps += 1,
            }
        }
        self.report.peak_cells = self.report.peak_cells.max(self.scheduler.cell_count());
        self.flush();
        self.forget_abandoned();
    }

    /// Drop connections that closed before saying hello.
    fn forget_abandoned(&mut self) {
        let before = self.shared.pending.len();
        self.shared.pending.retain(|_, tx| !tx.is_closed());
        let dropped = before - self.shared.pending.len();
        if dropped > 0 {
            debug!(dropped, "abandoned connections forgotten");
        }
    }

    fn flush(&mut self) {
        let events = self.scheduler.drain_events();
        if events.is_empty() {
            return;
        }
        let count = events.len() as u64;
        self.broadcast(&ServerMessage::Cells { events });
        self.report.events_sent += count;
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        let frame = match encode(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "failed to encode broadcast");
                return;
            }
        };
        let stale: Vec<ObserverId> = self
            .subscribers
            .iter()
            .filter(|(_, tx)| tx.send(frame.clone()).is_err())
            .map(|(&id, _)| id)
            .collect();
        for id in stale {
            self.drop_observer(id);
        }
    }

    /// Reply to one connection, joined or not.
    fn send_to(&mut self, id: ObserverId, message: &ServerMessage) {
        let frame = match encode(message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, %id, "failed to encode reply");
                return;
            }
        };
        let sent = match self.subscribers.get(&id) {
            Some(tx) => tx.send(frame).is_ok(),
            None => self
                .shared
                .pending
                .get(&id)
                .map_or(false, |tx| tx.send(frame).is_ok()),
        };
        if !sent {
            self.drop_observer(id);
        }
    }

    fn drop_observer(&mut self, id: ObserverId) {
        self.subscribers.remove(&id);
        self.positions.remove(&id);
        self.shared.pending.remove(&id);
        if self.scheduler.untrack_observer(id) {
            info!(%id, "observer left");
        }
    }

    fn handle(&mut self, inbound: Inbound) {
        let id = inbound.from;
        let message = match decode::<ClientMessage>(&inbound.frame) {
            Ok(message) => message,
            Err(err) => {
                warn!(%id, %err, "rejecting frame");
                self.send_to(id, &ServerMessage::Error { message: err.to_string() });
                return;
            }
        };

        match message {
            ClientMessage::Hello { name, position } => self.welcome(id, name, Vec3::from_array(position)),
            ClientMessage::Position { position } => {
                if self.subscribers.contains_key(&id) {
                    self.positions.insert(id, Vec3::from_array(position));
                } else {
                    debug!(%id, "position from observer that has not joined");
                }
            }
            ClientMessage::CountRequest => {
                let count = self.scheduler.cell_count();
                let seq = self.scheduler.cells().seq();
                self.send_to(id, &ServerMessage::CellCount { count, seq });
            }
            ClientMessage::Goodbye => self.drop_observer(id),
        }
    }

    fn welcome(&mut self, id: ObserverId, name: String, position: Vec3) {
        let Some((_, tx)) = self.shared.pending.remove(&id) else {
            debug!(%id, "duplicate hello ignored");
            return;
        };
        // Publish anything outstanding so the snapshot seq lines up with the stream
        self.flush();

        self.subscribers.insert(id, tx);
        self.positions.insert(id, position);
        self.scheduler.track_observer(id);
        self.report.observers_joined += 1;

        self.send_to(
            id,
            &ServerMessage::Welcome {
                observer_id: id,
                protocol_version: PROTOCOL_VERSION,
                seed: self.scheduler.seed(),
                field: self.field,
            },
        );
        let cells = self.scheduler.cells();
        let snapshot = ServerMessage::Snapshot {
            seq: cells.seq(),
            cells: cells.as_slice().to_vec(),
        };
        self.send_to(id, &snapshot);
        info!(%id, %name, "observer joined");
    }
}
