//! Observer side of the connection
//!
//! `Connection` is the raw ordered frame pipe to the host. `ObserverClient`
//! layers the reconciler on top: it waits for the welcome to learn the
//! seed, then folds every snapshot and cell batch into local objects.

use crate::error::NetError;
use crate::host::Inbound;
use crate::protocol::{decode, encode, ClientMessage, ServerMessage};
use crate::reconciler::{ClientCellReconciler, ReconcilerConfig};
use crate::{ObserverId, PROTOCOL_VERSION};
use strata_core::glam::Vec3;
use strata_core::pool::CellFactory;
use strata_core::Seed;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{info, warn};

pub struct Connection {
    id: ObserverId,
    outbound: mpsc::UnboundedSender<Inbound>,
    inbound: mpsc::UnboundedReceiver<String>,
}

impl Connection {
    pub(crate) fn new(
        id: ObserverId,
        outbound: mpsc::UnboundedSender<Inbound>,
        inbound: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        Self { id, outbound, inbound }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn send(&self, message: &ClientMessage) -> Result<(), NetError> {
        self.send_raw(encode(message)?)
    }

    /// Push an already-encoded frame.
    pub fn send_raw(&self, frame: String) -> Result<(), NetError> {
        self.outbound
            .send(Inbound { from: self.id, frame })
            .map_err(|_| NetError::Disconnected)
    }

    pub async fn recv(&mut self) -> Result<ServerMessage, NetError> {
        let frame = self.inbound.recv().await.ok_or(NetError::Disconnected)?;
        Ok(decode(&frame)?)
    }

    pub fn try_recv(&mut self) -> Result<Option<ServerMessage>, NetError> {
        match self.inbound.try_recv() {
            Ok(frame) => Ok(Some(decode(&frame)?)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(NetError::Disconnected),
        }
    }
}

/// Authority count compared against local state at the same point in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountAudit {
    pub authority: usize,
    pub local: usize,
    pub seq: u64,
    pub local_seq: u64,
}

impl CountAudit {
    pub fn consistent(&self) -> bool {
        self.authority == self.local && self.seq == self.local_seq
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Welcomed { seed: Seed },
    /// A snapshot or cell batch was folded in.
    Synced { events: usize },
    Audited(CountAudit),
    Rejected { message: String },
}

pub struct ObserverClient<F: CellFactory> {
    connection: Connection,
    factory: Option<F>,
    local: ReconcilerConfig,
    reconciler: Option<ClientCellReconciler<F>>,
}

impl<F: CellFactory> ObserverClient<F> {
    /// `local` supplies cell size and presentation; the field parameters
    /// are replaced by the ones the authority announces.
    pub fn new(connection: Connection, factory: F, local: ReconcilerConfig) -> Self {
        Self {
            connection,
            factory: Some(factory),
            local,
            reconciler: None,
        }
    }

    pub fn id(&self) -> ObserverId {
        self.connection.id()
    }

    pub fn join(&self, name: &str, position: Vec3) -> Result<(), NetError> {
        self.connection.send(&ClientMessage::Hello {
            name: name.to_owned(),
            position: position.to_array(),
        })
    }

    pub fn report_position(&self, position: Vec3) -> Result<(), NetError> {
        self.connection.send(&ClientMessage::Position { position: position.to_array() })
    }

    pub fn request_count(&self) -> Result<(), NetError> {
        self.connection.send(&ClientMessage::CountRequest)
    }

    pub fn leave(&self) -> Result<(), NetError> {
        self.connection.send(&ClientMessage::Goodbye)
    }

    pub fn is_welcomed(&self) -> bool {
        self.reconciler.is_some()
    }

    pub fn reconciler(&self) -> Option<&ClientCellReconciler<F>> {
        self.reconciler.as_ref()
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub async fn next_event(&mut self) -> Result<ClientEvent, NetError> {
        let message = self.connection.recv().await?;
        self.handle(message)
    }

    /// Handle everything already queued without waiting.
    pub fn pump(&mut self) -> Result<Vec<ClientEvent>, NetError> {
        let mut events = Vec::new();
        while let Some(message) = self.connection.try_recv()? {
            events.push(self.handle(message)?);
        }
        Ok(events)
    }

    pub fn handle(&mut self, message: ServerMessage) -> Result<ClientEvent, NetError> {
        match message {
            ServerMessage::Welcome {
                observer_id,
                protocol_version,
                seed,
                field,
            } => {
                if protocol_version != PROTOCOL_VERSION {
                    return Err(NetError::VersionMismatch {
                        ours: PROTOCOL_VERSION,
                        theirs: protocol_version,
                    });
                }
                let Some(factory) = self.factory.take() else {
                    warn!(id = %observer_id, "duplicate welcome ignored");
                    return Ok(ClientEvent::Welcomed { seed });
                };
                let config = ReconcilerConfig { field, ..self.local };
                self.reconciler = Some(ClientCellReconciler::new(factory, seed, config));
                info!(id = %observer_id, %seed, "welcomed by authority");
                Ok(ClientEvent::Welcomed { seed })
            }
            ServerMessage::Snapshot { seq, cells } => {
                self.reconciler_mut()?.load_snapshot(seq, &cells);
                Ok(ClientEvent::Synced { events: cells.len() })
            }
            ServerMessage::Cells { events } => {
                self.reconciler_mut()?.apply_all(&events);
                Ok(ClientEvent::Synced { events: events.len() })
            }
            ServerMessage::CellCount { count, seq } => {
                let reconciler = self.reconciler.as_ref().ok_or(NetError::NotWelcomed)?;
                let audit = CountAudit {
                    authority: count,
                    local: reconciler.active_count(),
                    seq,
                    local_seq: reconciler.mirror().last_seq(),
                };
                if audit.consistent() {
                    info!(id = %self.id(), count, seq, "cell count matches authority");
                } else {
                    warn!(
                        id = %self.id(),
                        authority = audit.authority,
                        local = audit.local,
                        seq = audit.seq,
                        local_seq = audit.local_seq,
                        "cell count diverged from authority"
                    );
                }
                Ok(ClientEvent::Audited(audit))
            }
            ServerMessage::Error { message } => {
                warn!(id = %self.id(), %message, "authority rejected a frame");
                Ok(ClientEvent::Rejected { message })
            }
        }
    }

    fn reconciler_mut(&mut self) -> Result<&mut ClientCellReconciler<F>, NetError> {
        self.reconciler.as_mut().ok_or(NetError::NotWelcomed)
    }
}
