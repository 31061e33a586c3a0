use crate::protocol::ProtocolError;
use thiserror::Error;

/// Errors from the host/client plumbing. Replication itself never fails;
/// these only cover a broken link or an incompatible peer.
#[derive(Debug, Error)]
pub enum NetError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("connection to the authority is closed")]
    Disconnected,

    #[error("protocol version mismatch: ours {ours}, authority {theirs}")]
    VersionMismatch { ours: u32, theirs: u32 },

    #[error("cell data arrived before the welcome frame")]
    NotWelcomed,
}
