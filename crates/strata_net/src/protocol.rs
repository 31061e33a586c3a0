//! Wire messages between the authority and its observers
//!
//! Frames are JSON documents tagged by `type`. Each observer receives
//! frames in the order the authority sent them; the cell stream is only
//! correct under that ordering.

use crate::replication::CellEvent;
use crate::ObserverId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strata_core::{FieldParams, GridCoord, Seed};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Hello { name: String, position: [f32; 3] },
    Position { position: [f32; 3] },
    /// Debug audit: ask the authority how many cells it holds.
    CountRequest,
    Goodbye,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Always the first frame an observer receives; carries everything
    /// needed to generate cell content locally.
    Welcome {
        observer_id: ObserverId,
        protocol_version: u32,
        seed: Seed,
        field: FieldParams,
    },
    /// Full set at `seq`; later `Cells` frames continue from there.
    Snapshot {
        seq: u64,
        cells: Vec<GridCoord>,
    },
    Cells {
        events: Vec<CellEvent>,
    },
    CellCount {
        count: usize,
        seq: u64,
    },
    Error {
        message: String,
    },
}

pub fn encode<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode<T: DeserializeOwned>(frame: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::CellOp;
    use strata_core::glam::Vec2;

    #[test]
    fn test_client_frames_are_tagged() {
        let frame = encode(&ClientMessage::Position { position: [1.5, 0.0, -2.0] }).unwrap();
        assert_eq!(frame, r#"{"type":"position","position":[1.5,0.0,-2.0]}"#);
        assert_eq!(encode(&ClientMessage::CountRequest).unwrap(), r#"{"type":"count_request"}"#);
    }

    #[test]
    fn test_welcome_preserves_field_params_exactly() {
        let field = FieldParams {
            detail_scale: 7.3,
            offset: Vec2::new(0.1, -12.75),
            roughness: 0.333,
            ..FieldParams::default()
        };
        let welcome = ServerMessage::Welcome {
            observer_id: ObserverId(3),
            protocol_version: crate::PROTOCOL_VERSION,
            seed: Seed(-99),
            field,
        };
        let back: ServerMessage = decode(&encode(&welcome).unwrap()).unwrap();
        assert_eq!(back, welcome);
    }

    #[test]
    fn test_cells_frame_decodes() {
        let frame = r#"{"type":"cells","events":[{"seq":1,"op":"add","coord":{"x":2,"z":3}},{"seq":2,"op":"clear"}]}"#;
        let message: ServerMessage = decode(frame).unwrap();
        assert_eq!(
            message,
            ServerMessage::Cells {
                events: vec![
                    CellEvent { seq: 1, op: CellOp::Add { coord: GridCoord::new(2, 3) } },
                    CellEvent { seq: 2, op: CellOp::Clear },
                ]
            }
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(decode::<ClientMessage>("{\"type\":\"jump\"}"), Err(ProtocolError::Malformed(_))));
    }
}
