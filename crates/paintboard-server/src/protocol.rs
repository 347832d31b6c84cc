//! Board protocol messages.
//!
//! Every frame is a JSON object tagged by `type`:
//! ```json
//! { "type": "get_board", "seq": 1 }
//! { "type": "get_chunk", "seq": 2, "x": 0, "y": 0, "cx": 256, "cy": 256 }
//! { "type": "paint", "x": 10, "y": 20, "color": 3 }
//! ```
//! `seq` is optional and echoed back in the reply so clients can match
//! replies to requests. Pixel buffers travel base64-encoded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest area a single `get_chunk` may request.
pub const MAX_CHUNK_AREA: i64 = 1_048_576;

/// A request from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Fetch the whole board
    GetBoard,
    /// Fetch a rectangle, which may extend past the board
    GetChunk { x: i64, y: i64, cx: i64, cy: i64 },
    /// Set one pixel
    Paint { x: i64, y: i64, color: i64 },
}

/// A message sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First frame on every connection
    Welcome {
        connection_id: String,
        width: usize,
        height: usize,
        colors: Vec<String>,
    },
    /// Reply to `get_board`
    Board {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        width: usize,
        height: usize,
        data: String,
    },
    /// Reply to `get_chunk`
    Chunk {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        x: i64,
        y: i64,
        cx: usize,
        cy: usize,
        data: String,
    },
    /// A pixel was painted, sent to every peer
    Update { x: usize, y: usize, color: u8 },
    /// A request was rejected, sent to the requester only
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        id: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(seq: Option<u64>, err: &ProtocolError) -> Self {
        Self::Error {
            seq,
            id: err.id().to_string(),
            message: err.to_string(),
        }
    }
}

/// A request that was rejected before touching the board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Invalid parameters: {0}")]
    Parameter(String),
    #[error("Chunk of {cx}x{cy} pixels exceeds the limit of {max}", max = MAX_CHUNK_AREA)]
    ChunkTooBig { cx: i64, cy: i64 },
    #[error("Pixel ({x}, {y}) is outside the board")]
    OutOfBoard { x: i64, y: i64 },
    #[error("Server is stopping")]
    Stopping,
}

impl ProtocolError {
    /// Stable identifier sent as the `id` of an error reply.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Parameter(_) => "base:parameter_error",
            Self::ChunkTooBig { .. } => "get_chunk:chunk_too_big",
            Self::OutOfBoard { .. } => "paint:out_of_board",
            Self::Stopping => "base:server_stopping",
        }
    }
}

/// A client frame with its correlation number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub seq: Option<u64>,
    pub message: ClientMessage,
}

impl Request {
    /// Parse a text frame. On failure the error carries whatever `seq` could
    /// still be read, so the reply can be correlated.
    pub fn parse(text: &str) -> Result<Self, (Option<u64>, ProtocolError)> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| (None, ProtocolError::Parameter(e.to_string())))?;
        let seq = value.get("seq").and_then(serde_json::Value::as_u64);
        let message = ClientMessage::deserialize(&value)
            .map_err(|e| (seq, ProtocolError::Parameter(e.to_string())))?;
        Ok(Self { seq, message })
    }
}

/// A validated chunk window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    pub x: i64,
    pub y: i64,
    pub cx: usize,
    pub cy: usize,
}

/// Check a chunk request before anything is allocated for it. The origin
/// may lie anywhere; only the size is bounded.
pub fn validate_chunk(x: i64, y: i64, cx: i64, cy: i64) -> Result<ChunkRequest, ProtocolError> {
    if cx <= 0 || cy <= 0 {
        return Err(ProtocolError::Parameter(
            "cx and cy must be positive".to_string(),
        ));
    }
    match cx.checked_mul(cy) {
        Some(area) if area <= MAX_CHUNK_AREA => Ok(ChunkRequest {
            x,
            y,
            cx: cx as usize,
            cy: cy as usize,
        }),
        _ => Err(ProtocolError::ChunkTooBig { cx, cy }),
    }
}

/// A validated paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintRequest {
    pub x: i64,
    pub y: i64,
    pub color: u8,
}

/// Check a paint against the board size and palette. The color is checked
/// first, then the position.
pub fn validate_paint(
    x: i64,
    y: i64,
    color: i64,
    width: usize,
    height: usize,
    palette_len: usize,
) -> Result<PaintRequest, ProtocolError> {
    if color < 0 || color >= palette_len as i64 {
        return Err(ProtocolError::Parameter(format!(
            "color {color} is not in a palette of {palette_len}"
        )));
    }
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return Err(ProtocolError::OutOfBoard { x, y });
    }
    Ok(PaintRequest {
        x,
        y,
        color: color as u8,
    })
}

pub fn encode_pixels(data: &[u8]) -> String {
    STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requests() {
        let req = Request::parse(r#"{"type":"get_board","seq":4}"#).unwrap();
        assert_eq!(req.seq, Some(4));
        assert_eq!(req.message, ClientMessage::GetBoard);

        let req = Request::parse(r#"{"type":"paint","x":1,"y":2,"color":3}"#).unwrap();
        assert_eq!(req.seq, None);
        assert_eq!(req.message, ClientMessage::Paint { x: 1, y: 2, color: 3 });

        let req = Request::parse(r#"{"type":"get_chunk","x":-5,"y":0,"cx":10,"cy":20}"#).unwrap();
        assert_eq!(req.message, ClientMessage::GetChunk { x: -5, y: 0, cx: 10, cy: 20 });
    }

    #[test]
    fn test_parse_rejects_non_integers() {
        let (seq, err) = Request::parse(r#"{"type":"paint","seq":9,"x":1.5,"y":2,"color":3}"#)
            .unwrap_err();
        assert_eq!(seq, Some(9));
        assert_eq!(err.id(), "base:parameter_error");

        let (_, err) = Request::parse(r#"{"type":"paint","x":"1","y":2,"color":3}"#).unwrap_err();
        assert_eq!(err.id(), "base:parameter_error");

        let (_, err) = Request::parse(r#"{"type":"paint","x":1,"y":2}"#).unwrap_err();
        assert_eq!(err.id(), "base:parameter_error");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let (seq, err) = Request::parse("not json").unwrap_err();
        assert_eq!(seq, None);
        assert!(matches!(err, ProtocolError::Parameter(_)));

        let (_, err) = Request::parse(r#"{"type":"erase"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Parameter(_)));
    }

    #[test]
    fn test_chunk_limits() {
        assert!(validate_chunk(0, 0, 1024, 1024).is_ok());
        assert_eq!(
            validate_chunk(0, 0, 2000, 2000),
            Err(ProtocolError::ChunkTooBig { cx: 2000, cy: 2000 })
        );
        assert_eq!(
            validate_chunk(0, 0, i64::MAX, 2).unwrap_err().id(),
            "get_chunk:chunk_too_big"
        );
        assert_eq!(validate_chunk(0, 0, 0, 5).unwrap_err().id(), "base:parameter_error");
        assert_eq!(validate_chunk(0, 0, 5, -1).unwrap_err().id(), "base:parameter_error");
        let ok = validate_chunk(-10, -10, 3, 4).unwrap();
        assert_eq!((ok.cx, ok.cy), (3, 4));
    }

    #[test]
    fn test_paint_validation() {
        assert_eq!(
            validate_paint(3, 3, 1, 4, 4, 2),
            Ok(PaintRequest { x: 3, y: 3, color: 1 })
        );
        assert_eq!(validate_paint(0, 0, 2, 4, 4, 2).unwrap_err().id(), "base:parameter_error");
        assert_eq!(validate_paint(0, 0, -1, 4, 4, 2).unwrap_err().id(), "base:parameter_error");
        assert_eq!(validate_paint(4, 0, 0, 4, 4, 2).unwrap_err().id(), "paint:out_of_board");
        assert_eq!(validate_paint(0, -1, 0, 4, 4, 2).unwrap_err().id(), "paint:out_of_board");
        // Color is checked before position.
        assert_eq!(validate_paint(9, 9, 9, 4, 4, 2).unwrap_err().id(), "base:parameter_error");
    }

    #[test]
    fn test_server_message_json() {
        let json = serde_json::to_value(ServerMessage::Update { x: 1, y: 2, color: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "update", "x": 1, "y": 2, "color": 3}));

        let err = ServerMessage::error(Some(7), &ProtocolError::OutOfBoard { x: 9, y: 9 });
        let json = serde_json::to_value(err).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["seq"], 7);
        assert_eq!(json["id"], "paint:out_of_board");

        let json = serde_json::to_value(ServerMessage::error(None, &ProtocolError::Stopping)).unwrap();
        assert!(json.get("seq").is_none());
    }

    #[test]
    fn test_encode_pixels() {
        assert_eq!(encode_pixels(&[0, 1, 2]), "AAEC");
    }
}
