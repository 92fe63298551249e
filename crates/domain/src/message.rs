//! JSON messages exchanged with the mesh bridge over the broker.

use serde::{Deserialize, Serialize};

use crate::command::{OpCode, OutboundCommand};

/// Control message published for each outbound command.
///
/// Serialises compactly with keys in `dstAdr`, `opCode`, `data` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "dstAdr")]
    pub destination: u16,
    #[serde(rename = "opCode")]
    pub op_code: OpCode,
    pub data: String,
}

impl From<&OutboundCommand> for ControlMessage {
    fn from(command: &OutboundCommand) -> Self {
        Self {
            destination: command.destination.wire_address(),
            op_code: command.op_code,
            data: command.payload.clone(),
        }
    }
}

impl ControlMessage {
    /// Compact JSON bytes ready to publish.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which cannot happen for this shape
    /// but is propagated rather than hidden.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// One entry of an inbound status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Raw mesh address; zero or unknown addresses are skipped by the
    /// fan-out.
    #[serde(rename = "a")]
    pub address: u16,
    /// 8-hex-character status payload.
    #[serde(rename = "d")]
    pub data: String,
}

/// Outcome of parsing one element of a status message.
pub type ParsedEntry = Result<StatusEntry, serde_json::Error>;

/// Parse an inbound status message: a JSON array of [`StatusEntry`].
///
/// Elements are parsed one by one, so a malformed element only spoils its
/// own slot.
///
/// # Errors
///
/// Returns the JSON error when the payload is not an array.
pub fn parse_status_message(payload: &[u8]) -> Result<Vec<ParsedEntry>, serde_json::Error> {
    let elements: Vec<serde_json::Value> = serde_json::from_slice(payload)?;
    Ok(elements.into_iter().map(serde_json::from_value).collect())
}

/// Asks the bridge to push the current status of every device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub ver: u8,
}

impl Default for StatusRequest {
    fn default() -> Self {
        Self {
            kind: "immediateNOW".to_string(),
            ver: 1,
        }
    }
}
