use serde::{Deserialize, Serialize};

use crate::{market::Snapshot, orders::Order};

/// The envelope every socket carries, tagged by `message_type`:
///
/// ```json
/// {"message_type": "ORDER", "data": { /* order fields */ }}
/// {"message_type": "DATA_SNAPSHOT", "data": { /* snapshot fields */ }}
/// ```
///
/// Decoding is strict: an unknown tag or enum value fails, and the boundary
/// drops the message. The orchestrator variants carry free-form payloads;
/// no dedicated sockets are wired for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", content = "data")]
pub enum Message {
    #[serde(rename = "ORDER")]
    Order(Order),
    #[serde(rename = "DATA_SNAPSHOT")]
    DataSnapshot(Snapshot),
    #[serde(rename = "ORCHESTRATOR_COMMAND")]
    OrchestratorCommand(serde_json::Value),
    #[serde(rename = "ORCHESTRATOR_RESPONSE")]
    OrchestratorResponse(serde_json::Value),
}

impl Message {
    /// Encode as a single JSON line, the unit all transports exchange.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
