use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::model::record::{PriorityChange, Record, Section};

/// Server-originated change notification received on the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    ConnectionEstablished { client_id: Option<String> },
    SystemEditModeChanged { enabled: bool },
    RecordCreated(Record),
    RecordUpdated(Record),
    RecordPriorityUpdated { changes: Vec<PriorityChange> },
    RecordPriorityRecalculated {
        department_id: u64,
        section: Option<Section>,
    },
    /// A kind this client does not understand. Kept so it can be logged.
    Unknown { kind: String },
}

#[derive(Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionPayload {
    #[serde(default)]
    client_id: Option<String>,
}

#[derive(Deserialize)]
struct EditModePayload {
    enabled: bool,
}

#[derive(Deserialize)]
struct PriorityPayload {
    records: Vec<PriorityChange>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecalculatedPayload {
    department_id: u64,
    #[serde(default)]
    section: Option<Section>,
}

impl RealtimeEvent {
    /// Decode one text frame of the form `{"event": KIND, "payload": ...}`.
    ///
    /// Unknown kinds decode successfully as [`RealtimeEvent::Unknown`]; a
    /// known kind with a malformed payload is an error.
    pub fn parse(text: &str) -> Result<Self> {
        let frame: Frame = serde_json::from_str(text)?;
        let event = match frame.event.as_str() {
            "CONNECTION_ESTABLISHED" => {
                let payload: ConnectionPayload = if frame.payload.is_null() {
                    ConnectionPayload { client_id: None }
                } else {
                    serde_json::from_value(frame.payload)?
                };
                RealtimeEvent::ConnectionEstablished {
                    client_id: payload.client_id,
                }
            }
            "SYSTEM_EDIT_MODE_CHANGED" => {
                let payload: EditModePayload = serde_json::from_value(frame.payload)?;
                RealtimeEvent::SystemEditModeChanged {
                    enabled: payload.enabled,
                }
            }
            "RECORD_CREATED" => RealtimeEvent::RecordCreated(serde_json::from_value(frame.payload)?),
            "RECORD_UPDATED" => RealtimeEvent::RecordUpdated(serde_json::from_value(frame.payload)?),
            "RECORD_PRIORITY_UPDATED" => {
                let payload: PriorityPayload = serde_json::from_value(frame.payload)?;
                RealtimeEvent::RecordPriorityUpdated {
                    changes: payload.records,
                }
            }
            "RECORD_PRIORITY_RECALCULATED" => {
                let payload: RecalculatedPayload = serde_json::from_value(frame.payload)?;
                RealtimeEvent::RecordPriorityRecalculated {
                    department_id: payload.department_id,
                    section: payload.section,
                }
            }
            _ => RealtimeEvent::Unknown { kind: frame.event },
        };
        Ok(event)
    }

    pub fn kind(&self) -> &str {
        match self {
            RealtimeEvent::ConnectionEstablished { .. } => "CONNECTION_ESTABLISHED",
            RealtimeEvent::SystemEditModeChanged { .. } => "SYSTEM_EDIT_MODE_CHANGED",
            RealtimeEvent::RecordCreated(_) => "RECORD_CREATED",
            RealtimeEvent::RecordUpdated(_) => "RECORD_UPDATED",
            RealtimeEvent::RecordPriorityUpdated { .. } => "RECORD_PRIORITY_UPDATED",
            RealtimeEvent::RecordPriorityRecalculated { .. } => "RECORD_PRIORITY_RECALCULATED",
            RealtimeEvent::Unknown { kind } => kind,
        }
    }
}
