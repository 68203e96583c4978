//! Wire records shared across the messaging core.
//!
//! Field names follow the persistence service's snake_case Spanish wire
//! format (`contenido`, `remitente_rol`, …) via serde renames, so the same
//! structs decode history responses, channel frames, and fallback-send
//! responses.

use serde::{Deserialize, Serialize};

use crate::ids::{ClinicianId, ConversationKey, MessageId, PatientId};

/// The two participant roles in a conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// A patient.
    #[serde(rename = "paciente")]
    Patient,
    /// A clinician.
    #[serde(rename = "medico")]
    Clinician,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Patient => f.write_str("paciente"),
            Role::Clinician => f.write_str("medico"),
        }
    }
}

/// A single chat message.
///
/// The conversation it belongs to is carried by context (the store key it
/// is appended under, or the key the transport is bound to), never taken
/// from the frame itself (that is the no-cross-delivery contract).
///
/// Timestamps are kept as the server's opaque ISO 8601 strings; the core
/// never orders by them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned ID. `None` for frames that have not round-tripped
    /// through persistence yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Message text. Non-empty.
    #[serde(rename = "contenido")]
    pub content: String,
    /// Server timestamp, ISO 8601.
    pub timestamp: String,
    /// Role of the sender.
    #[serde(rename = "remitente_rol")]
    pub sender_role: Role,
    /// Display name of the sender. The relay omits it on some echo paths.
    #[serde(rename = "remitente_nombre", default)]
    pub sender_name: String,
}

/// One row of the conversation directory.
///
/// `unread_count` is relative to the current viewer's role and owned by the
/// persistence service; it is never zeroed locally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// The patient participant.
    #[serde(rename = "paciente_id")]
    pub patient_id: PatientId,
    /// Patient display name.
    #[serde(rename = "paciente_nombre")]
    pub patient_name: String,
    /// The clinician participant.
    #[serde(rename = "medico_id")]
    pub clinician_id: ClinicianId,
    /// Clinician display name.
    #[serde(rename = "medico_nombre")]
    pub clinician_name: String,
    /// Summary of the most recent message, empty for fresh conversations.
    #[serde(rename = "ultimo_mensaje", default)]
    pub last_message: String,
    /// Timestamp of the most recent message, ISO 8601.
    #[serde(rename = "ultimo_timestamp", default)]
    pub last_timestamp: String,
    /// Unread counter for the current viewer.
    #[serde(rename = "no_leidos", default)]
    pub unread_count: u32,
}

impl Conversation {
    /// The `(patient, clinician)` pair identifying this conversation.
    pub fn key(&self) -> ConversationKey {
        ConversationKey {
            patient: self.patient_id,
            clinician: self.clinician_id,
        }
    }
}

/// Outgoing message payload, before it receives a server-assigned
/// id/timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message text.
    #[serde(rename = "contenido")]
    pub content: String,
    /// The patient participant of the target conversation.
    #[serde(rename = "paciente_id")]
    pub patient_id: PatientId,
    /// The clinician participant of the target conversation.
    #[serde(rename = "medico_id")]
    pub clinician_id: ClinicianId,
    /// Role of the sender.
    #[serde(rename = "remitente_rol")]
    pub sender_role: Role,
}

impl Envelope {
    /// Build an envelope addressed to `key`.
    pub fn new(key: ConversationKey, content: impl Into<String>, sender_role: Role) -> Self {
        Self {
            content: content.into(),
            patient_id: key.patient,
            clinician_id: key.clinician,
            sender_role,
        }
    }

    /// The conversation this envelope is addressed to.
    pub fn key(&self) -> ConversationKey {
        ConversationKey {
            patient: self.patient_id,
            clinician: self.clinician_id,
        }
    }
}
