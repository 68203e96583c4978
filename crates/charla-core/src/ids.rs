//! Branded identifier newtypes.
//!
//! Participant IDs are numeric (assigned by the persistence service at
//! registration). Message IDs are server-assigned and opaque to the client;
//! the backend currently emits integers but the client never arithmetics on
//! them, so [`MessageId`] normalizes both integer and string wire forms into
//! a string.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Numeric ID of a patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub i64);

/// Numeric ID of a clinician.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClinicianId(pub i64);

/// The ordered `(patient, clinician)` pair identifying a conversation.
///
/// Every conversation is strictly one patient and one clinician; the pair is
/// the only conversation identifier the system has.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    /// The patient participant.
    pub patient: PatientId,
    /// The clinician participant.
    pub clinician: ClinicianId,
}

impl ConversationKey {
    /// Build a key from raw numeric IDs.
    pub fn new(patient: i64, clinician: i64) -> Self {
        Self {
            patient: PatientId(patient),
            clinician: ClinicianId(clinician),
        }
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClinicianId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}:c{}", self.patient, self.clinician)
    }
}

/// Server-assigned message ID, unique within a conversation once persisted.
///
/// Absent on channel-pushed messages that have not yet round-tripped through
/// persistence.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Build an ID from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// The backend emits integer IDs; older fixtures and the relay emit strings.
// Accept both.
impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = MessageId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer message id")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<MessageId, E> {
                Ok(MessageId(v.to_owned()))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<MessageId, E> {
                Ok(MessageId(v.to_string()))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<MessageId, E> {
                Ok(MessageId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}
