//! # Message envelope exchanged between the scheduler and its units.
//!
//! Every message crossing the unit boundary is an [`Envelope`]:
//! ```text
//! { id, kind, timestamp, protocol_version, data }
//! ```
//! `data` is JSON, so the payload is always copied, never shared.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ProtocolError;

/// Protocol version spoken by this build of the units.
pub const PROTOCOL_VERSION: u32 = 1;

/// Message classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Scheduler → unit: run a task. Data: [`DispatchRequest`](super::DispatchRequest).
    TaskDispatch,
    /// Unit → scheduler: task finished. Data: [`TaskResult`](crate::TaskResult).
    TaskResult,
    /// Unit → scheduler: batch progress. Data: [`TaskProgress`](crate::TaskProgress).
    TaskProgress,
    /// Unit → scheduler: task failed. Data: [`TaskErrorReport`](super::TaskErrorReport).
    TaskError,
    /// Scheduler → unit: stop a task if not finished. Data: [`CancelRequest`](super::CancelRequest).
    TaskCancel,
    /// Scheduler → unit: liveness ping. Data: empty object.
    HealthProbe,
    /// Unit → scheduler: ping answer. Data: [`HealthReport`](super::HealthReport).
    HealthResponse,
    /// Unit → scheduler: declared capabilities. Data: [`UnitCapabilities`](crate::UnitCapabilities).
    CapabilityAnnouncement,
    /// Unit → scheduler: protocol handshake. Data: [`VersionReport`](super::VersionReport).
    VersionCheck,
}

impl MessageKind {
    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::TaskDispatch => "task_dispatch",
            MessageKind::TaskResult => "task_result",
            MessageKind::TaskProgress => "task_progress",
            MessageKind::TaskError => "task_error",
            MessageKind::TaskCancel => "task_cancel",
            MessageKind::HealthProbe => "health_probe",
            MessageKind::HealthResponse => "health_response",
            MessageKind::CapabilityAnnouncement => "capability_announcement",
            MessageKind::VersionCheck => "version_check",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub protocol_version: u32,
    pub data: Value,
}

impl Envelope {
    /// Builds an envelope around a serializable payload.
    pub fn new<T: Serialize>(kind: MessageKind, data: &T) -> Result<Self, ProtocolError> {
        let data = serde_json::to_value(data).map_err(|source| ProtocolError::Encode {
            kind: kind.as_str(),
            source,
        })?;
        Ok(Self::raw(kind, data))
    }

    /// Builds an envelope around an already-encoded payload.
    pub fn raw(kind: MessageKind, data: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            protocol_version: PROTOCOL_VERSION,
            data,
        }
    }

    /// Decodes `data` into the payload type expected for this kind.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        T::deserialize(&self.data).map_err(|source| ProtocolError::Malformed {
            kind: self.kind.as_str(),
            source,
        })
    }
}
