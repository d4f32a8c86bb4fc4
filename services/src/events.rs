//! Events emitted towards the realtime fan-out.
//!
//! The transport itself lives outside this crate; the core only needs a
//! `Notifier` that accepts an event. Delivery is best-effort and must never
//! affect the outcome of the operation that emitted the event.

use chrono::{DateTime, Utc};
use db::models::attendance_record::AttendanceStatus;
use db::models::class_session::SessionStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcomePayload {
    pub student_id: i64,
    pub student_name: String,
    pub registration_no: String,
    pub session_id: i64,
    pub course_code: String,
    pub status: AttendanceStatus,
    pub check_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AttendanceEvent {
    #[serde(rename = "scan.ingested")]
    ScanIngested(ScanOutcomePayload),

    /// Same shape as `scan.ingested`, emitted instead of it when the merge
    /// resolved to "unchanged".
    #[serde(rename = "scan.duplicate")]
    ScanDuplicate(ScanOutcomePayload),

    #[serde(rename = "scan.error")]
    ScanError {
        registration_no: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "session.status_changed")]
    SessionStatusChanged {
        session_id: i64,
        course_id: i64,
        status: SessionStatus,
    },
}

pub trait Notifier: Send + Sync {
    fn publish(&self, event: AttendanceEvent);
}

/// Fans events out over a tokio broadcast channel. The realtime transport
/// subscribes on its side; having no subscribers is not an error.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<AttendanceEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttendanceEvent> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, event: AttendanceEvent) {
        let _ = self.tx.send(event);
    }
}

/// Drops every event. Useful where no transport is wired up.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn publish(&self, _event: AttendanceEvent) {}
}
