use serde::{Deserialize, Serialize};

/// Lifecycle event kinds consumed by the notification collaborator. One
/// event is emitted per accepted transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    BookingCreated,
    BookingConfirmed,
    WorkerAssigned,
    BookingCompleted,
    BookingCancelled,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::BookingCreated => "BookingCreated",
            EventKind::BookingConfirmed => "BookingConfirmed",
            EventKind::WorkerAssigned => "WorkerAssigned",
            EventKind::BookingCompleted => "BookingCompleted",
            EventKind::BookingCancelled => "BookingCancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: i64,
    pub kind: String,
    pub booking_id: String,
    pub payload: serde_json::Value,
    pub created_at: String,
}
