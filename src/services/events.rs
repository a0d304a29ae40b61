use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::db::queries;
use crate::models::{Booking, EventKind, LifecycleEvent};

/// Fan-out point for lifecycle events. Each accepted transition appends a
/// row to the events table and pushes the event to live subscribers; the
/// engine never waits on delivery, and a failure to record is logged
/// rather than surfaced to the caller.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, conn: &Connection, kind: EventKind, booking: &Booking) {
        let payload = serde_json::json!({
            "customer_id": booking.customer_id,
            "service": booking.service,
            "status": booking.status.as_str(),
            "assigned_worker": booking.assigned_worker,
        });

        match queries::insert_event(conn, kind.as_str(), &booking.id, &payload) {
            Ok(id) => {
                let event = LifecycleEvent {
                    id,
                    kind: kind.as_str().to_string(),
                    booking_id: booking.id.clone(),
                    payload,
                    created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                };
                // Broadcast to SSE subscribers; ignore if no receivers
                let _ = self.tx.send(event);
            }
            Err(e) => {
                tracing::error!(error = %e, booking_id = %booking.id, "failed to record lifecycle event");
            }
        }
    }
}
