use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, Booking, BookingStatus, EventKind};
use crate::services::events::EventBus;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";

pub struct NewBooking {
    pub service: String,
    pub date: String,
    pub time: String,
    pub area: String,
    pub address: String,
}

/// Create a new booking owned by the acting user. All fields are required,
/// the date/time must parse, and the service must exist in the catalog.
pub fn create(
    conn: &Connection,
    events: &EventBus,
    actor: &Actor,
    req: NewBooking,
) -> Result<Booking, AppError> {
    let service = req.service.trim();
    let area = req.area.trim();
    let address = req.address.trim();

    for (field, value) in [
        ("service", service),
        ("date", req.date.trim()),
        ("time", req.time.trim()),
        ("area", area),
        ("address", address),
    ] {
        if value.is_empty() {
            return Err(AppError::Validation(format!("{field} is required")));
        }
    }

    let scheduled_date = NaiveDate::parse_from_str(req.date.trim(), DATE_FMT)
        .map_err(|_| AppError::Validation(format!("invalid date: {}", req.date)))?;
    let scheduled_time = NaiveTime::parse_from_str(req.time.trim(), TIME_FMT)
        .map_err(|_| AppError::Validation(format!("invalid time: {}", req.time)))?;

    if queries::get_service_by_name(conn, service)?.is_none() {
        return Err(AppError::Validation(format!("unknown service: {service}")));
    }

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        customer_id: actor.id.clone(),
        service: service.to_string(),
        scheduled_date,
        scheduled_time,
        area: area.to_string(),
        address: address.to_string(),
        status: BookingStatus::Pending,
        assigned_worker: None,
        notes: None,
        version: 1,
        created_at: now,
        updated_at: now,
    };
    queries::create_booking(conn, &booking)?;
    events.publish(conn, EventKind::BookingCreated, &booking);

    Ok(booking)
}

/// Administrator accepts a pending booking.
pub fn accept(
    conn: &Connection,
    events: &EventBus,
    actor: &Actor,
    booking_id: &str,
) -> Result<Booking, AppError> {
    require_admin(actor)?;
    let booking = load(conn, booking_id)?;
    check_transition(&booking, BookingStatus::Confirmed)?;
    apply(conn, events, &booking, BookingStatus::Confirmed, None, None, EventKind::BookingConfirmed)
}

/// Administrator rejects a booking that has not started yet.
pub fn reject(
    conn: &Connection,
    events: &EventBus,
    actor: &Actor,
    booking_id: &str,
) -> Result<Booking, AppError> {
    require_admin(actor)?;
    let booking = load(conn, booking_id)?;
    check_transition(&booking, BookingStatus::Cancelled)?;
    apply(conn, events, &booking, BookingStatus::Cancelled, None, None, EventKind::BookingCancelled)
}

/// Administrator assigns a registered worker to a confirmed booking,
/// moving it to in-progress. The worker existence check sits next to the
/// write so a concurrently deleted worker surfaces as `NotFound` rather
/// than a dangling assignment.
pub fn assign_worker(
    conn: &Connection,
    events: &EventBus,
    actor: &Actor,
    booking_id: &str,
    worker_id: &str,
    notes: Option<String>,
) -> Result<Booking, AppError> {
    require_admin(actor)?;
    let booking = load(conn, booking_id)?;

    if booking.assigned_worker.is_some() {
        return Err(AppError::InvalidTransition {
            from: booking.status,
            to: BookingStatus::InProgress,
        });
    }
    check_transition(&booking, BookingStatus::InProgress)?;

    if queries::get_worker(conn, worker_id)?.is_none() {
        return Err(AppError::NotFound(format!("worker not found: {worker_id}")));
    }

    apply(
        conn,
        events,
        &booking,
        BookingStatus::InProgress,
        Some(worker_id),
        notes.as_deref(),
        EventKind::WorkerAssigned,
    )
}

/// Administrator marks an in-progress booking as done.
pub fn complete(
    conn: &Connection,
    events: &EventBus,
    actor: &Actor,
    booking_id: &str,
) -> Result<Booking, AppError> {
    require_admin(actor)?;
    let booking = load(conn, booking_id)?;
    check_transition(&booking, BookingStatus::Completed)?;
    apply(conn, events, &booking, BookingStatus::Completed, None, None, EventKind::BookingCompleted)
}

/// A customer cancels their own booking before work starts.
pub fn cancel(
    conn: &Connection,
    events: &EventBus,
    actor: &Actor,
    booking_id: &str,
) -> Result<Booking, AppError> {
    let booking = load(conn, booking_id)?;
    if booking.customer_id != actor.id {
        return Err(AppError::NotAuthorized(
            "only the booking owner may cancel".to_string(),
        ));
    }
    check_transition(&booking, BookingStatus::Cancelled)?;
    apply(conn, events, &booking, BookingStatus::Cancelled, None, None, EventKind::BookingCancelled)
}

fn require_admin(actor: &Actor) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::NotAuthorized(
            "administrator role required".to_string(),
        ))
    }
}

fn load(conn: &Connection, booking_id: &str) -> Result<Booking, AppError> {
    queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking not found: {booking_id}")))
}

fn check_transition(booking: &Booking, next: BookingStatus) -> Result<(), AppError> {
    if booking.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: booking.status,
            to: next,
        })
    }
}

/// Write the transition guarded by the version read above. A missed guard
/// means the row changed (or vanished) between our read and the write; the
/// caller gets `Conflict` or `NotFound`, never a silent overwrite.
fn apply(
    conn: &Connection,
    events: &EventBus,
    current: &Booking,
    next: BookingStatus,
    worker: Option<&str>,
    notes: Option<&str>,
    kind: EventKind,
) -> Result<Booking, AppError> {
    let written =
        queries::transition_booking(conn, &current.id, current.version, next, worker, notes)?;

    if !written {
        return match queries::get_booking(conn, &current.id)? {
            Some(latest) => Err(AppError::Conflict(format!(
                "booking {} was modified concurrently (now {})",
                current.id, latest.status
            ))),
            None => Err(AppError::NotFound(format!("booking not found: {}", current.id))),
        };
    }

    let updated = load(conn, &current.id)?;
    events.publish(conn, kind, &updated);
    Ok(updated)
}
