use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingScope};
use crate::services::auth;
use crate::services::lifecycle::{self, NewBooking};
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub customer_id: String,
    pub service: String,
    pub date: String,
    pub time: String,
    pub area: String,
    pub address: String,
    pub status: String,
    pub assigned_worker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_name: Option<String>,
    pub notes: Option<String>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl BookingResponse {
    pub fn from_booking(booking: &Booking, worker_name: Option<String>) -> Self {
        Self {
            id: booking.id.clone(),
            customer_id: booking.customer_id.clone(),
            service: booking.service.clone(),
            date: booking.scheduled_date.format("%Y-%m-%d").to_string(),
            time: booking.scheduled_time.format("%H:%M").to_string(),
            area: booking.area.clone(),
            address: booking.address.clone(),
            status: booking.status.as_str().to_string(),
            assigned_worker: booking.assigned_worker.clone(),
            worker_name,
            notes: booking.notes.clone(),
            version: booking.version,
            created_at: booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: booking.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub address: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;

    let booking = lifecycle::create(
        &db,
        &state.events,
        &actor,
        NewBooking {
            service: body.service,
            date: body.date,
            time: body.time,
            area: body.area,
            address: body.address,
        },
    )?;

    Ok(Json(BookingResponse::from_booking(&booking, None)))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub scope: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;

    let scope = match query.scope.as_deref() {
        Some(s) => Some(
            BookingScope::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown scope: {s}")))?,
        ),
        None => None,
    };

    let bookings = queries::list_bookings_for_customer(&db, &actor.id, scope)?;
    let response = bookings
        .iter()
        .map(|b| BookingResponse::from_booking(b, None))
        .collect();
    Ok(Json(response))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;

    let booking = queries::get_booking(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking not found: {id}")))?;

    // Read access: the owning customer, or any administrator
    if booking.customer_id != actor.id && !actor.is_admin() {
        return Err(AppError::NotAuthorized(
            "not the booking owner".to_string(),
        ));
    }

    Ok(Json(BookingResponse::from_booking(&booking, None)))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;

    let booking = lifecycle::cancel(&db, &state.events, &actor, &id)?;
    Ok(Json(BookingResponse::from_booking(&booking, None)))
}
