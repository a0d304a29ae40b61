use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{worker, Actor, BookingStatus, Worker};
use crate::services::auth;
use crate::services::lifecycle;
use crate::state::AppState;

use super::bookings::BookingResponse;

fn require_admin(actor: &Actor) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::NotAuthorized(
            "administrator role required".to_string(),
        ))
    }
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;
    require_admin(&actor)?;

    let limit = query.limit.unwrap_or(50);
    let status_filter = match query.status.as_deref() {
        Some(s) => {
            let status = BookingStatus::parse(s);
            if status.as_str() != s {
                return Err(AppError::Validation(format!("unknown status: {s}")));
            }
            Some(status)
        }
        None => None,
    };

    let bookings = queries::list_all_bookings(&db, status_filter, limit)?;
    let response = bookings
        .into_iter()
        .map(|(b, worker_name)| BookingResponse::from_booking(&b, worker_name))
        .collect();
    Ok(Json(response))
}

// POST /api/admin/bookings/:id/accept
pub async fn accept_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;

    let booking = lifecycle::accept(&db, &state.events, &actor, &id)?;
    Ok(Json(BookingResponse::from_booking(&booking, None)))
}

// POST /api/admin/bookings/:id/reject
pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;

    let booking = lifecycle::reject(&db, &state.events, &actor, &id)?;
    Ok(Json(BookingResponse::from_booking(&booking, None)))
}

// POST /api/admin/bookings/:id/assign
#[derive(Deserialize)]
pub struct AssignRequest {
    pub worker_id: String,
    pub notes: Option<String>,
}

pub async fn assign_worker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;

    let booking =
        lifecycle::assign_worker(&db, &state.events, &actor, &id, &body.worker_id, body.notes)?;
    let worker_name = queries::get_worker(&db, &body.worker_id)?.map(|w| w.name);
    Ok(Json(BookingResponse::from_booking(&booking, worker_name)))
}

// POST /api/admin/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;

    let booking = lifecycle::complete(&db, &state.events, &actor, &id)?;
    Ok(Json(BookingResponse::from_booking(&booking, None)))
}

// POST /api/admin/workers
#[derive(Deserialize)]
pub struct NewWorkerRequest {
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    pub rating: Option<f64>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub languages: Vec<String>,
    pub age: Option<i64>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub police_verified: bool,
    #[serde(default)]
    pub resident_pass: bool,
}

pub async fn add_worker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewWorkerRequest>,
) -> Result<Json<Worker>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;
    require_admin(&actor)?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let new_worker = Worker {
        id: Uuid::new_v4().to_string(),
        name,
        specialty: body.specialty,
        rating: worker::normalize_rating(body.rating),
        bio: body.bio,
        location: body.location,
        phone: body.phone,
        languages: body.languages,
        age: body.age,
        skills: body.skills,
        police_verified: body.police_verified,
        resident_pass: body.resident_pass,
        created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    queries::create_worker(&db, &new_worker)?;

    Ok(Json(new_worker))
}

// DELETE /api/admin/workers/:id
pub async fn delete_worker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;
    require_admin(&actor)?;

    let removed = queries::delete_worker(&db, &id)?;
    if removed {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("worker not found: {id}")))
    }
}

// GET /api/admin/stats
#[derive(Serialize)]
pub struct StatsResponse {
    pending_count: i64,
    confirmed_count: i64,
    in_progress_count: i64,
    completed_count: i64,
    cancelled_count: i64,
    workers_count: i64,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;
    require_admin(&actor)?;

    let stats = queries::get_dashboard_stats(&db)?;
    Ok(Json(StatsResponse {
        pending_count: stats.pending_count,
        confirmed_count: stats.confirmed_count,
        in_progress_count: stats.in_progress_count,
        completed_count: stats.completed_count,
        cancelled_count: stats.cancelled_count,
        workers_count: stats.workers_count,
    }))
}
