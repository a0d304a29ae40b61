use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Service, Worker};
use crate::services::auth;
use crate::state::AppState;

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Service>>, AppError> {
    let db = state.db.lock().unwrap();
    auth::authenticate(&db, &headers)?;

    let services = queries::list_services(&db)?;
    Ok(Json(services))
}

// GET /api/workers
pub async fn list_workers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Worker>>, AppError> {
    let db = state.db.lock().unwrap();
    auth::authenticate(&db, &headers)?;

    let workers = queries::list_workers(&db)?;
    Ok(Json(workers))
}
