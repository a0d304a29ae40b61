use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::services::auth;
use crate::state::AppState;

// POST /api/auth/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    id: String,
    name: String,
    email: String,
    role: String,
    /// Returned exactly once; the client must store it.
    token: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let user = auth::register(
        &db,
        &state.config.admin_email,
        auth::Registration {
            name: body.name,
            email: body.email,
            phone: body.phone,
            address: body.address,
        },
    )?;

    Ok(Json(RegisterResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role.as_str().to_string(),
        token: user.api_token,
    }))
}

// GET /api/auth/me
#[derive(Serialize)]
pub struct MeResponse {
    id: String,
    name: String,
    email: String,
    phone: String,
    address: String,
    role: String,
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = auth::authenticate(&db, &headers)?;

    let user = queries::get_user(&db, &actor.id)?
        .ok_or_else(|| AppError::NotFound(format!("user not found: {}", actor.id)))?;

    Ok(Json(MeResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        phone: user.phone,
        address: user.address,
        role: user.role.as_str().to_string(),
    }))
}
