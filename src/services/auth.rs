use axum::http::HeaderMap;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, Role, User};

/// Resolve the caller from a `Authorization: Bearer <api_token>` header.
/// The gate only maps a credential to an actor id and role; role and
/// ownership rules are enforced per-operation in the lifecycle engine.
pub fn authenticate(conn: &Connection, headers: &HeaderMap) -> Result<Actor, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let user = queries::get_user_by_token(conn, token)?;
    match user {
        Some(user) => Ok(Actor {
            id: user.id,
            role: user.role,
        }),
        None => Err(AppError::Unauthorized),
    }
}

pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Create a user, assigning the administrator role only to the designated
/// admin email. Roles are immutable after registration.
pub fn register(
    conn: &Connection,
    admin_email: &str,
    reg: Registration,
) -> Result<User, AppError> {
    let name = reg.name.trim().to_string();
    let email = reg.email.trim().to_lowercase();

    if name.is_empty() || email.is_empty() {
        return Err(AppError::Validation("name and email are required".to_string()));
    }

    if queries::get_user_by_email(conn, &email)?.is_some() {
        return Err(AppError::Conflict(format!("email already registered: {email}")));
    }

    let role = if email == admin_email.to_lowercase() {
        Role::Admin
    } else {
        Role::Customer
    };

    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        phone: reg.phone.trim().to_string(),
        address: reg.address.trim().to_string(),
        role,
        api_token: Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    queries::create_user(conn, &user)?;

    Ok(user)
}
