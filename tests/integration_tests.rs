use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{delete, get, post};
use axum::Router;
use tower::ServiceExt;

use homeserve::config::AppConfig;
use homeserve::db;
use homeserve::handlers;
use homeserve::services::events::EventBus;
use homeserve::state::AppState;

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_email: "admin@example.com".to_string(),
    }
}

fn test_state() -> Arc<AppState> {
    let config = test_config();
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config,
        events: EventBus::new(64),
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/services", get(handlers::catalog::list_services))
        .route("/api/workers", get(handlers::catalog::list_workers))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings", get(handlers::bookings::list_bookings))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route(
            "/api/admin/bookings/:id/accept",
            post(handlers::admin::accept_booking),
        )
        .route(
            "/api/admin/bookings/:id/reject",
            post(handlers::admin::reject_booking),
        )
        .route(
            "/api/admin/bookings/:id/assign",
            post(handlers::admin::assign_worker),
        )
        .route(
            "/api/admin/bookings/:id/complete",
            post(handlers::admin::complete_booking),
        )
        .route("/api/admin/workers", post(handlers::admin::add_worker))
        .route(
            "/api/admin/workers/:id",
            delete(handlers::admin::delete_worker),
        )
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .with_state(state)
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_empty(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a user and return their bearer token.
async fn register(state: &Arc<AppState>, name: &str, email: &str) -> String {
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_json(
            "/api/auth/register",
            None,
            serde_json::json!({"name": name, "email": email, "phone": "+923001234567", "address": "Street 1"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    json["token"].as_str().unwrap().to_string()
}

async fn register_admin(state: &Arc<AppState>) -> String {
    register(state, "Admin", "admin@example.com").await
}

/// Create a valid booking and return its id.
async fn create_booking(state: &Arc<AppState>, token: &str) -> String {
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_json(
            "/api/bookings",
            Some(token),
            serde_json::json!({
                "service": "Deep Cleaning",
                "date": "2024-06-01",
                "time": "10:00",
                "area": "DHA Phase 2",
                "address": "House 1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    json["id"].as_str().unwrap().to_string()
}

/// Add a worker via the admin API and return the worker id.
async fn add_worker(state: &Arc<AppState>, admin_token: &str, name: &str) -> String {
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_json(
            "/api/admin/workers",
            Some(admin_token),
            serde_json::json!({
                "name": name,
                "specialty": "Deep Cleaning Expert",
                "rating": 4.9,
                "location": "DHA Phase 2",
                "languages": ["Urdu", "English"],
                "skills": ["Deep Cleaning"],
                "police_verified": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    json["id"].as_str().unwrap().to_string()
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let app = test_app(state);

    let res = app.oneshot(get_request("/health", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Registration & Access Gate ──

#[tokio::test]
async fn test_register_assigns_roles() {
    let state = test_state();

    let app = test_app(state.clone());
    let res = app
        .oneshot(post_json(
            "/api/auth/register",
            None,
            serde_json::json!({"name": "Admin", "email": "admin@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["role"], "admin");

    let app = test_app(state);
    let res = app
        .oneshot(post_json(
            "/api/auth/register",
            None,
            serde_json::json!({"name": "Alice", "email": "alice@example.com"}),
        ))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json["role"], "customer");
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let state = test_state();
    register(&state, "Alice", "alice@example.com").await;

    let app = test_app(state);
    let res = app
        .oneshot(post_json(
            "/api/auth/register",
            None,
            serde_json::json!({"name": "Alice Again", "email": "alice@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_requests_require_token() {
    let state = test_state();

    let app = test_app(state.clone());
    let res = app.oneshot(get_request("/api/bookings", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let app = test_app(state);
    let res = app
        .oneshot(get_request("/api/bookings", Some("bogus-token")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_endpoints_reject_customers() {
    let state = test_state();
    let customer = register(&state, "Alice", "alice@example.com").await;

    let app = test_app(state.clone());
    let res = app
        .oneshot(get_request("/api/admin/bookings", Some(&customer)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let app = test_app(state);
    let res = app
        .oneshot(get_request("/api/admin/stats", Some(&customer)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_me_returns_profile() {
    let state = test_state();
    let token = register(&state, "Alice", "alice@example.com").await;

    let app = test_app(state);
    let res = app
        .oneshot(get_request("/api/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["name"], "Alice");
    assert_eq!(json["email"], "alice@example.com");
    assert_eq!(json["role"], "customer");
    assert!(json.get("api_token").is_none());
}

// ── Catalog ──

#[tokio::test]
async fn test_services_are_seeded() {
    let state = test_state();
    let token = register(&state, "Alice", "alice@example.com").await;

    let app = test_app(state);
    let res = app
        .oneshot(get_request("/api/services", Some(&token)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    let services = json.as_array().unwrap();
    assert_eq!(services.len(), 5);
    assert!(services.iter().any(|s| s["name"] == "Deep Cleaning"));
}

// ── Booking creation ──

#[tokio::test]
async fn test_create_booking_round_trip() {
    let state = test_state();
    let token = register(&state, "Alice", "alice@example.com").await;
    let booking_id = create_booking(&state, &token).await;

    let app = test_app(state);
    let res = app
        .oneshot(get_request(&format!("/api/bookings/{booking_id}"), Some(&token)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["service"], "Deep Cleaning");
    assert_eq!(json["date"], "2024-06-01");
    assert_eq!(json["time"], "10:00");
    assert_eq!(json["area"], "DHA Phase 2");
    assert_eq!(json["address"], "House 1");
    assert_eq!(json["status"], "pending");
    assert_eq!(json["assigned_worker"], serde_json::Value::Null);
    assert_eq!(json["version"], 1);
}

#[tokio::test]
async fn test_create_booking_validation() {
    let state = test_state();
    let token = register(&state, "Alice", "alice@example.com").await;

    // Missing address
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_json(
            "/api/bookings",
            Some(&token),
            serde_json::json!({"service": "Deep Cleaning", "date": "2024-06-01", "time": "10:00", "area": "DHA Phase 2"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unknown service
    let app = test_app(state);
    let res = app
        .oneshot(post_json(
            "/api/bookings",
            Some(&token),
            serde_json::json!({"service": "Rocket Repair", "date": "2024-06-01", "time": "10:00", "area": "DHA Phase 2", "address": "House 1"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_customer_cannot_read_others_booking() {
    let state = test_state();
    let alice = register(&state, "Alice", "alice@example.com").await;
    let bob = register(&state, "Bob", "bob@example.com").await;
    let booking_id = create_booking(&state, &alice).await;

    let app = test_app(state);
    let res = app
        .oneshot(get_request(&format!("/api/bookings/{booking_id}"), Some(&bob)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

// ── Lifecycle flow ──

#[tokio::test]
async fn test_full_lifecycle_flow() {
    let state = test_state();
    let admin = register_admin(&state).await;
    let customer = register(&state, "Alice", "alice@example.com").await;
    let booking_id = create_booking(&state, &customer).await;
    let worker_id = add_worker(&state, &admin, "Aisha K.").await;

    // Accept
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_empty(
            &format!("/api/admin/bookings/{booking_id}/accept"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "confirmed");

    // Assign
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_json(
            &format!("/api/admin/bookings/{booking_id}/assign"),
            Some(&admin),
            serde_json::json!({"worker_id": worker_id, "notes": "bring supplies"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "in_progress");
    assert_eq!(json["assigned_worker"], worker_id.as_str());
    assert_eq!(json["worker_name"], "Aisha K.");
    assert_eq!(json["notes"], "bring supplies");

    // Complete
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_empty(
            &format!("/api/admin/bookings/{booking_id}/complete"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "completed");

    // Cancelling a completed booking is an illegal transition
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_empty(
            &format!("/api/bookings/{booking_id}/cancel"),
            Some(&customer),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // The booking shows up under the completed filter in the admin listing
    let app = test_app(state);
    let res = app
        .oneshot(get_request(
            "/api/admin/bookings?status=completed",
            Some(&admin),
        ))
        .await
        .unwrap();
    let json = body_json(res).await;
    let listed = json.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], booking_id.as_str());
    assert_eq!(listed[0]["worker_name"], "Aisha K.");
}

#[tokio::test]
async fn test_accept_is_not_repeatable() {
    let state = test_state();
    let admin = register_admin(&state).await;
    let customer = register(&state, "Alice", "alice@example.com").await;
    let booking_id = create_booking(&state, &customer).await;

    let app = test_app(state.clone());
    let res = app
        .oneshot(post_empty(
            &format!("/api/admin/bookings/{booking_id}/accept"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // A second accept acts on a booking that is no longer pending
    let app = test_app(state);
    let res = app
        .oneshot(post_empty(
            &format!("/api/admin/bookings/{booking_id}/accept"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reject_cancels_booking() {
    let state = test_state();
    let admin = register_admin(&state).await;
    let customer = register(&state, "Alice", "alice@example.com").await;
    let booking_id = create_booking(&state, &customer).await;

    let app = test_app(state.clone());
    let res = app
        .oneshot(post_empty(
            &format!("/api/admin/bookings/{booking_id}/reject"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "cancelled");

    // The customer sees it under past bookings
    let app = test_app(state);
    let res = app
        .oneshot(get_request("/api/bookings?scope=past", Some(&customer)))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_by_non_owner_forbidden() {
    let state = test_state();
    let alice = register(&state, "Alice", "alice@example.com").await;
    let bob = register(&state, "Bob", "bob@example.com").await;
    let booking_id = create_booking(&state, &alice).await;

    let app = test_app(state.clone());
    let res = app
        .oneshot(post_empty(
            &format!("/api/bookings/{booking_id}/cancel"),
            Some(&bob),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Status unchanged
    let app = test_app(state);
    let res = app
        .oneshot(get_request(&format!("/api/bookings/{booking_id}"), Some(&alice)))
        .await
        .unwrap();
    let json = body_json(res).await;
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn test_assign_requires_confirmed_and_known_worker() {
    let state = test_state();
    let admin = register_admin(&state).await;
    let customer = register(&state, "Alice", "alice@example.com").await;
    let booking_id = create_booking(&state, &customer).await;
    let worker_id = add_worker(&state, &admin, "Aisha K.").await;

    // Still pending: assignment is an illegal transition
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_json(
            &format!("/api/admin/bookings/{booking_id}/assign"),
            Some(&admin),
            serde_json::json!({"worker_id": worker_id}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Confirmed, but the worker id is unknown
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_empty(
            &format!("/api/admin/bookings/{booking_id}/accept"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let app = test_app(state);
    let res = app
        .oneshot(post_json(
            &format!("/api/admin/bookings/{booking_id}/assign"),
            Some(&admin),
            serde_json::json!({"worker_id": "no-such-worker"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Worker registry ──

#[tokio::test]
async fn test_worker_add_list_delete() {
    let state = test_state();
    let admin = register_admin(&state).await;
    let customer = register(&state, "Alice", "alice@example.com").await;
    let worker_id = add_worker(&state, &admin, "Aisha K.").await;

    // Visible to customers browsing the registry
    let app = test_app(state.clone());
    let res = app
        .oneshot(get_request("/api/workers", Some(&customer)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    let workers = json.as_array().unwrap();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0]["name"], "Aisha K.");
    assert_eq!(workers[0]["police_verified"], true);
    assert_eq!(workers[0]["resident_pass"], false);

    // Customers may not create workers
    let app = test_app(state.clone());
    let res = app
        .oneshot(post_json(
            "/api/admin/workers",
            Some(&customer),
            serde_json::json!({"name": "Intruder"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Delete, then deleting again is a 404
    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/workers/{worker_id}"))
                .header("Authorization", format!("Bearer {admin}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/workers/{worker_id}"))
                .header("Authorization", format!("Bearer {admin}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_worker_rating_clamped() {
    let state = test_state();
    let admin = register_admin(&state).await;

    let app = test_app(state);
    let res = app
        .oneshot(post_json(
            "/api/admin/workers",
            Some(&admin),
            serde_json::json!({"name": "Overrated", "rating": 11.0}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["rating"], 5.0);
}

// ── Stats ──

#[tokio::test]
async fn test_admin_stats() {
    let state = test_state();
    let admin = register_admin(&state).await;
    let customer = register(&state, "Alice", "alice@example.com").await;
    add_worker(&state, &admin, "Aisha K.").await;

    let first = create_booking(&state, &customer).await;
    create_booking(&state, &customer).await;

    let app = test_app(state.clone());
    let res = app
        .oneshot(post_empty(
            &format!("/api/admin/bookings/{first}/accept"),
            Some(&admin),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let app = test_app(state);
    let res = app
        .oneshot(get_request("/api/admin/stats", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["pending_count"], 1);
    assert_eq!(json["confirmed_count"], 1);
    assert_eq!(json["in_progress_count"], 0);
    assert_eq!(json["workers_count"], 1);
}
