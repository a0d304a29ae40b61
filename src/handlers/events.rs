use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Role;
use crate::state::AppState;

// GET /api/events — SSE stream of lifecycle events for the notification
// collaborator. Auth via query param (EventSource can't set headers).
#[derive(Deserialize)]
pub struct SseQuery {
    pub token: Option<String>,
    pub last_id: Option<i64>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, Response> {
    let token = query.token.as_deref().unwrap_or("");

    let catchup_events = {
        let db = state.db.lock().unwrap();

        let user = queries::get_user_by_token(&db, token)
            .ok()
            .flatten()
            .ok_or_else(|| AppError::Unauthorized.into_response())?;
        if user.role != Role::Admin {
            return Err(
                AppError::NotAuthorized("administrator role required".to_string())
                    .into_response(),
            );
        }

        // Catch up on events missed since the client's last seen id
        let last_id = query.last_id.unwrap_or(0);
        queries::get_events_since(&db, last_id).unwrap_or_default()
    };

    let rx = state.events.subscribe();

    let catchup_stream = tokio_stream::iter(catchup_events.into_iter().map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok::<_, Infallible>(Event::default().data(data).event("lifecycle_event"))
    }));

    let live_stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().data(data).event("lifecycle_event")))
        }
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(_)) => None,
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    let combined = catchup_stream.chain(live_stream);
    let merged = StreamExt::merge(combined, keepalive_stream);

    Ok(Sse::new(merged))
}
