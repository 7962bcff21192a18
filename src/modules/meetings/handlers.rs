use axum::{
    extract::{Path, State},
    Json,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::MeetingWithCounterpart;
use crate::error::AppResult;
use crate::services::meetings;
use crate::session::AuthSession;
use crate::video::RoomPass;

pub async fn list_sessions(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<Vec<MeetingWithCounterpart>>> {
    Ok(Json(meetings::list_sessions(state.store.as_ref(), &session).await?))
}

pub async fn join_room(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(meeting_id): Path<Uuid>,
) -> AppResult<Json<RoomPass>> {
    let pass = meetings::join_room(
        state.store.as_ref(),
        &state.env.video,
        &session,
        meeting_id,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(pass))
}
