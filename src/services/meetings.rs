use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::VideoConfig;
use crate::db::{MeetingWithCounterpart, Store, UserRole};
use crate::error::{AppError, AppResult};
use crate::session::Session;
use crate::video::{check_room_access, issue_room_pass, RoomPass};

/// Sessions of the principal: booked by a user, or booked with a mentor.
pub async fn list_sessions(
    store: &dyn Store,
    session: &Session,
) -> AppResult<Vec<MeetingWithCounterpart>> {
    match session.role {
        UserRole::Mentor => Ok(store
            .list_meetings_for_mentor(session.require_mentor()?)
            .await?),
        _ => Ok(store.list_meetings_for_user(session.user_id).await?),
    }
}

#[instrument(skip(store, video, session), fields(user_id = %session.user_id))]
pub async fn join_room(
    store: &dyn Store,
    video: &VideoConfig,
    session: &Session,
    meeting_id: Uuid,
    now: OffsetDateTime,
) -> AppResult<RoomPass> {
    let meeting = store
        .get_meeting(meeting_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meeting {meeting_id} not found")))?;

    let is_participant =
        meeting.user_id == session.user_id || session.mentor_id == Some(meeting.mentor_id);
    if !is_participant {
        return Err(AppError::Authorization(
            "You are not a participant of this meeting".to_string(),
        ));
    }

    check_room_access(&meeting, now).map_err(|e| AppError::Validation(e.to_string()))?;

    let user_name = store
        .get_user(session.user_id)
        .await?
        .and_then(|user| user.name)
        .unwrap_or_else(|| format!("user-{}", session.user_id.simple()));

    let pass = issue_room_pass(video, &meeting, session.user_id, user_name)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    info!(meeting_id = %meeting.id, "Room pass issued");
    Ok(pass)
}
