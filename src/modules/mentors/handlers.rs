use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{Mentor, MentorWithUser, UpdateMentorProfile};
use crate::domain::AvailabilityMap;
use crate::error::{AppJson, AppResult};
use crate::services::booking::{self, BookingOutcome};
use crate::services::mentors::{self, DayEdit, MentorDetail, ToggleOutcome};
use crate::session::{AuthSession, MaybeSession};

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub date: Option<String>,
    pub interval: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub availability: AvailabilityMap,
    /// Send back as `read_at` when saving a day.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub async fn list_mentors(State(state): State<AppState>) -> AppResult<Json<Vec<MentorWithUser>>> {
    Ok(Json(mentors::list(state.store.as_ref()).await?))
}

pub async fn get_mentor(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
) -> AppResult<Json<MentorDetail>> {
    let detail = mentors::detail(state.store.as_ref(), mentor_id, OffsetDateTime::now_utc()).await?;
    Ok(Json(detail))
}

/// Anonymous callers reach the workflow too; it answers with an auth error
/// only after the selection itself has been checked.
pub async fn book_session(
    State(state): State<AppState>,
    Path(mentor_id): Path<Uuid>,
    MaybeSession(session): MaybeSession,
    AppJson(request): AppJson<BookingRequest>,
) -> AppResult<(StatusCode, Json<BookingOutcome>)> {
    let outcome = booking::book(
        state.store.as_ref(),
        mentor_id,
        request.date.as_deref(),
        request.interval.as_deref(),
        session.as_ref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn get_own_profile(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<Mentor>> {
    let mentor_id = session.require_mentor()?;
    Ok(Json(mentors::own(state.store.as_ref(), mentor_id).await?))
}

pub async fn update_own_profile(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    AppJson(profile): AppJson<UpdateMentorProfile>,
) -> AppResult<Json<Mentor>> {
    let mentor_id = session.require_mentor()?;
    Ok(Json(mentors::update_profile(state.store.as_ref(), mentor_id, profile).await?))
}

pub async fn get_own_availability(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<AvailabilityResponse>> {
    let mentor = mentors::own(state.store.as_ref(), session.require_mentor()?).await?;
    Ok(Json(AvailabilityResponse {
        availability: mentor.availability,
        updated_at: mentor.updated_at,
    }))
}

pub async fn save_day(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(date): Path<String>,
    AppJson(edit): AppJson<DayEdit>,
) -> AppResult<Json<Mentor>> {
    let mentor_id = session.require_mentor()?;
    let mentor = mentors::save_day(
        state.store.as_ref(),
        mentor_id,
        &date,
        edit,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(mentor))
}

pub async fn toggle_slot(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path((date, interval)): Path<(String, String)>,
) -> AppResult<Json<ToggleOutcome>> {
    let mentor_id = session.require_mentor()?;
    let outcome = mentors::toggle(
        state.store.as_ref(),
        mentor_id,
        &date,
        &interval,
        OffsetDateTime::now_utc(),
    )
    .await?;
    Ok(Json(outcome))
}
