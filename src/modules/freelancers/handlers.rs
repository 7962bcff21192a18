use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{Freelancer, NewSkill, Project, UpdateFreelancerProfile};
use crate::error::{AppJson, AppResult};
use crate::services::freelancers;
use crate::session::AuthSession;

pub async fn list_freelancers(State(state): State<AppState>) -> AppResult<Json<Vec<Freelancer>>> {
    Ok(Json(freelancers::list(state.store.as_ref()).await?))
}

pub async fn get_freelancer(
    State(state): State<AppState>,
    Path(freelancer_id): Path<Uuid>,
) -> AppResult<Json<Freelancer>> {
    Ok(Json(freelancers::get(state.store.as_ref(), freelancer_id).await?))
}

pub async fn get_own_profile(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<Freelancer>> {
    let freelancer_id = session.require_freelancer()?;
    Ok(Json(freelancers::get(state.store.as_ref(), freelancer_id).await?))
}

pub async fn update_own_profile(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    AppJson(update): AppJson<UpdateFreelancerProfile>,
) -> AppResult<Json<Freelancer>> {
    let freelancer_id = session.require_freelancer()?;
    Ok(Json(freelancers::update_own(state.store.as_ref(), freelancer_id, update).await?))
}

pub async fn add_skill(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    AppJson(skill): AppJson<NewSkill>,
) -> AppResult<Json<Freelancer>> {
    let freelancer_id = session.require_freelancer()?;
    Ok(Json(freelancers::add_skill(state.store.as_ref(), freelancer_id, skill).await?))
}

pub async fn open_requests(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<Vec<Project>>> {
    let freelancer_id = session.require_freelancer()?;
    Ok(Json(freelancers::open_requests(state.store.as_ref(), freelancer_id).await?))
}
