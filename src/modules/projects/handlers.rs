use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{CreateProjectRequest, Project, ProjectWithFreelancer};
use crate::error::{AppJson, AppResult};
use crate::payment::{CheckoutOrder, PaymentConfirmation};
use crate::services::projects::{self, AcceptRequest};
use crate::session::AuthSession;

pub async fn create_project(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    AppJson(request): AppJson<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = projects::create(state.store.as_ref(), &session, request).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<Vec<ProjectWithFreelancer>>> {
    Ok(Json(projects::list_for_user(state.store.as_ref(), &session).await?))
}

pub async fn accept_project(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(project_id): Path<Uuid>,
    AppJson(request): AppJson<AcceptRequest>,
) -> AppResult<Json<Project>> {
    Ok(Json(
        projects::accept(state.store.as_ref(), &session, project_id, request).await?,
    ))
}

pub async fn complete_project(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    Ok(Json(projects::complete(state.store.as_ref(), &session, project_id).await?))
}

pub async fn checkout(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<CheckoutOrder>> {
    let order =
        projects::checkout(state.store.as_ref(), &state.env.payment, &session, project_id).await?;
    Ok(Json(order))
}

pub async fn record_payment(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(project_id): Path<Uuid>,
    AppJson(confirmation): AppJson<PaymentConfirmation>,
) -> AppResult<Json<Project>> {
    Ok(Json(
        projects::record_payment(state.store.as_ref(), &session, project_id, confirmation).await?,
    ))
}
