use axum::{extract::State, http::StatusCode, Json};

use crate::app_state::AppState;
use crate::db::User;
use crate::error::{AppJson, AppResult};
use crate::services::accounts::{self, LoginRequest, LoginResponse, Principal, RegisterRequest};
use crate::session::AuthSession;

pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = accounts::register(state.store.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = accounts::login(state.store.as_ref(), &state.sessions, request).await?;
    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> StatusCode {
    state.sessions.revoke(&session.token).await;
    StatusCode::NO_CONTENT
}

pub async fn me(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<Principal>> {
    Ok(Json(accounts::current_principal(state.store.as_ref(), &session).await?))
}
