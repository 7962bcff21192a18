use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    add_skill, get_freelancer, get_own_profile, list_freelancers, open_requests, update_own_profile,
};
use crate::app_state::AppState;

pub fn freelancer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_freelancers))
        .route("/me", get(get_own_profile).patch(update_own_profile))
        .route("/me/skills", post(add_skill))
        .route("/me/requests", get(open_requests))
        .route("/{id}", get(get_freelancer))
}
