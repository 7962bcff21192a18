use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    accept_project, checkout, complete_project, create_project, list_projects, record_payment,
};
use crate::app_state::AppState;

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/{id}/accept", post(accept_project))
        .route("/{id}/complete", post(complete_project))
        .route("/{id}/checkout", post(checkout))
        .route("/{id}/payment", post(record_payment))
}
