use axum::{routing::get, Router};

use super::handlers::{join_room, list_sessions};
use crate::app_state::AppState;

pub fn meeting_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions))
        .route("/{id}/room", get(join_room))
}
