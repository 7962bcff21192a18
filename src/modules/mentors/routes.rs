use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    book_session, get_mentor, get_own_availability, get_own_profile, list_mentors, save_day,
    toggle_slot, update_own_profile,
};
use crate::app_state::AppState;

pub fn mentor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_mentors))
        .route("/me", get(get_own_profile).patch(update_own_profile))
        .route("/me/availability", get(get_own_availability))
        .route("/me/availability/{date}", put(save_day))
        .route("/me/availability/{date}/{interval}/toggle", post(toggle_slot))
        .route("/{id}", get(get_mentor))
        .route("/{id}/bookings", post(book_session))
}
