use axum::{extract::State, http::StatusCode, middleware, routing::get, Json, Router};
use serde_json::json;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tower_http::cors::CorsLayer;

use crate::{
    app_state::AppState,
    middleware::tracing::observability_middleware,
    modules::{
        auth::routes::auth_routes, freelancers::routes::freelancer_routes,
        meetings::routes::meeting_routes, mentors::routes::mentor_routes,
        projects::routes::project_routes,
    },
};

pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .nest("/auth", auth_routes())
        .nest("/mentors", mentor_routes())
        .nest("/meetings", meeting_routes())
        .nest("/freelancers", freelancer_routes())
        .nest("/projects", project_routes());

    if let Some(static_dir) = &state.env.app.static_dir {
        router = router.nest_service("/static", tower_http::services::ServeDir::new(static_dir));
    }
    if !state.env.is_production() {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(middleware::from_fn(observability_middleware))
        .with_state(state)
}

async fn hello(State(state): State<AppState>) -> String {
    format!("{} backend says hello!\n", state.env.app.name)
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let (status, store_status) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    (
        status,
        Json(json!({
            "status": if status.is_success() { "ok" } else { "degraded" },
            "timestamp": timestamp,
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.env.app.environment.as_str(),
            "services": {
                "store": store_status,
                "sessions": state.sessions.len().await,
            }
        })),
    )
}
