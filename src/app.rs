use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/calendar", get(handlers::calendar))
        .route("/predictions", get(handlers::predictions))
        .route("/races/:date/:page", get(handlers::race_page))
        .route("/api/calendar", get(handlers::get_calendar))
        .route(
            "/api/racedays",
            get(handlers::get_race_days).post(handlers::add_race_day),
        )
        .with_state(state)
}
