use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/goals", get(handlers::list_goals).post(handlers::create_goal))
        .route("/api/goals/:id", delete(handlers::delete_goal))
        .route("/api/view", get(handlers::get_view))
        .route("/api/view/select", post(handlers::select_goal))
        .route("/api/view/deselect", post(handlers::deselect))
        .route("/api/view/granularity", post(handlers::switch_granularity))
        .route("/api/view/navigate", post(handlers::navigate))
        .route("/api/view/today", post(handlers::navigate_today))
        .route("/api/view/toggle", post(handlers::toggle_day))
        .route("/api/view/retry", post(handlers::retry_toggle))
        .with_state(state)
}
