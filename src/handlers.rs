use crate::date_range::DayKey;
use crate::errors::AppError;
use crate::models::{
    CreateGoalRequest, CreateGoalResponse, Goal, GoalId, GranularityRequest, NavigateRequest,
    SelectGoalRequest, ToggleRequest,
};
use crate::state::AppState;
use crate::storage::GoalRepository;
use crate::view::ViewSnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

pub async fn list_goals(State(state): State<AppState>) -> Result<Json<Vec<Goal>>, AppError> {
    Ok(Json(state.store.list_goals().await?))
}

pub async fn create_goal(
    State(state): State<AppState>,
    Json(payload): Json<CreateGoalRequest>,
) -> Result<Json<CreateGoalResponse>, AppError> {
    let id = state.store.create_goal(&payload.text).await?;
    Ok(Json(CreateGoalResponse { id }))
}

pub async fn delete_goal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = GoalId::from(id);
    let mut view = state.view.lock().await;
    state.store.delete_goal(&id).await?;
    if view.state().selected_goal.as_ref() == Some(&id) {
        view.deselect();
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_view(State(state): State<AppState>) -> Json<ViewSnapshot> {
    let view = state.view.lock().await;
    Json(view.snapshot())
}

pub async fn select_goal(
    State(state): State<AppState>,
    Json(payload): Json<SelectGoalRequest>,
) -> Result<Json<ViewSnapshot>, AppError> {
    let mut view = state.view.lock().await;
    view.select_goal(&payload.goal_id).await?;
    Ok(Json(view.snapshot()))
}

pub async fn deselect(State(state): State<AppState>) -> Json<ViewSnapshot> {
    let mut view = state.view.lock().await;
    view.deselect();
    Json(view.snapshot())
}

pub async fn switch_granularity(
    State(state): State<AppState>,
    Json(payload): Json<GranularityRequest>,
) -> Result<Json<ViewSnapshot>, AppError> {
    let mut view = state.view.lock().await;
    view.switch_granularity(payload.granularity).await?;
    Ok(Json(view.snapshot()))
}

pub async fn navigate(
    State(state): State<AppState>,
    Json(payload): Json<NavigateRequest>,
) -> Result<Json<ViewSnapshot>, AppError> {
    let mut view = state.view.lock().await;
    view.navigate(payload.direction).await?;
    Ok(Json(view.snapshot()))
}

pub async fn navigate_today(State(state): State<AppState>) -> Result<Json<ViewSnapshot>, AppError> {
    let mut view = state.view.lock().await;
    view.navigate_today().await?;
    Ok(Json(view.snapshot()))
}

pub async fn toggle_day(
    State(state): State<AppState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<ViewSnapshot>, AppError> {
    let day = DayKey::parse(&payload.date)?;
    let mut view = state.view.lock().await;
    view.toggle_day(day).await?;
    Ok(Json(view.snapshot()))
}

pub async fn retry_toggle(State(state): State<AppState>) -> Result<Json<ViewSnapshot>, AppError> {
    let mut view = state.view.lock().await;
    if view.retry_toggle().await?.is_none() {
        return Err(AppError::bad_request("no failed toggle to retry"));
    }
    Ok(Json(view.snapshot()))
}
