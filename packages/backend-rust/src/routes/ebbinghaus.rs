use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::response::AppError;
use crate::services::ebbinghaus::{self, CreatePlanInput, ScheduleQuery};
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewRequest {
    total_words: f64,
    words_per_day: f64,
    #[serde(default)]
    review_offsets: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionedRequest {
    total_words: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleParams {
    min_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivateRequest {
    day: u32,
    column: usize,
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/preview", post(preview))
        .route("/plans", post(create_plan))
        .route("/plans/:id", get(get_plan))
        .route("/plans/:id/provisioned", put(update_provisioned))
        .route("/plans/:id/units", get(list_units))
        .route("/plans/:id/schedule", get(get_schedule))
        .route("/plans/:id/units/:unit/learn", post(mark_learned))
        .route(
            "/plans/:id/units/:unit/reviews/:order/complete",
            post(complete_review),
        )
        .route("/plans/:id/cells/activate", post(activate_cell))
}

async fn preview(Json(payload): Json<PreviewRequest>) -> impl IntoResponse {
    ok(ebbinghaus::preview_pacing(
        payload.total_words,
        payload.words_per_day,
        payload.review_offsets.as_deref(),
    ))
}

async fn create_plan(
    State(state): State<AppState>,
    Json(payload): Json<CreatePlanInput>,
) -> Result<impl IntoResponse, AppError> {
    let detail =
        ebbinghaus::create_plan(state.store(), payload, &state.config().review_offsets).await?;
    Ok((StatusCode::CREATED, ok(detail)))
}

async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(ebbinghaus::get_plan(state.store(), &id).await?))
}

async fn update_provisioned(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ProvisionedRequest>,
) -> Result<impl IntoResponse, AppError> {
    let detail =
        ebbinghaus::update_provisioned_words(state.store(), &id, payload.total_words).await?;
    Ok(ok(detail))
}

async fn list_units(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.store().list_units(&id).await?))
}

async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ScheduleParams>,
) -> Result<impl IntoResponse, AppError> {
    let config = state.config();
    let query = ScheduleQuery {
        min_days: params.min_days.or(config.min_display_days),
        policy: config.inference_policy,
    };
    Ok(ok(ebbinghaus::load_schedule(state.store(), &id, &query).await?))
}

async fn mark_learned(
    State(state): State<AppState>,
    Path((id, unit)): Path<(String, u32)>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .store()
        .mark_unit_learned(&id, unit, Utc::now())
        .await?;
    Ok(ok(outcome))
}

async fn complete_review(
    State(state): State<AppState>,
    Path((id, unit, order)): Path<(String, u32, u32)>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .store()
        .complete_review(&id, unit, order, Utc::now())
        .await?;
    Ok(ok(outcome))
}

async fn activate_cell(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ActivateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = ebbinghaus::toggle_cell(
        state.store(),
        &id,
        payload.day,
        payload.column,
        state.config().inference_policy,
    )
    .await?;
    Ok(ok(outcome))
}
