use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::question_dto::{BulkImportRequest, QuestionFilter, QuestionPayload};
use crate::AppState;

#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Query(filter): Query<QuestionFilter>,
) -> crate::error::Result<Response> {
    let questions = state.question_service.list_questions(filter).await?;
    Ok(Json(questions).into_response())
}

#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<QuestionPayload>,
) -> crate::error::Result<Response> {
    let question = state.question_service.create_question(payload).await?;
    Ok((StatusCode::CREATED, Json(question)).into_response())
}

#[axum::debug_handler]
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let question = state.question_service.get_question(id).await?;
    Ok(Json(question).into_response())
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionPayload>,
) -> crate::error::Result<Response> {
    let question = state.question_service.update_question(id, payload).await?;
    Ok(Json(question).into_response())
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    state.question_service.delete_question(id).await?;
    Ok(Json(json!({ "message": "Question deleted successfully" })).into_response())
}

#[axum::debug_handler]
pub async fn bulk_import(
    State(state): State<AppState>,
    Json(req): Json<BulkImportRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let result = state.question_service.bulk_import(req.questions).await?;

    tracing::info!(
        successful = result.successful,
        failed = result.failed,
        "bulk question import finished"
    );

    Ok(Json(result).into_response())
}
