use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use crate::db::Chapter;
use crate::error::ChapterError;
use crate::middleware::{ChapterForm, SelectedCourse};
use crate::router::ChapterState;
use crate::types::{ApiMessage, DeleteChapterRequest};

/// POST /chapters -> create a chapter, optionally with a cover image.
pub async fn create_chapter(
    State(state): State<ChapterState>,
    form: ChapterForm,
) -> Result<Json<ApiMessage>, ChapterError> {
    state.service.create(form).await?;
    Ok(Json(ApiMessage::message("Chapter added successfully")))
}

/// PUT /chapters -> update fields and optionally replace the cover image.
pub async fn update_chapter(
    State(state): State<ChapterState>,
    form: ChapterForm,
) -> Result<Json<ApiMessage>, ChapterError> {
    state.service.update(form).await?;
    Ok(Json(ApiMessage::message("Chapter updated successfully")))
}

/// DELETE /chapters -> remove a chapter and its cover image.
pub async fn delete_chapter(
    State(state): State<ChapterState>,
    body: Result<Json<DeleteChapterRequest>, JsonRejection>,
) -> Result<Json<ApiMessage>, ChapterError> {
    let Json(body) =
        body.map_err(|rejection| ChapterError::Validation(rejection.body_text()))?;
    let chap_id = body
        .chap_id
        .and_then(|id| id.parse())
        .ok_or_else(|| ChapterError::Validation("Chapter id is required".to_string()))?;
    state.service.delete(chap_id).await?;
    Ok(Json(ApiMessage::message("Chapter deleted successfully")))
}

/// GET /chapters -> chapters of the caller's selected course.
pub async fn list_chapters(
    State(state): State<ChapterState>,
    SelectedCourse(course): SelectedCourse,
) -> Result<Json<ApiMessage<Vec<Chapter>>>, ChapterError> {
    let chapters = state.service.list(&course).await?;
    Ok(Json(ApiMessage::with_data(
        "Chapters retrieved successfully",
        Some(chapters),
    )))
}

/// GET /chapters/{chap_id} -> one chapter; `data` is omitted when none matches.
pub async fn get_chapter(
    State(state): State<ChapterState>,
    Path(chap_id): Path<i64>,
) -> Result<Json<ApiMessage<Chapter>>, ChapterError> {
    let chapter = state.service.get(chap_id).await?;
    Ok(Json(ApiMessage::with_data(
        "Chapter retrieved successfully",
        chapter,
    )))
}

pub async fn health() -> Json<ApiMessage> {
    Json(ApiMessage::message("ok"))
}
