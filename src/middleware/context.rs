use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ChapterError;

/// Header read by [`course_context`] when no outer layer set the course.
pub const SELECTED_COURSE_HEADER: &str = "x-selected-course";

/// The caller's selected course, carried as a request extension.
///
/// Normally inserted by the session/auth layer in front of this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedCourse(pub String);

impl<S> FromRequestParts<S> for SelectedCourse
where
    S: Send + Sync,
{
    type Rejection = ChapterError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SelectedCourse>()
            .cloned()
            .ok_or_else(|| ChapterError::Context("selected course not set".to_string()))
    }
}

/// Populate [`SelectedCourse`] from [`SELECTED_COURSE_HEADER`] unless already present.
pub async fn course_context(mut req: Request, next: Next) -> Response {
    if req.extensions().get::<SelectedCourse>().is_none() {
        let course = req
            .headers()
            .get(SELECTED_COURSE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        if let Some(course) = course {
            req.extensions_mut().insert(SelectedCourse(course));
        }
    }
    next.run(req).await
}
