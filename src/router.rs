use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::get,
};

use crate::handlers::chapters::{
    create_chapter, delete_chapter, get_chapter, health, list_chapters, update_chapter,
};
use crate::middleware::{ApiKey, RequireKeyAuth, course_context};
use crate::service::ChapterService;
use crate::uploads::UploadStore;

/// Room for the non-file multipart fields on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct ChapterState {
    pub service: ChapterService,
    pub api_key: ApiKey,
}

impl ChapterState {
    pub fn new(service: ChapterService, api_key: ApiKey) -> Self {
        Self { service, api_key }
    }
}

impl FromRef<ChapterState> for UploadStore {
    fn from_ref(state: &ChapterState) -> Self {
        state.service.uploads().clone()
    }
}

impl FromRef<ChapterState> for ApiKey {
    fn from_ref(state: &ChapterState) -> Self {
        state.api_key.clone()
    }
}

pub fn chapter_router(state: ChapterState) -> Router {
    let body_limit = state.service.uploads().max_bytes() + FORM_OVERHEAD_BYTES;

    let chapters = Router::new()
        .route(
            "/chapters",
            get(list_chapters)
                .post(create_chapter)
                .put(update_chapter)
                .delete(delete_chapter),
        )
        .route("/chapters/{chap_id}", get(get_chapter))
        .route_layer(middleware::from_extractor_with_state::<RequireKeyAuth, _>(
            state.clone(),
        ))
        .layer(middleware::from_fn(course_context))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(health))
        .merge(chapters)
        .with_state(state)
}
