//! Chapter operations.
//!
//! Each operation is one linear pass: validate, run the storage transaction,
//! then settle the image files. Any upload attached to a failed create or
//! update is removed before the error is returned.

use tracing::{info, warn};

use crate::config::{BOTH_COURSE_TYPES, BOTH_COURSES};
use crate::db::{Chapter, ChapterChanges, ChapterStorage, CreateOutcome, NewChapter, UpdateOutcome};
use crate::error::ChapterError;
use crate::middleware::ChapterForm;
use crate::uploads::{StoredUpload, UploadStore};

#[derive(Clone)]
pub struct ChapterService {
    storage: ChapterStorage,
    uploads: UploadStore,
}

impl ChapterService {
    pub fn new(storage: ChapterStorage, uploads: UploadStore) -> Self {
        Self { storage, uploads }
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Insert a new chapter and return its id.
    pub async fn create(&self, form: ChapterForm) -> Result<i64, ChapterError> {
        let result = self.try_create(&form).await;
        self.settle_upload(form.image.as_ref(), &result).await;
        result
    }

    /// Apply the form to an existing chapter and return the stored row.
    pub async fn update(&self, form: ChapterForm) -> Result<Chapter, ChapterError> {
        let result = self.try_update(&form).await;
        self.settle_upload(form.image.as_ref(), &result).await;
        result
    }

    /// Remove a chapter and its image. A missing id is not an error.
    pub async fn delete(&self, chap_id: i64) -> Result<Option<Chapter>, ChapterError> {
        let removed = self.storage.delete(chap_id).await?;
        match &removed {
            Some(chapter) => {
                if let Some(url) = chapter.image_url() {
                    self.uploads.discard_url(url).await;
                }
                info!(chap_id, "chapter deleted");
            }
            None => info!(chap_id, "delete requested for unknown chapter"),
        }
        Ok(removed)
    }

    /// Chapters visible for `selected_course`; [`BOTH_COURSES`] covers every
    /// type in [`BOTH_COURSE_TYPES`].
    pub async fn list(&self, selected_course: &str) -> Result<Vec<Chapter>, ChapterError> {
        if selected_course == BOTH_COURSES {
            self.storage.list_by_course_types(&BOTH_COURSE_TYPES).await
        } else {
            self.storage.list_by_course_types(&[selected_course]).await
        }
    }

    pub async fn get(&self, chap_id: i64) -> Result<Option<Chapter>, ChapterError> {
        self.storage.get_by_id(chap_id).await
    }

    async fn try_create(&self, form: &ChapterForm) -> Result<i64, ChapterError> {
        let chapter_name = non_blank(form.chapter_name.as_deref())
            .ok_or_else(|| ChapterError::Validation("Chapter name is required".to_string()))?;

        let chapter = NewChapter {
            course_type: non_blank(form.course_type.as_deref()),
            chapter_name,
            chapter_image_url: form
                .image
                .as_ref()
                .map(|image| image.url.clone())
                .unwrap_or_default(),
        };

        match self.storage.create(&chapter).await? {
            CreateOutcome::Created(chap_id) => {
                info!(chap_id, chapter_name = %chapter.chapter_name, "chapter created");
                Ok(chap_id)
            }
            CreateOutcome::NameTaken => {
                Err(ChapterError::Conflict("Chapter already exists".to_string()))
            }
            CreateOutcome::NotInserted => {
                Err(ChapterError::Persistence("Could not add chapter".to_string()))
            }
        }
    }

    async fn try_update(&self, form: &ChapterForm) -> Result<Chapter, ChapterError> {
        let chap_id = form
            .chap_id
            .as_deref()
            .and_then(|id| id.trim().parse::<i64>().ok())
            .ok_or_else(|| ChapterError::Validation("Chapter id is required".to_string()))?;

        let chapter_name = match form.chapter_name.as_deref() {
            None => None,
            Some(name) => Some(non_blank(Some(name)).ok_or_else(|| {
                ChapterError::Validation("Chapter name cannot be empty".to_string())
            })?),
        };

        let changes = ChapterChanges {
            course_type: non_blank(form.course_type.as_deref()),
            chapter_name,
            chapter_image_url: form.image.as_ref().map(|image| image.url.clone()),
        };

        match self.storage.update(chap_id, changes).await? {
            UpdateOutcome::Updated { previous, current } => {
                if form.image.is_some()
                    && let Some(old_url) = previous.image_url()
                    && old_url != current.chapter_image_url
                {
                    self.uploads.discard_url(old_url).await;
                }
                info!(chap_id, "chapter updated");
                Ok(current)
            }
            UpdateOutcome::Missing => {
                Err(ChapterError::NotFound("Chapter does not exist".to_string()))
            }
            UpdateOutcome::NotUpdated => {
                Err(ChapterError::Persistence("Could not update chapter".to_string()))
            }
        }
    }

    async fn settle_upload<T>(
        &self,
        image: Option<&StoredUpload>,
        result: &Result<T, ChapterError>,
    ) {
        if let (Some(image), Err(e)) = (image, result) {
            warn!(path = %image.path.display(), error = %e, "discarding upload of failed request");
            self.uploads.discard(image).await;
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blank_trims_and_drops_empty() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("")), None);
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(Some(" Intro ")), Some("Intro".to_string()));
    }
}
