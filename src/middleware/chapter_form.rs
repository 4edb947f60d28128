use axum::{
    Json,
    extract::{FromRef, FromRequest, Multipart, Request, multipart::Field},
    http::header::CONTENT_TYPE,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ChapterError;
use crate::uploads::{StoredUpload, UploadStore};

/// Multipart field carrying the cover image.
pub const IMAGE_FIELD: &str = "chapter_image";

/// Fields of a create/update request, with the cover image already stored.
///
/// Accepts `multipart/form-data` (the only way to attach an image) or a JSON
/// object. Whoever consumes the form owns `image` and must discard it when
/// the request fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterForm {
    pub chap_id: Option<String>,
    pub course_type: Option<String>,
    pub chapter_name: Option<String>,
    pub image: Option<StoredUpload>,
}

impl ChapterForm {
    fn set_text(&mut self, name: &str, value: String) {
        match name {
            "chap_id" => self.chap_id = Some(value),
            "course_type" => self.course_type = Some(value),
            "chapter_name" => self.chapter_name = Some(value),
            other => debug!(field = other, "ignoring unknown chapter form field"),
        }
    }

    async fn from_multipart(
        mut multipart: Multipart,
        uploads: &UploadStore,
    ) -> Result<Self, ChapterError> {
        let mut form = ChapterForm::default();
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => return form.fail(uploads, ChapterError::Upload(e.body_text())).await,
            };
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == IMAGE_FIELD {
                match store_image(field, uploads).await {
                    Ok(Some(upload)) => {
                        if let Some(previous) = form.image.replace(upload) {
                            uploads.discard(&previous).await;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => return form.fail(uploads, e).await,
                }
                continue;
            }

            match field.text().await {
                Ok(text) => form.set_text(&name, text),
                Err(e) => return form.fail(uploads, ChapterError::Upload(e.body_text())).await,
            }
        }
        Ok(form)
    }

    fn from_json(object: Map<String, Value>) -> Self {
        let mut form = ChapterForm::default();
        for (name, value) in object {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                other => other.to_string(),
            };
            form.set_text(&name, text);
        }
        form
    }

    async fn fail(self, uploads: &UploadStore, err: ChapterError) -> Result<Self, ChapterError> {
        if let Some(image) = &self.image {
            uploads.discard(image).await;
        }
        Err(err)
    }
}

/// Stream one file field to disk. An empty file input yields `None`.
async fn store_image(
    mut field: Field<'_>,
    uploads: &UploadStore,
) -> Result<Option<StoredUpload>, ChapterError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);

    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ChapterError::Upload(e.body_text()))?
    {
        if data.len() + chunk.len() > uploads.max_bytes() {
            return Err(ChapterError::Upload(format!(
                "file exceeds the {} byte limit",
                uploads.max_bytes()
            )));
        }
        data.extend_from_slice(&chunk);
    }

    if original_name.is_empty() && data.is_empty() {
        return Ok(None);
    }
    uploads
        .save(&original_name, content_type.as_deref(), &data)
        .await
        .map(Some)
}

impl<S> FromRequest<S> for ChapterForm
where
    S: Send + Sync,
    UploadStore: FromRef<S>,
{
    type Rejection = ChapterError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(object) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|rejection| ChapterError::Validation(rejection.body_text()))?;
            return Ok(Self::from_json(object));
        }

        let uploads = UploadStore::from_ref(state);
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ChapterError::Upload(rejection.body_text()))?;
        Self::from_multipart(multipart, &uploads).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_are_read_as_text() {
        let Value::Object(object) = json!({
            "chap_id": 3,
            "chapter_name": "Intro",
            "course_type": null,
            "extra": true
        }) else {
            unreachable!()
        };
        let form = ChapterForm::from_json(object);
        assert_eq!(form.chap_id.as_deref(), Some("3"));
        assert_eq!(form.chapter_name.as_deref(), Some("Intro"));
        assert_eq!(form.course_type, None);
        assert_eq!(form.image, None);
    }
}
