use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, FromRow)]
pub struct Chapter {
    pub chap_id: i64,
    pub course_type: Option<String>,
    pub chapter_name: String,
    /// Public URL of the cover image, empty when the chapter has none.
    pub chapter_image_url: String,
}

impl Chapter {
    pub fn image_url(&self) -> Option<&str> {
        (!self.chapter_image_url.is_empty()).then_some(self.chapter_image_url.as_str())
    }
}

/// Row to insert; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChapter {
    pub course_type: Option<String>,
    pub chapter_name: String,
    pub chapter_image_url: String,
}

/// Partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterChanges {
    pub course_type: Option<String>,
    pub chapter_name: Option<String>,
    pub chapter_image_url: Option<String>,
}

impl ChapterChanges {
    pub fn apply_to(self, current: &Chapter) -> Chapter {
        Chapter {
            chap_id: current.chap_id,
            course_type: self.course_type.or_else(|| current.course_type.clone()),
            chapter_name: self
                .chapter_name
                .unwrap_or_else(|| current.chapter_name.clone()),
            chapter_image_url: self
                .chapter_image_url
                .unwrap_or_else(|| current.chapter_image_url.clone()),
        }
    }
}
