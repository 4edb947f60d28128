pub mod auth;
pub mod chapter_form;
pub mod context;

pub use auth::{ApiKey, RequireKeyAuth};
pub use chapter_form::{ChapterForm, IMAGE_FIELD};
pub use context::{SELECTED_COURSE_HEADER, SelectedCourse, course_context};
