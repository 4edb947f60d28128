pub mod request;
pub mod response;

pub use request::{ChapterIdValue, DeleteChapterRequest};
pub use response::ApiMessage;
