pub mod chapters;

pub use chapters::ChapterService;
