//! SQL DDL for initializing the chapter storage.

/// SQLite schema with:
/// - `chap_id` INTEGER PRIMARY KEY AUTOINCREMENT
/// - `chapter_name` UNIQUE, the backstop for concurrent creates
/// - `chapter_image_url` empty string when no image is attached
/// - index on `course_type` for the per-course listing
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS chapters (
    chap_id INTEGER PRIMARY KEY AUTOINCREMENT,
    course_type TEXT NULL,
    chapter_name TEXT NOT NULL UNIQUE,
    chapter_image_url TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_chapters_course_type ON chapters(course_type);
"#;
