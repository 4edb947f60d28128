//! Database module: chapter model, schema and storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `sqlite.rs`: pool construction and the `ChapterStorage` queries

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{Chapter, ChapterChanges, NewChapter};
pub use schema::SQLITE_INIT;
pub use sqlite::{ChapterStorage, CreateOutcome, SqlitePool, UpdateOutcome, connect};
