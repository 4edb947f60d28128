pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;
pub mod uploads;

pub use error::ChapterError;
pub use service::ChapterService;
