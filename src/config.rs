//! Service configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `config.toml` in the working directory
//! 3. Environment variables prefixed with `CHAPTERS_`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

/// Default location of stored chapter images, relative to the working directory.
pub const DEFAULT_UPLOAD_DIR: &str = "resources/static/assets/uploads/chapterImageUpload";

/// Public URL prefix recorded in `chapter_image_url`.
pub const DEFAULT_IMAGE_URL_PREFIX: &str = "/resources/static/assets/uploads/chapterImageUpload";

/// Course selection that expands to every entry of [`BOTH_COURSE_TYPES`].
pub const BOTH_COURSES: &str = "Both";

/// Course types covered by the [`BOTH_COURSES`] selection.
pub const BOTH_COURSE_TYPES: [&str; 2] = ["OS", "AS"];

pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::load);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_image_url_prefix")]
    pub image_url_prefix: String,

    /// Upper bound for a single uploaded image, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// When set, every request must carry this key.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_database_url() -> String {
    "sqlite:chapters.db".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from(DEFAULT_UPLOAD_DIR)
}

fn default_image_url_prefix() -> String {
    DEFAULT_IMAGE_URL_PREFIX.to_string()
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database_url: default_database_url(),
            loglevel: default_loglevel(),
            upload_dir: default_upload_dir(),
            image_url_prefix: default_image_url_prefix(),
            max_upload_bytes: default_max_upload_bytes(),
            api_key: None,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("CHAPTERS_"))
    }

    /// Loads configuration from all sources.
    ///
    /// A malformed source is reported on stderr and the defaults are used;
    /// logging is not initialised yet when this runs.
    pub fn load() -> Self {
        match Self::figment().extract::<Config>() {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("configuration error, using defaults: {e}");
                Config::default()
            }
        }
    }
}
