//! Local storage for chapter cover images.
//!
//! Files live flat in one directory:
//! ```text
//! {upload_dir}/
//!   {unix_seconds}-{original_file_name}
//! ```
//! and are referenced from the database through `{url_prefix}/{file_name}`.

use crate::error::ChapterError;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// How many `-{n}` variants are tried when a stored name is already taken.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// An image written to the upload directory for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub file_name: String,
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>, max_bytes: usize) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_string();
        Self {
            dir: dir.into(),
            url_prefix,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub async fn ensure_dir(&self) -> Result<(), ChapterError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix, file_name)
    }

    /// Map a stored image URL back onto the upload directory.
    ///
    /// Only URLs under the prefix whose remainder is one plain file name resolve.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let rest = url.strip_prefix(&self.url_prefix)?.strip_prefix('/')?;
        let mut components = Path::new(rest).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(self.dir.join(name)),
            _ => None,
        }
    }

    /// Write `data` under `{unix_seconds}-{original_name}`.
    pub async fn save(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<StoredUpload, ChapterError> {
        if !content_type.is_some_and(is_image) {
            return Err(ChapterError::Upload("only image files are allowed".to_string()));
        }
        if data.len() > self.max_bytes {
            return Err(ChapterError::Upload(format!(
                "file exceeds the {} byte limit",
                self.max_bytes
            )));
        }
        let base = base_name(original_name)
            .ok_or_else(|| ChapterError::Upload("missing file name".to_string()))?;

        self.ensure_dir().await?;
        let stamp = chrono::Utc::now().timestamp();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = stored_name(stamp, attempt, base);
            let path = self.dir.join(&file_name);
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            if let Err(e) = write_all(&mut file, data).await {
                drop(file);
                self.discard_path(&path).await;
                return Err(e.into());
            }
            debug!(path = %path.display(), bytes = data.len(), "stored chapter image");
            return Ok(StoredUpload {
                url: self.url_for(&file_name),
                file_name,
                path,
            });
        }

        Err(ChapterError::Upload(format!("no free file name for {base}")))
    }

    /// Best-effort removal of a file stored for the current request.
    pub async fn discard(&self, upload: &StoredUpload) {
        self.discard_path(&upload.path).await;
    }

    /// Best-effort removal of the file behind a stored image URL.
    ///
    /// URLs that do not resolve into the upload directory are ignored.
    pub async fn discard_url(&self, url: &str) {
        match self.resolve(url) {
            Some(path) => self.discard_path(&path).await,
            None => debug!(url, "image url outside upload directory; nothing to remove"),
        }
    }

    async fn discard_path(&self, path: &Path) {
        if let Err(e) = remove_file(path).await {
            warn!(path = %path.display(), error = %e, "failed to delete chapter image");
        }
    }
}

/// Remove `path`. A missing file is not an error and yields `Ok(false)`.
pub async fn remove_file(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "image already gone");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

async fn write_all(file: &mut fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

fn is_image(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

/// Final path component of a client-supplied file name.
fn base_name(original: &str) -> Option<&str> {
    original
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

fn stored_name(stamp: i64, attempt: u32, base: &str) -> String {
    if attempt == 0 {
        format!("{stamp}-{base}")
    } else {
        format!("{stamp}-{attempt}-{base}")
    }
}
