//! Filesystem store for uploaded images.
//!
//! Files live in one of two directories under the upload root, named
//! `{username}_{10 hex}.{ext}`. The database only keeps the bare filename.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::AppError;

/// Image types accepted for profile pictures and post attachments.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// How many fresh names to try before giving up on a collision streak.
const MAX_NAME_ATTEMPTS: usize = 8;

/// Which upload directory a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDir {
    Profiles,
    Posts,
}

impl UploadDir {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadDir::Profiles => "profiles",
            UploadDir::Posts => "posts",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens the store rooted at `root`, creating both upload directories.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        for dir in [UploadDir::Profiles, UploadDir::Posts] {
            std::fs::create_dir_all(root.join(dir.as_str()))?;
        }
        tracing::info!(root = %root.display(), "file store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, dir: UploadDir) -> PathBuf {
        self.root.join(dir.as_str())
    }

    pub fn path_of(&self, dir: UploadDir, filename: &str) -> PathBuf {
        self.dir(dir).join(filename)
    }

    /// Saves an upload under a freshly generated name.
    ///
    /// Returns `Ok(None)` when the original filename has no allowed extension;
    /// the caller skips such files.
    pub async fn store(
        &self,
        dir: UploadDir,
        username: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<Option<String>, AppError> {
        let Some(ext) = allowed_extension(original_name) else {
            tracing::debug!(original_name, "skipping upload with disallowed extension");
            return Ok(None);
        };

        for _ in 0..MAX_NAME_ATTEMPTS {
            let filename = generate_filename(username, &ext);
            let path = self.path_of(dir, &filename);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = file.write_all(bytes).await {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e.into());
            }
            file.flush().await?;

            tracing::info!(dir = dir.as_str(), %filename, size = bytes.len(), "stored upload");
            return Ok(Some(filename));
        }

        Err(AppError::InternalServerError(format!(
            "could not find a free filename in {} after {} attempts",
            dir.as_str(),
            MAX_NAME_ATTEMPTS
        )))
    }

    /// Removes a stored file. A file that is already gone is not an error.
    pub async fn delete(&self, dir: UploadDir, filename: &str) -> Result<(), AppError> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
            return Err(AppError::BadRequest(format!("Invalid filename '{}'", filename)));
        }

        match tokio::fs::remove_file(self.path_of(dir, filename)).await {
            Ok(()) => {
                tracing::info!(dir = dir.as_str(), filename, "deleted upload");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(dir = dir.as_str(), filename, "upload already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Returns the lower-cased extension if it is on the allow-list.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn generate_filename(username: &str, ext: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}.{}", username, &suffix[..10], ext)
}
