//! Filesystem storage for post images.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use uuid::Uuid;

use crate::application::posts::UploadStore;

use super::error::InfraError;

/// Media files live under a configured root; posts record paths relative to
/// it, like `posts/<id>-photo.png`.
#[derive(Clone)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn ensure_root(&self) -> Result<(), InfraError> {
        fs::create_dir_all(self.root.join("posts")).await?;
        Ok(())
    }

    /// Map a relative media path to a path under the root. Rejects anything
    /// with parent-directory or absolute components.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        if !relative
            .components()
            .all(|part| matches!(part, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Read a stored file and guess its content type from the extension.
    pub async fn read(&self, relative: &str) -> Result<Option<(Bytes, String)>, InfraError> {
        let Some(path) = self.resolve(relative) else {
            return Ok(None);
        };
        match fs::read(&path).await {
            Ok(contents) => {
                let content_type = mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .to_string();
                Ok(Some((Bytes::from(contents), content_type)))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = Path::new(name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl UploadStore for UploadStorage {
    async fn store(&self, filename: &str, bytes: Bytes) -> Result<String, String> {
        let relative = format!(
            "posts/{}-{}",
            Uuid::new_v4().simple(),
            sanitize_filename(filename)
        );
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| err.to_string())?;
        }
        fs::write(&path, &bytes)
            .await
            .map_err(|err| err.to_string())?;
        Ok(relative)
    }
}
