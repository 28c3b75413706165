use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::database::StoreError;
use crate::services::MarketError;

/// URL prefix under which stored images are served
pub const PUBLIC_PREFIX: &str = "/uploads";

const MAX_NAME_CHARS: usize = 100;

/// Writes uploaded image bytes under one directory and hands back the public path.
#[derive(Debug, Clone)]
pub struct ImageStore {
    base_path: PathBuf,
    max_size: usize,
}

impl ImageStore {
    pub async fn new(base_path: impl Into<PathBuf>, max_size: usize) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| StoreError::unavailable(None, format!("create {}", base_path.display()), e))?;

        info!(path = %base_path.display(), "Image store initialized");
        Ok(Self { base_path, max_size })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Store one image and return its public path, `/uploads/<millis>-<name>`
    pub async fn store(&self, original_name: &str, data: &[u8]) -> Result<String, MarketError> {
        if data.is_empty() {
            return Err(MarketError::invalid_field("images", "Image file is empty"));
        }
        if data.len() > self.max_size {
            return Err(MarketError::invalid_field(
                "images",
                format!("Image is {} bytes; the limit is {}", data.len(), self.max_size),
            ));
        }

        let name = sanitize_file_name(original_name);
        let mut stamp = Utc::now().timestamp_millis();

        // Same name within the same millisecond: move to the next free stamp
        loop {
            let file_name = format!("{}-{}", stamp, name);
            let path = self.base_path.join(&file_name);

            let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    stamp += 1;
                    continue;
                }
                Err(e) => return Err(unavailable(&path, e)),
            };

            if let Err(e) = write_all(&mut file, data).await {
                let _ = fs::remove_file(&path).await;
                return Err(unavailable(&path, e));
            }

            debug!(file = %file_name, size = data.len(), "Stored image");
            return Ok(format!("{}/{}", PUBLIC_PREFIX, file_name));
        }
    }

    /// Best-effort removal of previously stored images
    pub async fn remove_all(&self, public_paths: &[String]) {
        for public_path in public_paths {
            let Some(file_name) = public_path
                .strip_prefix(PUBLIC_PREFIX)
                .and_then(|rest| rest.strip_prefix('/'))
                .filter(|name| sanitize_file_name(name) == *name)
            else {
                warn!(path = %public_path, "Not an image store path, skipping removal");
                continue;
            };

            match fs::remove_file(self.base_path.join(file_name)).await {
                Ok(()) => debug!(file = %file_name, "Removed image"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(file = %file_name, "Failed to remove image: {}", e),
            }
        }
    }
}

async fn write_all(file: &mut fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.sync_all().await
}

fn unavailable(path: &Path, source: std::io::Error) -> MarketError {
    StoreError::unavailable(None, format!("write {}", path.display()), source).into()
}

/// Reduce a client-supplied file name to a single safe path component
pub fn sanitize_file_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .take(MAX_NAME_CHARS)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizing_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my cat.png"), "my_cat.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "image");
        assert_eq!(sanitize_file_name("фото.jpg"), "____.jpg");
    }

    #[tokio::test]
    async fn stores_bytes_under_public_path() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::new(dir.path().join("uploads"), 1024).await.unwrap();

        let first = images.store("cat.png", b"png-bytes").await.unwrap();
        let second = images.store("cat.png", b"other-bytes").await.unwrap();
        assert!(first.starts_with("/uploads/"));
        assert!(first.ends_with("-cat.png"));
        assert_ne!(first, second);

        let file_name = first.trim_start_matches("/uploads/");
        let stored = std::fs::read(images.base_path().join(file_name)).unwrap();
        assert_eq!(stored, b"png-bytes");

        images.remove_all(&[first.clone(), "/elsewhere/x".to_string()]).await;
        assert!(!images.base_path().join(file_name).exists());
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_images() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::new(dir.path(), 4).await.unwrap();
        assert!(matches!(images.store("a.png", b"").await, Err(MarketError::Validation { .. })));
        assert!(matches!(images.store("a.png", b"12345").await, Err(MarketError::Validation { .. })));
    }
}
