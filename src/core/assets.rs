//! Uploaded image storage.
//!
//! One image per owning entity: the file name is derived from the entity id,
//! so a second upload for the same entity overwrites the first.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::core::errors::ApiError;
use crate::core::helpers::validate_id;

pub const IMAGE_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    UserPicture,
    EventBanner,
    PlaceBanner,
    MerchPicture,
    Media,
}

impl AssetKind {
    pub const ALL: [AssetKind; 5] = [
        AssetKind::UserPicture,
        AssetKind::EventBanner,
        AssetKind::PlaceBanner,
        AssetKind::MerchPicture,
        AssetKind::Media,
    ];

    pub fn directory(self) -> &'static str {
        match self {
            AssetKind::UserPicture => "userpic",
            AssetKind::EventBanner => "eventpic",
            AssetKind::PlaceBanner => "placepic",
            AssetKind::MerchPicture => "merchpic",
            AssetKind::Media => "uploads",
        }
    }

    pub fn from_directory(directory: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.directory() == directory)
    }
}

#[derive(Debug, Clone)]
pub struct AssetStorage {
    root: PathBuf,
}

impl AssetStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path stored on the owning record, relative to the upload root.
    pub fn relative_path(kind: AssetKind, owner_id: &str) -> String {
        format!("{}/{}.{}", kind.directory(), owner_id, IMAGE_EXTENSION)
    }

    fn absolute_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Writes `bytes` as the image of `owner_id`, creating the directory if
    /// needed. Partial writes are left in place on failure.
    pub async fn store(&self, kind: AssetKind, owner_id: &str, bytes: &[u8]) -> Result<String, ApiError> {
        if !validate_id(owner_id) {
            return Err(ApiError::bad_request("Invalid id"));
        }

        let directory = self.root.join(kind.directory());
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| ApiError::internal("Error creating image directory", e))?;

        let relative = Self::relative_path(kind, owner_id);
        let mut file = tokio::fs::File::create(self.absolute_path(&relative))
            .await
            .map_err(|e| ApiError::internal("Error saving image", e))?;

        file.write_all(bytes)
            .await
            .map_err(|e| ApiError::internal("Error saving image", e))?;
        file.flush()
            .await
            .map_err(|e| ApiError::internal("Error saving image", e))?;

        Ok(relative)
    }

    /// Reads a stored image by its file name (`<id>.jpg`).
    pub async fn read(&self, kind: AssetKind, file_name: &str) -> Result<Vec<u8>, ApiError> {
        let owner_id = file_name
            .strip_suffix(&format!(".{}", IMAGE_EXTENSION))
            .filter(|id| validate_id(id))
            .ok_or_else(|| ApiError::not_found("File not found"))?;

        let path = self.absolute_path(&Self::relative_path(kind, owner_id));
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApiError::not_found("File not found")),
            Err(e) => Err(ApiError::internal("Error reading image", e)),
        }
    }

    /// Removes a stored image. A missing file is not an error.
    pub async fn remove(&self, relative: &str) -> Result<(), ApiError> {
        let is_known = AssetKind::ALL
            .iter()
            .any(|kind| relative.starts_with(&format!("{}/", kind.directory())));
        if !is_known || relative.contains("..") {
            return Ok(());
        }

        match tokio::fs::remove_file(self.absolute_path(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::internal("Error removing image", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn second_upload_overwrites_first() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AssetStorage::new(dir.path());

        let first = storage.store(AssetKind::EventBanner, "ev1", b"one").await.unwrap();
        let second = storage.store(AssetKind::EventBanner, "ev1", b"two").await.unwrap();

        assert_eq!(first, "eventpic/ev1.jpg");
        assert_eq!(first, second);
        assert_eq!(storage.read(AssetKind::EventBanner, "ev1.jpg").await.unwrap(), b"two");
    }

    #[actix_web::test]
    async fn read_rejects_foreign_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AssetStorage::new(dir.path());

        assert!(storage.read(AssetKind::Media, "../secret.jpg").await.is_err());
        assert!(storage.read(AssetKind::Media, "missing.jpg").await.is_err());
        assert!(storage.read(AssetKind::Media, "x.png").await.is_err());
    }

    #[actix_web::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AssetStorage::new(dir.path());
        let path = storage.store(AssetKind::Media, "m1", b"img").await.unwrap();

        storage.remove(&path).await.unwrap();
        storage.remove(&path).await.unwrap();

        assert!(storage.read(AssetKind::Media, "m1.jpg").await.is_err());
    }
}
