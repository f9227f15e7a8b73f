//! Image uploads for avatars and post attachments.

use std::sync::Arc;

use chrono::Utc;
use orbit_common::{AppError, AppResult, StorageBackend};

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Parse a declared MIME type.
    #[must_use]
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// Detect the format from the file's magic bytes.
    fn sniff(data: &[u8]) -> Option<Self> {
        match image::guess_format(data).ok()? {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }
}

/// Upload service writing into the public bucket.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn StorageBackend>,
    max_bytes: usize,
}

impl UploadService {
    /// Create a new upload service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, max_bytes: usize) -> Self {
        Self { storage, max_bytes }
    }

    /// Check type and size. The declared type must match the bytes.
    pub fn validate(&self, content_type: &str, data: &[u8]) -> AppResult<ImageFormat> {
        let declared = ImageFormat::from_mime_type(content_type);
        let detected = ImageFormat::sniff(data);

        let format = match (declared, detected) {
            (Some(declared), Some(detected)) if declared == detected => declared,
            _ => {
                return Err(AppError::BadRequest(
                    "Only JPEG or PNG images allowed".to_string(),
                ));
            }
        };

        if data.len() > self.max_bytes {
            return Err(AppError::BadRequest(format!(
                "Max file size is {}MB",
                self.max_bytes / (1024 * 1024)
            )));
        }

        Ok(format)
    }

    /// Replace the user's avatar. Returns its public URL.
    pub async fn upload_avatar(
        &self,
        user_id: &str,
        content_type: &str,
        data: &[u8],
    ) -> AppResult<String> {
        let format = self.validate(content_type, data)?;

        // One avatar per user, whichever extension it had.
        self.storage
            .remove(&[
                format!("avatars/{user_id}.jpg"),
                format!("avatars/{user_id}.png"),
            ])
            .await?;

        let key = format!("avatars/{user_id}.{}", format.extension());
        let stored = self
            .storage
            .upload(&key, data, format.mime_type())
            .await?;

        tracing::info!(user_id = %user_id, key = %stored.key, size = stored.size, "Uploaded avatar");
        Ok(stored.url)
    }

    /// Store an image to attach to a post. Returns its public URL.
    pub async fn upload_post_image(
        &self,
        user_id: &str,
        content_type: &str,
        data: &[u8],
    ) -> AppResult<String> {
        let format = self.validate(content_type, data)?;

        let key = format!(
            "posts/{user_id}_{}.{}",
            Utc::now().timestamp_millis(),
            format.extension()
        );
        let stored = self
            .storage
            .upload(&key, data, format.mime_type())
            .await?;

        tracing::debug!(user_id = %user_id, key = %stored.key, "Uploaded post image");
        Ok(stored.url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use orbit_common::LocalStorage;
    use std::path::PathBuf;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    fn temp_dir() -> PathBuf {
        let suffix = orbit_common::IdGenerator::new().generate();
        std::env::temp_dir().join(format!("orbit-upload-{suffix}"))
    }

    fn service(base: &std::path::Path, max_bytes: usize) -> UploadService {
        UploadService::new(
            Arc::new(LocalStorage::new(
                base.to_path_buf(),
                "http://localhost:3000/storage/v1/object/public/images".to_string(),
            )),
            max_bytes,
        )
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(ImageFormat::from_mime_type("image/jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime_type("IMAGE/PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_mime_type("image/gif"), None);
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn test_validate_rejects_mismatched_bytes() {
        let service = service(&temp_dir(), 2 * 1024 * 1024);

        assert_eq!(service.validate("image/png", PNG).unwrap(), ImageFormat::Png);
        assert!(service.validate("image/jpeg", PNG).is_err());
        assert!(service.validate("image/gif", b"GIF89a").is_err());
        assert!(service.validate("image/png", b"not an image").is_err());
    }

    #[test]
    fn test_validate_size_limit() {
        let service = service(&temp_dir(), 2 * 1024 * 1024);
        let mut big = PNG.to_vec();
        big.resize(2 * 1024 * 1024 + 1, 0);

        let err = service.validate("image/png", &big).unwrap_err();

        assert_eq!(err.to_string(), "Max file size is 2MB");
    }

    #[tokio::test]
    async fn test_avatar_replaces_other_extension() {
        let base = temp_dir();
        let service = service(&base, 1024);

        service.upload_avatar("alice", "image/png", PNG).await.unwrap();
        let url = service
            .upload_avatar("alice", "image/jpeg", JPEG)
            .await
            .unwrap();

        assert_eq!(
            url,
            "http://localhost:3000/storage/v1/object/public/images/avatars/alice.jpg"
        );
        assert!(base.join("avatars/alice.jpg").exists());
        assert!(!base.join("avatars/alice.png").exists());

        tokio::fs::remove_dir_all(&base).await.unwrap();
    }

    #[tokio::test]
    async fn test_post_image_key() {
        let base = temp_dir();
        let service = service(&base, 1024);

        let url = service
            .upload_post_image("alice", "image/png", PNG)
            .await
            .unwrap();

        assert!(url.contains("/posts/alice_"));
        assert!(url.ends_with(".png"));

        tokio::fs::remove_dir_all(&base).await.unwrap();
    }
}
