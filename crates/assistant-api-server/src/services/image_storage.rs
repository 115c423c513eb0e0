use crate::config::StorageConfig;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid base64 image data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Invalid image: {0}")]
    NotAnImage(String),

    #[error("Failed to save image: {0}")]
    Io(#[from] std::io::Error),
}

impl ImageError {
    /// Client-caused failures, as opposed to storage failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ImageError::Io(_))
    }
}

#[derive(Debug, Clone)]
pub struct StoredImage {
    /// URL the image is served under, e.g. `/uploads/<uuid>.png`
    pub public_url: String,
    pub path: PathBuf,
    pub mime_type: String,
    /// Inline `data:` URL handed to the vision model
    pub data_url: String,
}

/// Validated images saved under a UUID file name in the upload dir.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    upload_dir: PathBuf,
    public_prefix: String,
}

/// A validated upload with its final name assigned. Nothing is on disk until
/// [`PendingImage::commit`].
#[derive(Debug)]
pub struct PendingImage {
    bytes: Vec<u8>,
    image: StoredImage,
}

impl ImageStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&config.upload_dir),
            public_prefix: config.mount_path().to_string(),
        }
    }

    pub fn prepare(&self, bytes: Vec<u8>) -> Result<PendingImage, ImageError> {
        let (mime_type, extension) = validate_image(&bytes)?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);

        Ok(PendingImage {
            image: StoredImage {
                public_url: format!("{}/{}", self.public_prefix, file_name),
                path: self.upload_dir.join(&file_name),
                data_url: format!("data:{};base64,{}", mime_type, STANDARD.encode(&bytes)),
                mime_type,
            },
            bytes,
        })
    }
}

impl PendingImage {
    pub fn data_url(&self) -> &str {
        &self.image.data_url
    }

    pub async fn commit(self) -> Result<StoredImage, ImageError> {
        if let Some(dir) = self.image.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.image.path, &self.bytes).await?;

        info!(
            "Saved image {} ({} bytes)",
            self.image.path.display(),
            self.bytes.len()
        );
        Ok(self.image)
    }
}

/// Accepts raw base64 or a `data:<mime>;base64,<payload>` URL.
pub fn decode_image_data(data: &str) -> Result<Vec<u8>, ImageError> {
    let payload = match data.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") => payload,
        _ => data,
    };

    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(cleaned)?)
}

/// Decode check plus type detection. Returns (mime type, file extension).
pub fn validate_image(bytes: &[u8]) -> Result<(String, String), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::NotAnImage("empty file".to_string()));
    }

    let kind = infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .ok_or_else(|| ImageError::NotAnImage("unrecognized image format".to_string()))?;

    image::load_from_memory(bytes).map_err(|e| ImageError::NotAnImage(e.to_string()))?;

    debug!("Validated image: {}", kind.mime_type());
    Ok((kind.mime_type().to_string(), kind.extension().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 30, 30]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_raw_and_data_url() {
        let encoded = STANDARD.encode(png_bytes());
        assert_eq!(decode_image_data(&encoded).unwrap(), png_bytes());

        let data_url = format!("data:image/png;base64,{}", encoded);
        assert_eq!(decode_image_data(&data_url).unwrap(), png_bytes());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_image_data("not base64 at all!!").unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validate_image() {
        let (mime, ext) = validate_image(&png_bytes()).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(ext, "png");

        assert!(validate_image(b"hello world").is_err());
        assert!(validate_image(&[]).is_err());
    }

    #[test]
    fn test_validate_rejects_truncated_image() {
        let bytes = png_bytes();
        assert!(validate_image(&bytes[..bytes.len() / 2]).is_err());
    }

    #[tokio::test]
    async fn test_prepare_writes_nothing_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ImageStorage::new(&StorageConfig {
            upload_dir: dir.path().display().to_string(),
            public_prefix: "/uploads/".to_string(),
        });

        let pending = storage.prepare(png_bytes()).unwrap();
        assert!(pending.data_url().starts_with("data:image/png;base64,"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let stored = pending.commit().await.unwrap();

        assert!(stored.public_url.starts_with("/uploads/"));
        assert!(!stored.public_url.starts_with("/uploads//"));
        assert!(stored.public_url.ends_with(".png"));
        assert_eq!(std::fs::read(&stored.path).unwrap(), png_bytes());
    }

    #[test]
    fn test_prepare_rejects_non_image() {
        let storage = ImageStorage::new(&StorageConfig::default());
        let err = storage.prepare(b"plain text".to_vec()).unwrap_err();
        assert!(err.is_client_error());
    }
}
