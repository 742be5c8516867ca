use std::path::PathBuf;
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_RECEIPT_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("application/pdf", "pdf"),
];

/// Receipt files on the local filesystem, served under `/uploads/receipts`.
#[derive(Clone, Debug)]
pub struct ReceiptStorage {
    dir: PathBuf,
}

impl ReceiptStorage {
    pub fn new(dir: &str) -> Self {
        Self {
            dir: PathBuf::from(dir),
        }
    }

    /// File extension for an accepted content type.
    pub fn validate(content_type: Option<&str>, size: usize) -> Result<&'static str, AppError> {
        let content_type = content_type.unwrap_or("application/octet-stream");
        let ext = ALLOWED_TYPES
            .iter()
            .find(|(mime, _)| *mime == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                AppError::bad_request(format!(
                    "File type {} not allowed. Allowed types: {}",
                    content_type,
                    ALLOWED_TYPES
                        .iter()
                        .map(|(mime, _)| *mime)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })?;
        if size > MAX_RECEIPT_BYTES {
            return Err(AppError::PayloadTooLarge {
                message: "File too large. Maximum size is 10.0MB".to_string(),
            });
        }
        Ok(ext)
    }

    /// Stores the bytes and returns the public URL path.
    pub async fn save(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<String, AppError> {
        let ext = Self::validate(content_type, bytes.len())?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::internal(format!("Failed to create upload dir: {}", e)))?;

        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.dir.join(&filename);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(AppError::internal(format!("Failed to save file: {}", e)));
        }
        Ok(format!("/uploads/receipts/{}", filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_types_and_size() {
        assert_eq!(ReceiptStorage::validate(Some("image/png"), 100).unwrap(), "png");
        assert_eq!(
            ReceiptStorage::validate(Some("text/plain"), 10)
                .unwrap_err()
                .status_code(),
            axum::http::StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ReceiptStorage::validate(Some("application/pdf"), MAX_RECEIPT_BYTES + 1)
                .unwrap_err()
                .status_code(),
            axum::http::StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let dir = std::env::temp_dir().join(format!("receipts-{}", Uuid::new_v4()));
        let storage = ReceiptStorage::new(dir.to_str().unwrap());
        let url = storage.save(Some("image/jpeg"), b"jpegdata").await.unwrap();
        assert!(url.starts_with("/uploads/receipts/") && url.ends_with(".jpg"));
        let name = url.trim_start_matches("/uploads/receipts/");
        assert_eq!(tokio::fs::read(dir.join(name)).await.unwrap(), b"jpegdata");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
