use futures_util::TryStreamExt;
use std::path::{Path, PathBuf};
use tracing::info;
use warp::hyper::body::Buf;
use warp::multipart::{FormData, Part};

use crate::error::ServerError;
use clicker_types::UploadResponse;

/// Multipart field the file must arrive in.
pub const UPLOAD_FIELD: &str = "image";

/// Keeps only characters that are safe in a file name on any platform.
pub fn sanitize_filename(original: &str) -> Option<String> {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

pub fn stored_filename(millis: i64, original: &str) -> Option<String> {
    sanitize_filename(original).map(|name| format!("{}-{}", millis, name))
}

pub async fn store_upload(form: FormData, upload_dir: &Path) -> Result<UploadResponse, ServerError> {
    let mut parts = form;

    while let Some(part) = parts
        .try_next()
        .await
        .map_err(|e| ServerError::Validation(format!("Malformed upload: {}", e)))?
    {
        if part.name() != UPLOAD_FIELD {
            continue;
        }

        let original = part.filename().unwrap_or_default().to_string();
        let filename = stored_filename(chrono::Utc::now().timestamp_millis(), &original)
            .ok_or_else(|| ServerError::Validation("Uploaded file has no usable name".to_string()))?;

        let data = read_part(part).await?;
        tokio::fs::create_dir_all(upload_dir).await?;
        let destination: PathBuf = upload_dir.join(&filename);
        tokio::fs::write(&destination, &data).await?;

        info!("Stored upload {} ({} bytes)", filename, data.len());
        return Ok(UploadResponse {
            success: true,
            path: format!("/uploads/{}", filename),
            filename,
        });
    }

    Err(ServerError::Validation("No file uploaded".to_string()))
}

async fn read_part(part: Part) -> Result<Vec<u8>, ServerError> {
    part.stream()
        .map_err(|e| ServerError::Validation(format!("Malformed upload: {}", e)))
        .try_fold(Vec::new(), |mut data, mut chunk| async move {
            while chunk.has_remaining() {
                let bytes = chunk.chunk();
                let len = bytes.len();
                data.extend_from_slice(bytes);
                chunk.advance(len);
            }
            Ok(data)
        })
        .await
}
