use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Public URL prefix uploaded images are served under.
pub const UPLOADS_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    /// Sniff the format from the file's leading bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
        }
    }
}

/// Post images on local disk.
#[derive(Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(dir: PathBuf, max_bytes: usize) -> Self {
        Self { dir, max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn validate(&self, bytes: &[u8]) -> AppResult<ImageKind> {
        if bytes.len() > self.max_bytes {
            return Err(too_large(self.max_bytes));
        }
        ImageKind::detect(bytes).ok_or_else(|| {
            AppError::validation("Unsupported image type, allowed types are JPEG, PNG, and GIF")
        })
    }

    /// Validate and write an image. Returns the public path to store on the post.
    pub async fn save(&self, bytes: &[u8]) -> AppResult<String> {
        let kind = self.validate(bytes)?;
        let file_name = format!("{}.{}", uuid::Uuid::now_v7(), kind.extension());

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create uploads dir: {}", e)))?;
        tokio::fs::write(self.dir.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to save the image: {}", e)))?;

        tracing::info!("Saved upload {} ({} bytes)", file_name, bytes.len());
        Ok(format!("{}/{}", UPLOADS_PREFIX, file_name))
    }

    /// Best-effort removal of an image saved for a post that was then rejected.
    pub async fn discard(&self, public_path: &str) {
        let Some(path) = public_path
            .strip_prefix(UPLOADS_PREFIX)
            .and_then(|name| self.resolve(name.trim_start_matches('/')))
        else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove orphaned upload {}: {}", path.display(), e);
        }
    }

    fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        let safe = !file_name.is_empty()
            && !file_name.starts_with('.')
            && !file_name.contains(['/', '\\']);
        safe.then(|| self.dir.join(file_name))
    }
}

pub(crate) fn too_large(max_bytes: usize) -> AppError {
    AppError::validation(format!(
        "The image is too large, maximum size is {}",
        human_size(max_bytes)
    ))
}

/// Rounds up so a limit is never reported smaller than it is.
fn human_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;
    if bytes >= MB {
        format!("{} MB", bytes.div_ceil(MB))
    } else if bytes >= KB {
        format!("{} KB", bytes.div_ceil(KB))
    } else {
        format!("{} bytes", bytes)
    }
}

/// GET /uploads/{file}
pub async fn serve(State(state): State<AppState>, Path(file_name): Path<String>) -> Response {
    let Some(path) = state.images.resolve(&file_name) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(data) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                data,
            )
                .into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
