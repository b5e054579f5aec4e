use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::AppError;
use crate::models::Video;
use crate::services::classify::classify;
use crate::services::keygen::generate_storage_key;
use crate::services::probe::ProbeAdapter;
use crate::services::remux::{RemuxAdapter, processed_path};
use crate::services::storage::ObjectStorage;

/// Removes tracked scratch files when the pipeline run ends, success or
/// failure. Drop-based so every exit path (early returns included) is
/// covered.
struct ScratchGuard {
    paths: Vec<PathBuf>,
}

impl ScratchGuard {
    fn new() -> Self {
        Self { paths: Vec::new() }
    }

    fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove scratch file {:?}: {}", path, e);
                }
            }
        }
    }
}

/// Upload-processing pipeline: stage, probe, classify, remux, upload, record.
pub struct VideoService {
    db: SqlitePool,
    storage: Arc<dyn ObjectStorage>,
    probe: ProbeAdapter,
    remux: RemuxAdapter,
    config: UploadConfig,
}

impl VideoService {
    pub fn new(db: SqlitePool, storage: Arc<dyn ObjectStorage>, config: UploadConfig) -> Self {
        Self {
            db,
            storage,
            probe: ProbeAdapter::new(config.ffprobe_path.clone()),
            remux: RemuxAdapter::new(config.ffmpeg_path.clone()),
            config,
        }
    }

    pub async fn find_video(&self, video_id: &str) -> Result<Video, AppError> {
        sqlx::query_as::<_, Video>(
            "SELECT id, user_id, title, video_url, thumbnail_url, created_at FROM videos WHERE id = ?",
        )
        .bind(video_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
    }

    /// Resolve a record and enforce ownership. Runs before any bytes are
    /// staged so a forbidden request costs no disk I/O.
    pub async fn find_owned_video(&self, video_id: &str, user_id: &str) -> Result<Video, AppError> {
        let video = self.find_video(video_id).await?;
        if video.user_id != user_id {
            return Err(AppError::Forbidden(
                "You do not own this video".to_string(),
            ));
        }
        Ok(video)
    }

    /// Staging path for one run: record id plus a random suffix, so
    /// concurrent runs (even for the same record) never share a path.
    fn staging_path(&self, video_id: &str) -> PathBuf {
        self.config
            .scratch_dir
            .join(format!("upload-{}-{}.mp4", video_id, Uuid::new_v4()))
    }

    /// Run the full pipeline for one upload.
    ///
    /// Preconditions (size ceiling, content type, ownership) are checked
    /// before the body is staged. The record's locator is only written after
    /// the remote upload fully succeeded; any earlier failure leaves it
    /// untouched. Both scratch files are removed on every exit path.
    pub async fn process_upload<R>(
        &self,
        video_id: &str,
        user_id: &str,
        content_type: Option<&str>,
        declared_size: Option<u64>,
        body: R,
    ) -> Result<Video, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        if let Some(size) = declared_size {
            crate::utils::validation::validate_video_size(size, self.config.max_video_size)?;
        }
        crate::utils::validation::validate_video_type(
            content_type,
            &self.config.allowed_video_type,
        )?;

        let mut video = self.find_owned_video(video_id, user_id).await?;

        let staging = self.staging_path(video_id);
        let mut guard = ScratchGuard::new();
        guard.track(staging.clone());
        // ffmpeg may leave a partial output behind on failure; track it
        // before the tool runs so it is cleaned up either way.
        guard.track(processed_path(&staging));

        let staged_size = self.stage_upload(&staging, body).await?;
        tracing::debug!("Staged {} bytes to {:?}", staged_size, staging);

        let dims = self.probe.dimensions(&staging).await?;
        let orientation = classify(dims.width, dims.height);
        tracing::info!(
            width = dims.width,
            height = dims.height,
            orientation = orientation.as_str(),
            "Probed video {}",
            video_id
        );

        let processed = self.remux.remux_faststart(&staging).await?;

        let key = generate_storage_key(orientation);
        self.storage
            .put_file(&key, &processed, &self.config.allowed_video_type)
            .await
            .map_err(|e| AppError::UploadFailure(e.to_string()))?;

        let url = self.storage.public_url(&key);
        sqlx::query("UPDATE videos SET video_url = ? WHERE id = ?")
            .bind(&url)
            .bind(video_id)
            .execute(&self.db)
            .await?;

        tracing::info!("Video {} stored as {}", video_id, key);
        video.video_url = Some(url);
        Ok(video)
    }

    /// Stream the upload body to the staging file, enforcing the size
    /// ceiling for transports that did not declare a length.
    async fn stage_upload<R>(&self, staging: &Path, body: R) -> Result<u64, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        use tokio::io::AsyncReadExt;

        let mut file = tokio::fs::File::create(staging)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create staging file: {}", e)))?;

        // take() one byte past the ceiling so an over-limit body is
        // detectable without buffering it whole.
        let mut limited = body.take(self.config.max_video_size + 1);
        let written = tokio::io::copy(&mut limited, &mut file)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to stage upload: {}", e)))?;

        if written > self.config.max_video_size {
            return Err(AppError::PayloadTooLarge(format!(
                "Upload exceeds maximum allowed {} bytes",
                self.config.max_video_size
            )));
        }

        Ok(written)
    }
}
