use crate::error::AppError;
use crate::models::Video;
use crate::utils::auth::Claims;
use axum::{
    Extension, Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};

#[utoipa::path(
    get,
    path = "/videos/{id}",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video record", body = Video),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn get_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<String>,
) -> Result<Json<Video>, AppError> {
    let video = state
        .video_service
        .find_owned_video(&video_id, &claims.sub)
        .await?;
    Ok(Json(video))
}

#[utoipa::path(
    post,
    path = "/videos/{id}/upload",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    request_body(content = String, content_type = "multipart/form-data", description = "Video upload (single `file` field, video/mp4)"),
    responses(
        (status = 200, description = "Video processed and stored", body = Video),
        (status = 400, description = "Missing file field or unsupported content type"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Video not found"),
        (status = 413, description = "Upload exceeds the size ceiling")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn upload_video(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let declared_size = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(|s| s.to_string());

        let body_with_io_error = field.map_err(std::io::Error::other);
        let reader = StreamReader::new(body_with_io_error);

        let video = state
            .video_service
            .process_upload(
                &video_id,
                &claims.sub,
                content_type.as_deref(),
                declared_size,
                reader,
            )
            .await?;

        return Ok(Json(video));
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}

#[utoipa::path(
    post,
    path = "/videos/{id}/thumbnail",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    request_body(content = String, content_type = "multipart/form-data", description = "Thumbnail upload (single `file` field, image/jpeg)"),
    responses(
        (status = 200, description = "Thumbnail stored", body = Video),
        (status = 400, description = "Missing file field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn upload_thumbnail(
    State(state): State<crate::AppState>,
    Extension(claims): Extension<Claims>,
    Path(video_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Video>, AppError> {
    let mut video = state
        .video_service
        .find_owned_video(&video_id, &claims.sub)
        .await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        tokio::fs::create_dir_all(&state.config.media_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create media dir: {}", e)))?;

        // Single-file pathway: one thumbnail per record, overwritten in place
        let path = state.config.media_dir.join(format!("{}.jpg", video_id));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write thumbnail: {}", e)))?;

        let url = format!("/videos/{}/thumbnail", video_id);
        sqlx::query("UPDATE videos SET thumbnail_url = ? WHERE id = ?")
            .bind(&url)
            .bind(&video_id)
            .execute(&state.db)
            .await?;

        video.thumbnail_url = Some(url);
        return Ok(Json(video));
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}

#[utoipa::path(
    get,
    path = "/videos/{id}/thumbnail",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Thumbnail image stream"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Thumbnail not found")
    ),
    security(
        ("jwt" = [])
    )
)]
pub async fn get_thumbnail(
    State(state): State<crate::AppState>,
    Path(video_id): Path<String>,
) -> Result<Response, AppError> {
    let path = state.config.media_dir.join(format!("{}.jpg", video_id));

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| AppError::NotFound("Thumbnail not found".to_string()))?;

    let body = Body::from_stream(ReaderStream::new(file));
    let headers = [(header::CONTENT_TYPE, "image/jpeg".to_string())];

    Ok((headers, body).into_response())
}
