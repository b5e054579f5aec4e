pub mod config;
pub mod error;
pub mod handlers;
pub mod infrastructure;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::UploadConfig;
use crate::services::storage::ObjectStorage;
use crate::services::video_service::VideoService;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::videos::get_video,
        handlers::videos::upload_video,
        handlers::videos::upload_thumbnail,
        handlers::videos::get_thumbnail,
    ),
    components(
        schemas(
            models::Video,
        )
    ),
    tags(
        (name = "videos", description = "Video upload and processing endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub storage: Arc<dyn ObjectStorage>,
    pub video_service: Arc<VideoService>,
    pub config: UploadConfig,
}

impl AppState {
    pub fn new(db: SqlitePool, storage: Arc<dyn ObjectStorage>, config: UploadConfig) -> Self {
        let video_service = Arc::new(VideoService::new(
            db.clone(),
            storage.clone(),
            config.clone(),
        ));
        Self {
            db,
            storage,
            video_service,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let auth = from_fn_with_state(state.clone(), middleware::auth::auth_middleware);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/videos/:id",
            get(handlers::videos::get_video).layer(auth.clone()),
        )
        .route(
            "/videos/:id/upload",
            post(handlers::videos::upload_video).layer(auth.clone()),
        )
        .route(
            "/videos/:id/thumbnail",
            post(handlers::videos::upload_thumbnail)
                .get(handlers::videos::get_thumbnail)
                .layer(auth),
        )
        .with_state(state)
}
