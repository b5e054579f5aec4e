use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use video_upload_backend::config::UploadConfig;
use video_upload_backend::services::classify::{Orientation, classify};
use video_upload_backend::services::probe::ProbeAdapter;
use video_upload_backend::services::remux::RemuxAdapter;
use video_upload_backend::services::storage::{MemoryStorage, ObjectStorage};
use video_upload_backend::utils::auth::create_jwt;
use video_upload_backend::{AppState, create_app};

struct TestEnv {
    pool: SqlitePool,
    storage: Arc<MemoryStorage>,
    config: UploadConfig,
    // Tempdirs are dropped (and wiped) with the env
    scratch: TempDir,
    _media: TempDir,
    tools: TempDir,
}

fn write_stub(dir: &Path, name: &str, script: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

/// Stub ffprobe reporting the given dimensions for any input
fn stub_ffprobe(dir: &Path, width: u32, height: u32) -> String {
    write_stub(
        dir,
        "ffprobe",
        &format!(
            "#!/bin/sh\necho '{{\"streams\":[{{\"width\":{},\"height\":{}}}]}}'\n",
            width, height
        ),
    )
}

/// Stub ffmpeg copying the input ($3) to the output (last argument)
fn stub_ffmpeg(dir: &Path) -> String {
    write_stub(
        dir,
        "ffmpeg",
        "#!/bin/sh\nfor arg; do out=$arg; done\ncp \"$3\" \"$out\"\n",
    )
}

/// Stub ffprobe whose report depends on the file content: the stub emits the
/// file itself, so two files report the same dimensions iff their bytes match.
fn stub_content_ffprobe(dir: &Path) -> String {
    write_stub(
        dir,
        "ffprobe",
        "#!/bin/sh\nfor arg; do f=$arg; done\ncat \"$f\"\n",
    )
}

fn stub_failing_ffprobe(dir: &Path) -> String {
    write_stub(
        dir,
        "ffprobe",
        "#!/bin/sh\necho 'probe exploded' >&2\nexit 1\n",
    )
}

async fn setup() -> TestEnv {
    let pool = SqlitePoolOptions::new()
        .max_connections(1) // a :memory: database exists per connection
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let scratch = tempfile::tempdir().unwrap();
    let media = tempfile::tempdir().unwrap();
    let tools = tempfile::tempdir().unwrap();

    let config = UploadConfig {
        max_video_size: 1 << 30,
        allowed_video_type: "video/mp4".to_string(),
        scratch_dir: scratch.path().to_path_buf(),
        media_dir: media.path().to_path_buf(),
        ffprobe_path: stub_ffprobe(tools.path(), 1920, 1080),
        ffmpeg_path: stub_ffmpeg(tools.path()),
        jwt_secret: "secret".to_string(),
    };

    TestEnv {
        pool,
        storage: Arc::new(MemoryStorage::new()),
        config,
        scratch,
        _media: media,
        tools,
    }
}

impl TestEnv {
    fn app(&self) -> axum::Router {
        let state = AppState::new(
            self.pool.clone(),
            self.storage.clone() as Arc<dyn ObjectStorage>,
            self.config.clone(),
        );
        create_app(state)
    }

    async fn insert_video(&self, id: &str, user_id: &str) {
        sqlx::query("INSERT INTO videos (id, user_id, title) VALUES (?, ?, ?)")
            .bind(id)
            .bind(user_id)
            .bind("test video")
            .execute(&self.pool)
            .await
            .unwrap();
    }

    async fn video_url(&self, id: &str) -> Option<String> {
        sqlx::query_scalar("SELECT video_url FROM videos WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(self.scratch.path()).unwrap().count() == 0
    }
}

const BOUNDARY: &str = "---------------------------123456789012345678901234567";

fn multipart_body(content_type: &str, content: &str) -> String {
    format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"clip.mp4\"\r\n\
        Content-Type: {content_type}\r\n\r\n\
        {content}\r\n\
        --{boundary}--\r\n",
        boundary = BOUNDARY,
        content_type = content_type,
        content = content,
    )
}

fn upload_request(video_id: &str, token: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/videos/{}/upload", video_id))
        .header("Authorization", format!("Bearer {}", token))
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_upload_flow_end_to_end() {
    let env = setup().await;
    env.insert_video("v1", "u1").await;
    let token = create_jwt("u1", "secret").unwrap();

    let response = env
        .app()
        .oneshot(upload_request(
            "v1",
            &token,
            multipart_body("video/mp4", "fake mp4 payload"),
        ))
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    if status != StatusCode::OK {
        panic!(
            "Upload failed with status {}: {:?}",
            status,
            String::from_utf8_lossy(&body)
        );
    }

    let json: Value = serde_json::from_slice(&body).unwrap();
    let url = json["videoURL"].as_str().unwrap();

    // 1920x1080 is 16:9, so the key must be landscape/<32 hex>.mp4
    let key = url.strip_prefix("memory://videos/").unwrap();
    let (label, rest) = key.split_once('/').unwrap();
    assert_eq!(label, "landscape");
    let hex_part = rest.strip_suffix(".mp4").unwrap();
    assert_eq!(hex_part.len(), 32);
    assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit()));

    // Object landed in the store with the right content type
    assert!(env.storage.contains(key));
    assert_eq!(env.storage.content_type(key).as_deref(), Some("video/mp4"));

    // Record locator points at the stored object
    assert_eq!(env.video_url("v1").await.as_deref(), Some(url));

    // Both temp files are gone
    assert!(env.scratch_is_empty());
}

#[tokio::test]
async fn test_portrait_upload_gets_portrait_key() {
    let mut env = setup().await;
    env.config.ffprobe_path = stub_ffprobe(env.tools.path(), 1080, 1920);
    env.insert_video("v1", "u1").await;
    let token = create_jwt("u1", "secret").unwrap();

    let response = env
        .app()
        .oneshot(upload_request(
            "v1",
            &token,
            multipart_body("video/mp4", "fake mp4 payload"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(
        json["videoURL"]
            .as_str()
            .unwrap()
            .starts_with("memory://videos/portrait/")
    );
}

#[tokio::test]
async fn test_oversized_declared_size_rejected_before_staging() {
    let env = setup().await;
    env.insert_video("v1", "u1").await;
    let token = create_jwt("u1", "secret").unwrap();

    let body = multipart_body("video/mp4", "tiny");
    let request = Request::builder()
        .method("POST")
        .uri("/videos/v1/upload")
        .header("Authorization", format!("Bearer {}", token))
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        // Declared size over the 1 GiB ceiling
        .header("Content-Length", ((1u64 << 30) + 5).to_string())
        .body(Body::from(body))
        .unwrap();

    let response = env.app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    // Rejected before any byte hit the scratch directory
    assert!(env.scratch_is_empty());
    assert_eq!(env.video_url("v1").await, None);
}

#[tokio::test]
async fn test_unsupported_content_type_rejected() {
    let env = setup().await;
    env.insert_video("v1", "u1").await;
    let token = create_jwt("u1", "secret").unwrap();

    let response = env
        .app()
        .oneshot(upload_request(
            "v1",
            &token,
            multipart_body("video/webm", "webm bytes"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(env.scratch_is_empty());
}

#[tokio::test]
async fn test_upload_by_non_owner_is_forbidden() {
    let env = setup().await;
    env.insert_video("v1", "u1").await;
    let token = create_jwt("u2", "secret").unwrap();

    let response = env
        .app()
        .oneshot(upload_request(
            "v1",
            &token,
            multipart_body("video/mp4", "fake mp4 payload"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(env.video_url("v1").await, None);
    assert!(env.scratch_is_empty());
}

#[tokio::test]
async fn test_upload_to_missing_record_is_not_found() {
    let env = setup().await;
    let token = create_jwt("u1", "secret").unwrap();

    let response = env
        .app()
        .oneshot(upload_request(
            "missing",
            &token,
            multipart_body("video/mp4", "fake mp4 payload"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(env.scratch_is_empty());
}

#[tokio::test]
async fn test_probe_failure_cleans_up_and_leaves_record_untouched() {
    let mut env = setup().await;
    env.config.ffprobe_path = stub_failing_ffprobe(env.tools.path());
    env.insert_video("v1", "u1").await;
    let token = create_jwt("u1", "secret").unwrap();

    let response = env
        .app()
        .oneshot(upload_request(
            "v1",
            &token,
            multipart_body("video/mp4", "fake mp4 payload"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // Stderr diagnostics stay in the logs, not the body
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(!String::from_utf8_lossy(&body).contains("probe exploded"));

    assert!(env.scratch_is_empty());
    assert_eq!(env.video_url("v1").await, None);
}

#[tokio::test]
async fn test_remux_failure_cleans_up() {
    let mut env = setup().await;
    env.config.ffmpeg_path = write_stub(
        env.tools.path(),
        "ffmpeg",
        "#!/bin/sh\necho 'remux exploded' >&2\nexit 1\n",
    );
    env.insert_video("v1", "u1").await;
    let token = create_jwt("u1", "secret").unwrap();

    let response = env
        .app()
        .oneshot(upload_request(
            "v1",
            &token,
            multipart_body("video/mp4", "fake mp4 payload"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(env.scratch_is_empty());
    assert_eq!(env.video_url("v1").await, None);
}

#[tokio::test]
async fn test_classification_stable_across_remux() {
    let env = setup().await;

    let staging = env.scratch.path().join("upload-v1-roundtrip.mp4");
    std::fs::write(&staging, r#"{"streams":[{"width":1728,"height":972}]}"#).unwrap();

    let probe = ProbeAdapter::new(stub_content_ffprobe(env.tools.path()));
    let remux = RemuxAdapter::new(stub_ffmpeg(env.tools.path()));

    let before = probe.dimensions(&staging).await.unwrap();
    let processed = remux.remux_faststart(&staging).await.unwrap();
    let after = probe.dimensions(&processed).await.unwrap();

    // A stream copy leaves the video stream untouched, so the processed file
    // reports the same dimensions and lands in the same orientation bucket.
    assert_eq!(after, before);
    assert_eq!(
        classify(after.width, after.height),
        classify(before.width, before.height)
    );
    assert_eq!(classify(before.width, before.height), Orientation::Landscape);
}

/// Storage double whose writes always fail
struct FailingStorage;

#[async_trait::async_trait]
impl ObjectStorage for FailingStorage {
    async fn put_file(&self, _key: &str, _path: &Path, _content_type: &str) -> anyhow::Result<()> {
        anyhow::bail!("store rejected the write")
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://videos/{}", key)
    }
}

#[tokio::test]
async fn test_store_failure_cleans_up_and_leaves_record_untouched() {
    let env = setup().await;
    env.insert_video("v1", "u1").await;
    let token = create_jwt("u1", "secret").unwrap();

    let state = AppState::new(
        env.pool.clone(),
        Arc::new(FailingStorage),
        env.config.clone(),
    );
    let app = create_app(state);

    let response = app
        .oneshot(upload_request(
            "v1",
            &token,
            multipart_body("video/mp4", "fake mp4 payload"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(env.scratch_is_empty());
    assert_eq!(env.video_url("v1").await, None);
}

#[tokio::test]
async fn test_upload_without_token_is_unauthorized() {
    let env = setup().await;
    env.insert_video("v1", "u1").await;

    let request = Request::builder()
        .method("POST")
        .uri("/videos/v1/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body("video/mp4", "fake mp4 payload")))
        .unwrap();

    let response = env.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Auth rejections use the same error envelope as every other failure
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"].as_str(), Some("Missing bearer token"));
}

#[tokio::test]
async fn test_token_validated_against_configured_secret() {
    let mut env = setup().await;
    env.config.jwt_secret = "rotated-secret".to_string();
    env.insert_video("v1", "u1").await;

    // A token signed with the configured secret is accepted
    let token = create_jwt("u1", "rotated-secret").unwrap();
    let request = Request::builder()
        .method("GET")
        .uri("/videos/v1")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = env.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // One signed with any other secret is not
    let stale = create_jwt("u1", "secret").unwrap();
    let request = Request::builder()
        .method("GET")
        .uri("/videos/v1")
        .header("Authorization", format!("Bearer {}", stale))
        .body(Body::empty())
        .unwrap();
    let response = env.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"].as_str(), Some("Invalid or expired token"));
}

#[tokio::test]
async fn test_upload_without_file_field_is_bad_request() {
    let env = setup().await;
    env.insert_video("v1", "u1").await;
    let token = create_jwt("u1", "secret").unwrap();

    let body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"notes\"\r\n\r\n\
        no file here\r\n\
        --{boundary}--\r\n",
        boundary = BOUNDARY,
    );

    let response = env
        .app()
        .oneshot(upload_request("v1", &token, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_video_returns_record() {
    let env = setup().await;
    env.insert_video("v1", "u1").await;
    let token = create_jwt("u1", "secret").unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/videos/v1")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = env.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["id"].as_str(), Some("v1"));
    assert_eq!(json["user_id"].as_str(), Some("u1"));
    assert!(json["videoURL"].is_null());
}
