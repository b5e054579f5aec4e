use std::env;
use std::path::PathBuf;

/// Upload pipeline configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum video size in bytes (default: 1 GiB)
    pub max_video_size: u64,

    /// The single accepted upload content type (default: "video/mp4")
    pub allowed_video_type: String,

    /// Scratch directory for staging/processed temp files (default: system temp)
    pub scratch_dir: PathBuf,

    /// Directory for thumbnail files (default: "./media/thumbnails")
    pub media_dir: PathBuf,

    /// ffprobe binary (default: "ffprobe", resolved via PATH)
    pub ffprobe_path: String,

    /// ffmpeg binary (default: "ffmpeg", resolved via PATH)
    pub ffmpeg_path: String,

    /// Secret used to validate bearer tokens (default: "secret")
    pub jwt_secret: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_video_size: 1 << 30, // 1 GiB
            allowed_video_type: "video/mp4".to_string(),
            scratch_dir: env::temp_dir(),
            media_dir: PathBuf::from("./media/thumbnails"),
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            jwt_secret: "secret".to_string(),
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_video_size: env::var("MAX_VIDEO_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_video_size),

            allowed_video_type: env::var("ALLOWED_VIDEO_TYPE")
                .unwrap_or(default.allowed_video_type),

            scratch_dir: env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.scratch_dir),

            media_dir: env::var("MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.media_dir),

            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or(default.ffprobe_path),

            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or(default.ffmpeg_path),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),
        }
    }

    /// Create config for development (system temp scratch, PATH-resolved tools)
    pub fn development() -> Self {
        Self::default()
    }
}
