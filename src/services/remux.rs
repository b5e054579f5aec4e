use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::AppError;

/// ffmpeg adapter: stream-copy remux with the moov atom moved up front so
/// playback can start before the whole file downloads.
pub struct RemuxAdapter {
    ffmpeg_path: String,
}

/// Output path is the input path with a fixed suffix, so it inherits the
/// input's per-run uniqueness.
pub fn processed_path(input: &Path) -> PathBuf {
    let mut os = input.as_os_str().to_owned();
    os.push(".faststart.mp4");
    PathBuf::from(os)
}

impl RemuxAdapter {
    pub fn new(ffmpeg_path: String) -> Self {
        Self { ffmpeg_path }
    }

    /// Remux `input` into a second local file and return its path.
    ///
    /// All streams are copied without re-encoding; existing metadata tags are
    /// preserved. ffmpeg produces no stdout here; stderr is captured for the
    /// error report. Fails on non-zero exit, no retry.
    pub async fn remux_faststart(&self, input: &Path) -> Result<PathBuf, AppError> {
        let output_path = processed_path(input);

        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c", "copy", "-movflags", "+faststart", "-map_metadata", "0"])
            .arg(&output_path)
            .output()
            .await
            .map_err(|e| AppError::ToolFailure {
                tool: "ffmpeg",
                detail: format!("failed to spawn: {}", e),
            })?;

        if !output.status.success() {
            return Err(AppError::ToolFailure {
                tool: "ffmpeg",
                detail: format!(
                    "exit {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }

        Ok(output_path)
    }
}
