use std::path::Path;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::AppError;

/// Dimensions of the primary video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// ffprobe adapter: reads the primary video stream's width and height.
pub struct ProbeAdapter {
    ffprobe_path: String,
}

impl ProbeAdapter {
    pub fn new(ffprobe_path: String) -> Self {
        Self { ffprobe_path }
    }

    /// Probe a local file for its video dimensions.
    ///
    /// Spawns ffprobe with a fixed argument template selecting only the first
    /// video stream and emitting width/height as JSON. Fails on non-zero exit,
    /// signal kill, or output that does not parse into two positive integers.
    /// No retry.
    pub async fn dimensions(&self, path: &Path) -> Result<Dimensions, AppError> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| AppError::ToolFailure {
                tool: "ffprobe",
                detail: format!("failed to spawn: {}", e),
            })?;

        if !output.status.success() {
            return Err(AppError::ToolFailure {
                tool: "ffprobe",
                detail: format!(
                    "exit {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }

        let parsed: ProbeOutput =
            serde_json::from_slice(&output.stdout).map_err(|e| AppError::ToolFailure {
                tool: "ffprobe",
                detail: format!("unparseable output: {}", e),
            })?;

        let stream = parsed.streams.first().ok_or(AppError::ToolFailure {
            tool: "ffprobe",
            detail: "no video stream found".to_string(),
        })?;

        match (stream.width, stream.height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                Ok(Dimensions { width, height })
            }
            _ => Err(AppError::ToolFailure {
                tool: "ffprobe",
                detail: "missing or non-positive dimensions".to_string(),
            }),
        }
    }
}
