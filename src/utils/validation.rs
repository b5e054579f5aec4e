use crate::error::AppError;

/// Validates the declared upload size against the ceiling.
///
/// Runs before any bytes are staged, so an oversized declaration never
/// touches the scratch directory.
pub fn validate_video_size(declared_size: u64, max_size: u64) -> Result<(), AppError> {
    if declared_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "Declared size {} bytes exceeds maximum allowed {} bytes",
            declared_size, max_size
        )));
    }
    Ok(())
}

/// Validates the declared content type against the single supported container.
///
/// The declared type is trusted as-is; no byte sniffing happens at this stage.
pub fn validate_video_type(content_type: Option<&str>, allowed: &str) -> Result<(), AppError> {
    let normalized = content_type
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    if normalized == allowed {
        return Ok(());
    }

    Err(AppError::BadRequest(format!(
        "Content type '{}' is not supported, expected '{}'",
        content_type.unwrap_or("none"),
        allowed
    )))
}
