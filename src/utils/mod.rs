//! Filesystem and time helpers shared across the service.

use anyhow::Result;
use std::path::Path;

/// Extensions accepted for product photos and the site logo.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Uploaded file is empty")]
    Empty,
    #[error("Uploaded file is too large (max {max} bytes)")]
    TooLarge { max: u64 },
    #[error("Unsupported image type. Allowed: jpg, jpeg, png, webp, gif")]
    InvalidExtension,
    #[error("Failed to store uploaded file")]
    Io(#[from] std::io::Error),
}

/// Create a directory (and parents) if it does not exist
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Current UTC time as `YYYY-MM-DD HH:MM:SS`.
///
/// The format matches SQLite's `datetime('now')` so stored timestamps
/// compare correctly against it in SQL.
pub fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Whole minutes elapsed since a stored timestamp.
///
/// Returns 0 for unparseable or future timestamps.
pub fn minutes_since(timestamp: &str) -> i64 {
    let Ok(parsed) = chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S") else {
        return 0;
    };
    let elapsed = chrono::Utc::now().naive_utc() - parsed;
    elapsed.num_minutes().max(0)
}

/// Extract and whitelist the extension of an uploaded image filename.
fn image_extension(filename: &str) -> Result<String, UploadError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or(UploadError::InvalidExtension)?;

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(UploadError::InvalidExtension)
    }
}

/// Store an uploaded image under `dir` with a generated name.
///
/// The client-supplied filename contributes only its extension; the stored
/// name is a fresh UUID so uploads can never collide or escape `dir`.
/// Returns the stored filename.
pub fn store_image(
    dir: &Path,
    original_filename: &str,
    data: &[u8],
    max_bytes: u64,
) -> Result<String, UploadError> {
    if data.is_empty() {
        return Err(UploadError::Empty);
    }
    if data.len() as u64 > max_bytes {
        return Err(UploadError::TooLarge { max: max_bytes });
    }

    let ext = image_extension(original_filename)?;
    let filename = format!("{}.{}", uuid::Uuid::new_v4(), ext);
    std::fs::write(dir.join(&filename), data)?;
    Ok(filename)
}

/// Delete a stored image, ignoring failures.
///
/// Refuses names that could point outside the uploads directory.
pub fn remove_image(dir: &Path, filename: &str) {
    if filename.is_empty() || filename.contains('/') || filename.contains("..") {
        return;
    }
    if let Err(e) = std::fs::remove_file(dir.join(filename)) {
        tracing::debug!("Could not remove stored image {}: {}", filename, e);
    }
}
