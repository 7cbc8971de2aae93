use std::path::{Path, PathBuf};

use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Longest sanitized name kept after the `<uuid>_` prefix, so staged names stay
/// well under the common 255-byte filename limit.
pub const MAX_SANITIZED_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl UploadSettings {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

/// Lower-cased suffix after the last `.`, if any.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

pub fn allowed_file(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// Reduces an untrusted upload name to a single safe path component.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches(['.', '_']);
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        truncate_keeping_extension(cleaned, MAX_SANITIZED_LEN)
    }
}

/// Shortens the stem so the whole name fits in `max` bytes. Input is ASCII.
fn truncate_keeping_extension(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() + 1 < max => {
            let keep = max - ext.len() - 1;
            format!("{}.{}", &stem[..keep.min(stem.len())], ext)
        }
        _ => name[..max].to_string(),
    }
}

/// An upload written to the staging directory. The file is deleted when this
/// value is dropped, whatever happened to it in between.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    pub fn new(upload_dir: &Path, original_filename: &str) -> Self {
        let name = format!(
            "{}_{}",
            Uuid::new_v4().simple(),
            sanitize_filename(original_filename)
        );
        Self {
            path: upload_dir.join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "Failed to remove staged upload {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}
