pub mod provisioner;
pub mod s3_service;

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Unique hidden sibling of `path`, used to stage a write before renaming it
/// into place.
pub fn sibling_temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}
