//! Atomic document writes: serialize to a sibling temp file, then rename
//! over the destination. A reader never observes a partially-written
//! document, and a crash between the write and the rename leaves the
//! previous version intact.

use crate::errors::StoreError;
use serde::Serialize;
use std::path::Path;

pub fn write_json_atomic<T: Serialize>(path: &Path, what: &'static str, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io { path: parent.display().to_string(), source })?;
    }
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize { what, path: path.display().to_string(), source })?;

    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, &bytes).map_err(|source| StoreError::Io { path: tmp_path.display().to_string(), source })?;
    if let Err(source) = std::fs::rename(&tmp_path, path) {
        // Some platforms (notably Windows) refuse to rename over an
        // existing destination file; remove it first and retry once
        //. Elsewhere this branch is simply never hit.
        if path.exists() {
            std::fs::remove_file(path).map_err(|source| StoreError::Io { path: path.display().to_string(), source })?;
            std::fs::rename(&tmp_path, path).map_err(|source| StoreError::Io { path: path.display().to_string(), source })?;
        } else {
            return Err(StoreError::Io { path: path.display().to_string(), source });
        }
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp-{}", std::process::id()))
}
