//! Container file reading and writing.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use todox_model::{SignedEnvelope, TodoDocument};

use crate::codec::{export_document, import_document};
use crate::error::{ContainerError, Result};
use crate::options::ExportOptions;

/// Media type declared for container blobs.
pub const MEDIA_TYPE: &str = "application/x-mytodo";

/// Conventional container file extension, without the dot.
pub const FILE_EXTENSION: &str = "todolistx";

/// Read a whole container file.
pub fn read_container(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| ContainerError::io("read", path, e))
}

/// Write container bytes.
///
/// Uses atomic write (temp file + rename) so a crash never leaves a
/// half-written container at `path`.
pub fn write_container(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ContainerError::io("create directory", parent, e))?;
    }

    let temp_path = path.with_extension(format!("{FILE_EXTENSION}.tmp"));
    let mut file =
        File::create(&temp_path).map_err(|e| ContainerError::io("create", &temp_path, e))?;
    let written = file
        .write_all(bytes)
        .map_err(|e| ContainerError::io("write", &temp_path, e))
        .and_then(|()| {
            file.sync_all()
                .map_err(|e| ContainerError::io("sync", &temp_path, e))
        });
    drop(file);

    if let Err(err) = written.and_then(|()| {
        fs::rename(&temp_path, path).map_err(|e| ContainerError::io("rename", &temp_path, e))
    }) {
        remove_temp(&temp_path);
        return Err(err);
    }

    tracing::debug!(bytes = bytes.len(), "wrote container to {}", path.display());
    Ok(())
}

fn remove_temp(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path) {
        tracing::warn!("failed to remove {}: {e}", temp_path.display());
    }
}

/// Make a document title safe to use as a file name.
///
/// Path separators, characters reserved on Windows and runs of whitespace
/// become `_`. An empty result falls back to `untitled`.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    if out.is_empty() {
        "untitled".to_string()
    } else {
        out
    }
}

/// `<sanitized title>_<millis>.todolistx`
pub fn container_file_name(document: &TodoDocument, millis: i64) -> String {
    format!(
        "{}_{millis}.{FILE_EXTENSION}",
        sanitize_file_name(&document.title)
    )
}

/// Export `document` into `dir`, returning the written path.
pub fn export_to_dir(
    document: &TodoDocument,
    dir: &Path,
    options: &ExportOptions,
) -> Result<PathBuf> {
    let created_at = options.resolve_created_at();
    let options = options.clone().with_created_at(created_at);
    let bytes = export_document(document, &options)?;

    let path = dir.join(container_file_name(document, created_at.timestamp_millis()));
    write_container(&path, &bytes)?;
    tracing::info!("Exported {} to {}", document.id, path.display());
    Ok(path)
}

/// Read and verify a container file.
pub fn import_file(path: &Path) -> Result<SignedEnvelope> {
    let bytes = read_container(path)?;
    import_document(&bytes)
}

/// Export asynchronously.
///
/// Spawns the export on a blocking thread pool to avoid blocking the async
/// runtime.
pub async fn export_to_dir_async(
    document: TodoDocument,
    dir: PathBuf,
    options: ExportOptions,
) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || export_to_dir(&document, &dir, &options))
        .await
        .map_err(|e| ContainerError::Join(e.to_string()))?
}

/// Import asynchronously on the blocking thread pool.
pub async fn import_file_async(path: PathBuf) -> Result<SignedEnvelope> {
    tokio::task::spawn_blocking(move || import_file(&path))
        .await
        .map_err(|e| ContainerError::Join(e.to_string()))?
}
