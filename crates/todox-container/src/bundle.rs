//! Multi-document zip bundles and batch import.
//!
//! A bundle holds one standalone container per document plus a
//! `manifest.json`. The archive itself carries no integrity data; every
//! inner container is verified on its own.

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use todox_model::{BatchImport, BundleEntry, BundleManifest, TodoDocument};
use zip::write::SimpleFileOptions;

use crate::codec::{export_document, import_document};
use crate::envelope::format_created_at;
use crate::error::{ContainerError, Result};
use crate::io::{FILE_EXTENSION, read_container, sanitize_file_name};
use crate::options::ExportOptions;

/// Name of the manifest entry inside a bundle.
pub const MANIFEST_NAME: &str = "manifest.json";

/// `myTodoLists_<millis>.zip`
pub fn bundle_file_name(millis: i64) -> String {
    format!("myTodoLists_{millis}.zip")
}

/// Export several documents into one zip archive.
pub fn export_bundle(documents: &[TodoDocument], options: &ExportOptions) -> Result<Vec<u8>> {
    let created_at = options.resolve_created_at();
    let options = options.clone().with_created_at(created_at);

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let file_options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut used = HashSet::new();
    let mut entries = Vec::with_capacity(documents.len());
    for document in documents {
        let container = export_document(document, &options)?;
        let name = unique_entry_name(&document.title, &mut used);

        writer.start_file(name.as_str(), file_options)?;
        writer
            .write_all(&container)
            .map_err(|e| ContainerError::Bundle(format!("failed to write {name}: {e}")))?;
        entries.push(BundleEntry {
            name,
            item_count: document.item_count(),
        });
    }

    let manifest = BundleManifest {
        export_date: format_created_at(created_at),
        app_version: options.app_version.clone(),
        documents: entries,
    };
    let manifest_json =
        serde_json::to_vec_pretty(&manifest).map_err(ContainerError::Serialization)?;
    writer.start_file(MANIFEST_NAME, file_options)?;
    writer
        .write_all(&manifest_json)
        .map_err(|e| ContainerError::Bundle(format!("failed to write manifest: {e}")))?;

    let bytes = writer.finish()?.into_inner();
    tracing::info!(
        documents = documents.len(),
        bytes = bytes.len(),
        "bundle exported"
    );
    Ok(bytes)
}

fn unique_entry_name(title: &str, used: &mut HashSet<String>) -> String {
    let stem = sanitize_file_name(title);
    let mut name = format!("{stem}.{FILE_EXTENSION}");
    let mut n = 1;
    while used.contains(&name) {
        name = format!("{stem}_{n}.{FILE_EXTENSION}");
        n += 1;
    }
    used.insert(name.clone());
    name
}

/// Read `manifest.json` from a bundle.
pub fn read_bundle_manifest(bytes: &[u8]) -> Result<BundleManifest> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut file = archive.by_name(MANIFEST_NAME)?;
    let mut json = Vec::new();
    file.read_to_end(&mut json)
        .map_err(|e| ContainerError::Bundle(format!("failed to read manifest: {e}")))?;
    serde_json::from_slice(&json)
        .map_err(|e| ContainerError::Bundle(format!("invalid manifest: {e}")))
}

/// Import every container in a bundle.
///
/// A bad entry becomes a report and does not stop the others. Only an
/// unreadable archive is an error.
pub fn import_bundle(bytes: &[u8]) -> Result<BatchImport> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut batch = BatchImport::default();

    for index in 0..archive.len() {
        let name = archive
            .name_for_index(index)
            .map_or_else(|| format!("entry #{index}"), str::to_string);
        if !is_container_name(&name) {
            continue;
        }
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(entry = %name, "failed to open bundle entry: {e}");
                batch.record_failure(name, format!("Could not open the archive entry: {e}"));
                continue;
            }
        };
        if file.is_dir() {
            continue;
        }

        let mut container = Vec::new();
        if let Err(e) = file.read_to_end(&mut container) {
            tracing::warn!(entry = %name, "failed to read bundle entry: {e}");
            batch.record_failure(name, format!("Could not read the archive entry: {e}"));
            continue;
        }
        match import_document(&container) {
            Ok(envelope) => batch.record_success(envelope),
            Err(err) => batch.record_failure(name, err.user_message()),
        }
    }

    tracing::info!(
        imported = batch.documents.len(),
        failed = batch.reports.len(),
        "bundle imported"
    );
    Ok(batch)
}

/// Import several container files, isolating failures per file.
pub fn import_files<P: AsRef<Path>>(paths: &[P]) -> BatchImport {
    let mut batch = BatchImport::default();
    for path in paths {
        let path = path.as_ref();
        let filename = display_name(path);
        match read_container(path).and_then(|bytes| import_document(&bytes)) {
            Ok(envelope) => batch.record_success(envelope),
            Err(err) => {
                tracing::debug!(file = %filename, "import failed: {err}");
                batch.record_failure(filename, err.user_message());
            }
        }
    }
    batch
}

fn is_container_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(FILE_EXTENSION))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use todox_model::{TodoItem, TodoStatus};

    #[test]
    fn test_unique_entry_names() {
        let mut used = HashSet::new();
        assert_eq!(unique_entry_name("List", &mut used), "List.todolistx");
        assert_eq!(unique_entry_name("List", &mut used), "List_1.todolistx");
        assert_eq!(unique_entry_name("List", &mut used), "List_2.todolistx");
        assert_eq!(unique_entry_name("Other", &mut used), "Other.todolistx");
    }

    #[test]
    fn test_bundle_file_name() {
        assert_eq!(bundle_file_name(42), "myTodoLists_42.zip");
    }

    #[test]
    fn test_export_bundle_manifest() {
        let docs = vec![
            TodoDocument::new("1", "Groceries")
                .with_item(TodoItem::new("a", "Milk", TodoStatus::NotStarted))
                .with_item(TodoItem::new("b", "Eggs", TodoStatus::Completed)),
            TodoDocument::new("2", "Groceries"),
        ];
        let bytes = export_bundle(&docs, &ExportOptions::default()).unwrap();
        let manifest = read_bundle_manifest(&bytes).unwrap();
        assert_eq!(manifest.documents.len(), 2);
        assert_eq!(manifest.documents[0].name, "Groceries.todolistx");
        assert_eq!(manifest.documents[1].name, "Groceries_1.todolistx");
        assert_eq!(manifest.total_items(), 2);
    }

    #[test]
    fn test_import_bundle_isolates_bad_entries() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let good = export_document(&TodoDocument::new("1", "Good"), &ExportOptions::default())
            .unwrap();
        writer.start_file("good.todolistx", options).unwrap();
        writer.write_all(&good).unwrap();
        writer.start_file("bad.todolistx", options).unwrap();
        writer.write_all(b"short").unwrap();
        writer.start_file("notes.txt", options).unwrap();
        writer.write_all(b"ignored").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let batch = import_bundle(&bytes).unwrap();
        assert_eq!(batch.documents.len(), 1);
        assert_eq!(batch.documents[0].document.title, "Good");
        assert_eq!(batch.reports.len(), 1);
        assert_eq!(batch.reports[0].filename, "bad.todolistx");
    }

    /// Set the compression method of the first entry to an unknown value in
    /// both its local and central headers.
    fn corrupt_first_method(bytes: &mut [u8]) {
        const UNKNOWN_METHOD: [u8; 2] = 80u16.to_le_bytes();
        bytes[8..10].copy_from_slice(&UNKNOWN_METHOD);
        // End of central directory record, no comment: offset of the central
        // directory at +16.
        let eocd = bytes.len() - 22;
        let central =
            u32::from_le_bytes(bytes[eocd + 16..eocd + 20].try_into().unwrap()) as usize;
        assert_eq!(&bytes[central..central + 4], b"PK\x01\x02");
        bytes[central + 10..central + 12].copy_from_slice(&UNKNOWN_METHOD);
    }

    #[test]
    fn test_import_bundle_isolates_unopenable_entry() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (id, title) in [("1", "First"), ("2", "Second")] {
            let container =
                export_document(&TodoDocument::new(id, title), &ExportOptions::default())
                    .unwrap();
            writer
                .start_file(format!("{title}.todolistx"), options)
                .unwrap();
            writer.write_all(&container).unwrap();
        }
        let mut bytes = writer.finish().unwrap().into_inner();
        corrupt_first_method(&mut bytes);

        let batch = import_bundle(&bytes).unwrap();
        assert_eq!(batch.documents.len(), 1);
        assert_eq!(batch.documents[0].document.title, "Second");
        assert_eq!(batch.reports.len(), 1);
        assert_eq!(batch.reports[0].filename, "First.todolistx");
        assert!(batch.reports[0].error.contains("Could not open"));
    }

    #[test]
    fn test_import_bundle_rejects_non_zip() {
        assert!(matches!(
            import_bundle(b"not a zip archive"),
            Err(ContainerError::Bundle(_))
        ));
    }
}
