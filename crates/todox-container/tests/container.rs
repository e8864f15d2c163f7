//! Integration tests for container export and import.

use chrono::DateTime;
use todox_container::{
    ContainerError, ContainerHeader, ExportOptions, HEADER_LEN, HeaderFlags, ImportStage,
    export_bundle, export_document, export_to_dir, import_bundle, import_document, import_files,
    parse_container, read_bundle_manifest, write_container,
};
use todox_model::{TodoDocument, TodoItem, TodoStatus};

fn pinned_options() -> ExportOptions {
    ExportOptions::new()
        .with_created_at(DateTime::from_timestamp_millis(1_710_513_000_000).unwrap())
        .with_export_id("00000000-0000-4000-8000-000000000000")
        .with_user_fingerprint("fingerprint")
        .with_app_version("0.1.0")
}

fn sample_document() -> TodoDocument {
    TodoDocument::new("doc-1", "Weekend")
        .with_text("Chores and errands")
        .with_time_stamp(1_710_500_000_000)
        .with_item(TodoItem::new("a", "Laundry", TodoStatus::Completed))
        .with_item(TodoItem::new("b", "Groceries", TodoStatus::InProgress))
        .with_item(TodoItem::new("c", "Call plumber", TodoStatus::Blocked))
}

#[test]
fn test_minimal_document_round_trip() {
    let doc = TodoDocument::new("1", "A");
    let bytes = export_document(&doc, &ExportOptions::default()).unwrap();
    let envelope = import_document(&bytes).unwrap();

    assert_eq!(envelope.document, doc);
    assert_eq!(envelope.format_signature, "MYTODO_FORMAT_V1");
    assert_eq!(envelope.metadata.base.version, "1.0");
    assert_eq!(envelope.metadata.base.app_identifier, "MyPersonalTodoApp");
    assert_eq!(envelope.content_checksum().len(), 64);
}

#[test]
fn test_envelope_metadata_survives() {
    let bytes = export_document(&sample_document(), &pinned_options()).unwrap();
    let envelope = import_document(&bytes).unwrap();
    let metadata = &envelope.metadata.base;

    assert_eq!(metadata.created_at, "2024-03-15T14:30:00.000Z");
    assert_eq!(metadata.export_id, "00000000-0000-4000-8000-000000000000");
    assert_eq!(metadata.user_fingerprint, "fingerprint");
    assert!(envelope.visual_signature.starts_with('#'));
    assert_eq!(envelope.document.item_count(), 3);
}

#[test]
fn test_header_fields() {
    let bytes = export_document(&sample_document(), &pinned_options()).unwrap();
    assert_eq!(&bytes[..4], b"TDOX");

    let header = ContainerHeader::parse(&bytes).unwrap();
    assert_eq!(header.version_major(), 1);
    assert_eq!(header.version_minor(), 0);
    assert_eq!(header.flags(), HeaderFlags::COMPRESSED.with(HeaderFlags::TRANSFORMED));
    assert_eq!(header.content_length() as usize, bytes.len() - HEADER_LEN);
    assert_eq!(header.created_at_ms(), 1_710_513_000_000);
    assert_eq!(header.app_id_str(), "MTDO");
}

#[test]
fn test_custom_app_id_and_minor() {
    let options = pinned_options().with_app_id(*b"TEST").with_version_minor(3);
    let bytes = export_document(&sample_document(), &options).unwrap();
    let parsed = parse_container(&bytes).unwrap();
    assert_eq!(parsed.header.app_id(), *b"TEST");
    assert_eq!(parsed.header.version_minor(), 3);
    assert!(import_document(&bytes).is_ok());
}

#[test]
fn test_too_small() {
    let err = import_document(&[0u8; 10]).unwrap_err();
    assert!(matches!(err, ContainerError::TooSmall { len: 10 }));
    assert_eq!(err.stage(), Some(ImportStage::Unvalidated));
    insta::assert_snapshot!(err.to_string(), @"container too small: 10 bytes, header needs 32");
}

#[test]
fn test_bad_magic() {
    let mut bytes = export_document(&sample_document(), &pinned_options()).unwrap();
    bytes[..4].copy_from_slice(b"PK\x03\x04");
    let err = import_document(&bytes).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"not a todo container: magic bytes 504b0304");
    assert_eq!(err.user_message(), "Invalid file format: not a todo file.");
}

#[test]
fn test_newer_major_version() {
    let mut bytes = export_document(&sample_document(), &pinned_options()).unwrap();
    bytes[4] = 2;
    let err = import_document(&bytes).unwrap_err();
    assert!(matches!(err, ContainerError::UnsupportedVersion(2)));
}

#[test]
fn test_reserved_byte_is_checksummed() {
    let mut bytes = export_document(&sample_document(), &pinned_options()).unwrap();
    bytes[7] = 0xff;
    assert!(matches!(
        import_document(&bytes),
        Err(ContainerError::HeaderChecksumMismatch { .. })
    ));
}

#[test]
fn test_stored_checksum_edit() {
    // Re-sign a modified envelope with a stale checksum and a valid header.
    let doc = sample_document();
    let bytes = export_document(&doc, &pinned_options().with_flags(HeaderFlags::empty())).unwrap();
    let json = std::str::from_utf8(&bytes[HEADER_LEN..]).unwrap();
    let edited = json.replace("Laundry", "Dishes!");
    assert_eq!(edited.len(), json.len());

    let header = ContainerHeader::builder()
        .flags(HeaderFlags::empty())
        .content_length(edited.len() as u32)
        .build();
    let mut tampered = header.to_bytes().to_vec();
    tampered.extend_from_slice(edited.as_bytes());

    let err = import_document(&tampered).unwrap_err();
    assert!(matches!(err, ContainerError::ContentChecksumMismatch { .. }));
    assert_eq!(err.stage(), Some(ImportStage::Decoded));
}

#[test]
fn test_legacy_base64_payload_imports() {
    // Older exporters embedded base64 text of the zlib stream.
    let doc = sample_document();
    let plain = export_document(&doc, &pinned_options().with_flags(HeaderFlags::empty())).unwrap();
    let json = std::str::from_utf8(&plain[HEADER_LEN..]).unwrap();

    let legacy_text = todox_container::transform::compress_to_base64(json).unwrap();
    let payload = todox_container::transform::transform_encode(legacy_text.as_bytes());
    let header = ContainerHeader::builder()
        .content_length(payload.len() as u32)
        .build();
    let mut container = header.to_bytes().to_vec();
    container.extend_from_slice(&payload);

    assert_eq!(import_document(&container).unwrap().document, doc);
}

#[test]
fn test_import_files_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good = export_to_dir(&sample_document(), dir.path(), &pinned_options()).unwrap();
    let bad = dir.path().join("broken.todolistx");
    write_container(&bad, b"TDOX but far too short").unwrap();
    let missing = dir.path().join("missing.todolistx");

    let batch = import_files(&[good, bad, missing]);
    assert_eq!(batch.documents.len(), 1);
    assert_eq!(batch.reports.len(), 2);
    assert_eq!(batch.reports[0].filename, "broken.todolistx");
    assert_eq!(
        batch.reports[0].error,
        "Invalid file: too small to be a valid todo file."
    );
    assert_eq!(batch.reports[1].filename, "missing.todolistx");
}

#[test]
fn test_bundle_round_trip() {
    let docs = vec![
        sample_document(),
        TodoDocument::new("doc-2", "Work").with_item(TodoItem::new(
            "x",
            "Review",
            TodoStatus::NotStarted,
        )),
    ];
    let bytes = export_bundle(&docs, &pinned_options()).unwrap();

    let manifest = read_bundle_manifest(&bytes).unwrap();
    insta::assert_json_snapshot!(manifest, @r#"
    {
      "exportDate": "2024-03-15T14:30:00.000Z",
      "appVersion": "0.1.0",
      "documents": [
        {
          "name": "Weekend.todolistx",
          "itemCount": 3
        },
        {
          "name": "Work.todolistx",
          "itemCount": 1
        }
      ]
    }
    "#);

    let batch = import_bundle(&bytes).unwrap();
    assert!(batch.is_clean());
    let imported: Vec<_> = batch.documents.into_iter().map(|e| e.document).collect();
    assert_eq!(imported, docs);
}
