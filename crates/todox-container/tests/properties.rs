//! Property tests for the transform, the codec round trip and tamper detection.

use proptest::prelude::*;
use todox_container::header::{CHECKSUM_OFFSET, MAGIC};
use todox_container::transform::{transform_decode, transform_encode};
use todox_container::{ContainerError, ExportOptions, HEADER_LEN, export_document, import_document};
use todox_model::{TodoDocument, TodoItem, TodoStatus};

fn status() -> impl Strategy<Value = TodoStatus> {
    prop::sample::select(TodoStatus::ALL.to_vec())
}

fn document() -> impl Strategy<Value = TodoDocument> {
    (
        "[a-z0-9-]{1,12}",
        "\\PC{0,24}",
        "\\PC{0,40}",
        any::<i64>(),
        prop::collection::vec(("\\PC{0,30}", status()), 0..6),
    )
        .prop_map(|(id, title, text, time_stamp, items)| {
            items.into_iter().enumerate().fold(
                TodoDocument::new(id, title)
                    .with_text(text)
                    .with_time_stamp(time_stamp),
                |doc, (i, (subject, status))| {
                    doc.with_item(TodoItem::new(format!("item-{i}"), subject, status))
                },
            )
        })
}

fn exported(doc: &TodoDocument) -> Vec<u8> {
    export_document(doc, &ExportOptions::default().with_user_fingerprint("fp")).unwrap()
}

proptest! {
    #[test]
    fn transform_is_an_involution(bytes in prop::collection::vec(any::<u8>(), 1..512)) {
        let encoded = transform_encode(&bytes);
        prop_assert_eq!(encoded.len(), bytes.len());
        prop_assert_eq!(transform_decode(&encoded), bytes);
    }

    #[test]
    fn document_round_trips(doc in document()) {
        let envelope = import_document(&exported(&doc)).unwrap();
        prop_assert_eq!(envelope.document, doc);
    }

    #[test]
    fn payload_tamper_is_detected(doc in document(), pick in any::<prop::sample::Index>(), mask in 1u8..=255) {
        let mut bytes = exported(&doc);
        let offset = HEADER_LEN + pick.index(bytes.len() - HEADER_LEN);
        bytes[offset] ^= mask;

        let result = import_document(&bytes);
        prop_assert!(
            matches!(
                result,
                Err(ContainerError::ContentChecksumMismatch { .. } | ContainerError::CorruptPayload { .. })
            ),
            "offset {} mask {:#04x}: {:?}", offset, mask, result.map(|e| e.document)
        );
    }

    #[test]
    fn header_tamper_is_detected(offset in 0..CHECKSUM_OFFSET, mask in 1u8..=255) {
        let mut bytes = exported(&TodoDocument::new("1", "A"));
        bytes[offset] ^= mask;

        let result = import_document(&bytes);
        match offset {
            0..=3 => prop_assert!(
                matches!(result, Err(ContainerError::BadMagic { .. })),
                "offset {}", offset
            ),
            4 if bytes[4] > 1 => prop_assert!(
                matches!(result, Err(ContainerError::UnsupportedVersion(v)) if v == bytes[4]),
                "offset {}", offset
            ),
            _ => prop_assert!(
                matches!(result, Err(ContainerError::HeaderChecksumMismatch { .. })),
                "offset {}", offset
            ),
        }
    }

    #[test]
    fn short_input_is_too_small(bytes in prop::collection::vec(any::<u8>(), 0..HEADER_LEN)) {
        let len = bytes.len();
        prop_assert!(matches!(
            import_document(&bytes),
            Err(ContainerError::TooSmall { len: l }) if l == len
        ), "len {}", len);
    }

    #[test]
    fn major_version_two_is_rejected(rest in prop::collection::vec(any::<u8>(), HEADER_LEN - 5..256)) {
        let mut bytes = MAGIC.to_vec();
        bytes.push(2);
        bytes.extend_from_slice(&rest);
        prop_assert!(matches!(
            import_document(&bytes),
            Err(ContainerError::UnsupportedVersion(2))
        ));
    }
}

#[test]
fn scenario_minimal_document() {
    let doc = TodoDocument::new("1", "A");
    assert_eq!(doc.text, "");
    assert_eq!(doc.time_stamp, 0);
    assert!(doc.items.is_empty());

    let envelope = import_document(&exported(&doc)).unwrap();
    let (unsigned, checksum) = envelope.unsigned();
    assert_eq!(unsigned.document, doc);
    assert_eq!(checksum, envelope.content_checksum());
    assert_eq!(envelope.into_document(), doc);
}
