//! Construction of export envelopes.

use chrono::{DateTime, SecondsFormat, Utc};
use todox_model::{
    ENVELOPE_VERSION, EnvelopeMetadata, SignedEnvelope, TodoDocument, UnsignedEnvelope,
};
use uuid::Uuid;

use crate::error::{ContainerError, Result};
use crate::integrity::{content_checksum, sha256_hex};
use crate::options::ExportOptions;

/// Build and sign the envelope for `document`.
pub fn build_envelope(
    document: &TodoDocument,
    options: &ExportOptions,
    created_at: DateTime<Utc>,
) -> Result<SignedEnvelope> {
    let metadata = EnvelopeMetadata {
        version: ENVELOPE_VERSION.to_string(),
        created_at: format_created_at(created_at),
        app_identifier: options.app_identifier.clone(),
        app_version: options.app_version.clone(),
        export_id: options
            .export_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        user_fingerprint: options
            .user_fingerprint
            .clone()
            .unwrap_or_else(user_fingerprint),
    };
    let visual = visual_signature(document)?;
    let unsigned = UnsignedEnvelope::new(metadata, document.clone(), visual);
    let checksum = content_checksum(&unsigned)?;
    Ok(unsigned.sign(checksum))
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_created_at(created_at: DateTime<Utc>) -> String {
    created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// SHA-256 over a description of the exporting host.
pub fn user_fingerprint() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default();
    let lang = std::env::var("LANG").unwrap_or_default();
    let components = [
        std::env::consts::OS,
        std::env::consts::ARCH,
        user.as_str(),
        lang.as_str(),
    ];
    sha256_hex(components.join("|").as_bytes())
}

/// `#rrggbb` colour derived from the document JSON.
///
/// Three string hashes over the UTF-16 code units give the channels. The
/// arithmetic matches the 32-bit wrapping and float accumulation of the
/// hashes older exports used, so identical documents get identical colours.
pub fn visual_signature(document: &TodoDocument) -> Result<String> {
    let json = serde_json::to_string(document).map_err(ContainerError::Serialization)?;
    Ok(visual_hash(&json))
}

fn visual_hash(text: &str) -> String {
    let mut hash_r: i32 = 5381;
    let mut hash_g: i64 = 52711;
    let mut hash_b: i64 = 1313;

    for unit in text.encode_utf16() {
        let c = i64::from(unit);
        hash_r = (hash_r.wrapping_shl(5).wrapping_add(hash_r)) ^ i32::from(unit);
        hash_g = i64::from(to_int32(hash_g).wrapping_shl(4)) + hash_g + c;
        let b32 = to_int32(hash_b);
        hash_b = c + i64::from(b32.wrapping_shl(6)) + i64::from(b32.wrapping_shl(16)) - hash_b;
    }

    let r = (i64::from(hash_r) % 256).abs();
    let g = (hash_g % 256).abs();
    let b = (hash_b % 256).abs();

    let boost = if r + g + b < 300 {
        150 + (r * 31 + g * 17 + b) % 105
    } else {
        0
    };
    let final_r = (r + if r < 100 { boost } else { 0 }).min(255);
    let final_g = (g + if g < 100 && r >= 100 { boost } else { 0 }).min(255);
    let final_b = (b + if b < 100 && r >= 100 && g >= 100 { boost } else { 0 }).min(255);

    format!("#{final_r:02x}{final_g:02x}{final_b:02x}")
}

/// Low 32 bits as a signed integer.
fn to_int32(value: i64) -> i32 {
    value as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use todox_model::{TodoItem, TodoStatus};

    #[test]
    fn test_created_at_format() {
        let when = DateTime::from_timestamp_millis(1_710_513_000_007).unwrap();
        assert_eq!(format_created_at(when), "2024-03-15T14:30:00.007Z");
    }

    #[test]
    fn test_visual_signature_shape_and_determinism() {
        let doc = TodoDocument::new("1", "A").with_item(TodoItem::new(
            "a",
            "Milk",
            TodoStatus::Completed,
        ));
        let first = visual_signature(&doc).unwrap();
        assert_eq!(first.len(), 7);
        assert!(first.starts_with('#'));
        assert!(first[1..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(visual_signature(&doc).unwrap(), first);
    }

    #[test]
    fn test_visual_hash_empty_input() {
        // r = 5381 % 256 = 5, g = 52711 % 256 = 231, b = 1313 % 256 = 33
        // sum 269 < 300: boost = 150 + (155 + 3927 + 33) % 105 = 150 + 20 = 170
        // r < 100 -> 175; g and b unchanged since r was < 100
        assert_eq!(visual_hash(""), "#afe721");
    }

    #[test]
    fn test_fingerprint_is_hex_digest() {
        let fp = user_fingerprint();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_build_envelope_uses_overrides() {
        let when = DateTime::from_timestamp_millis(0).unwrap();
        let options = ExportOptions::new()
            .with_export_id("export-1")
            .with_user_fingerprint("fp");
        let envelope = build_envelope(&TodoDocument::new("1", "A"), &options, when).unwrap();
        assert_eq!(envelope.metadata.base.export_id, "export-1");
        assert_eq!(envelope.metadata.base.user_fingerprint, "fp");
        assert_eq!(envelope.metadata.base.created_at, "1970-01-01T00:00:00.000Z");
        assert_eq!(envelope.content_checksum().len(), 64);
    }

    #[test]
    fn test_export_id_defaults_to_uuid() {
        let when = DateTime::from_timestamp_millis(0).unwrap();
        let envelope =
            build_envelope(&TodoDocument::new("1", "A"), &ExportOptions::default(), when).unwrap();
        assert!(Uuid::parse_str(&envelope.metadata.base.export_id).is_ok());
    }
}
