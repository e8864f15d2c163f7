//! Container encoding and staged, fail-fast decoding.
//!
//! Import walks a fixed sequence of checks:
//!
//! ```text
//! Unvalidated -> SizeChecked -> MagicChecked -> VersionChecked
//!             -> HeaderVerified -> Decoded -> ContentVerified
//! ```
//!
//! The first failing check rejects the container. Nothing is retried or
//! repaired.

use std::fmt;

use todox_model::{SignedEnvelope, TodoDocument};
use tracing::{debug, info, info_span, trace, warn};

use crate::envelope::build_envelope;
use crate::error::{ContainerError, Result};
use crate::header::{ContainerHeader, HEADER_LEN, HeaderFlags};
use crate::integrity::verify_content_checksum;
use crate::options::ExportOptions;
use crate::transform::{compress, decompress_payload, transform_decode, transform_encode};

/// Progress of a container through import validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImportStage {
    Unvalidated,
    SizeChecked,
    MagicChecked,
    VersionChecked,
    HeaderVerified,
    Decoded,
    ContentVerified,
}

impl ImportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStage::Unvalidated => "unvalidated",
            ImportStage::SizeChecked => "size-checked",
            ImportStage::MagicChecked => "magic-checked",
            ImportStage::VersionChecked => "version-checked",
            ImportStage::HeaderVerified => "header-verified",
            ImportStage::Decoded => "decoded",
            ImportStage::ContentVerified => "content-verified",
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A container whose header passed validation.
#[derive(Debug, Clone, Copy)]
pub struct ParsedContainer<'a> {
    pub header: ContainerHeader,
    /// Exactly `header.content_length()` bytes.
    pub payload: &'a [u8],
}

/// Encode `document` into container bytes.
pub fn export_document(document: &TodoDocument, options: &ExportOptions) -> Result<Vec<u8>> {
    let _span = info_span!("export", doc_id = %document.id).entered();
    document.validate()?;

    let created_at = options.resolve_created_at();
    let envelope = build_envelope(document, options, created_at)?;
    let json = serde_json::to_string(&envelope).map_err(ContainerError::Serialization)?;
    trace!(json_len = json.len(), "envelope serialized");

    let payload = encode_payload(json, options.flags)?;
    let content_length = u32::try_from(payload.len())
        .map_err(|_| ContainerError::PayloadTooLarge { len: payload.len() })?;

    let header = ContainerHeader::builder()
        .version_minor(options.version_minor)
        .flags(options.flags)
        .content_length(content_length)
        .created_at_ms(u64::try_from(created_at.timestamp_millis()).unwrap_or(0))
        .app_id(options.app_id)
        .build();

    let mut container = Vec::with_capacity(HEADER_LEN + payload.len());
    container.extend_from_slice(&header.to_bytes());
    container.extend_from_slice(&payload);

    info!(
        items = document.item_count(),
        bytes = container.len(),
        flags = %options.flags,
        "document exported"
    );
    Ok(container)
}

/// Validate the header and slice out the payload (import steps 1-5).
pub fn parse_container(data: &[u8]) -> Result<ParsedContainer<'_>> {
    let header = ContainerHeader::parse(data)?;

    let declared = header.content_length() as usize;
    let available = data.len() - HEADER_LEN;
    if declared > available {
        return Err(ContainerError::corrupt(format!(
            "declared content length {declared} exceeds the {available} bytes present"
        )));
    }
    if available > declared {
        debug!(
            trailing = available - declared,
            "ignoring bytes after declared payload"
        );
    }

    Ok(ParsedContainer {
        header,
        payload: &data[HEADER_LEN..HEADER_LEN + declared],
    })
}

/// Decode and fully verify a container (import steps 1-8).
pub fn import_document(data: &[u8]) -> Result<SignedEnvelope> {
    let _span = info_span!("import", len = data.len()).entered();
    match import_stages(data) {
        Ok(envelope) => {
            info!(
                doc_id = %envelope.document.id,
                items = envelope.document.item_count(),
                "document imported"
            );
            Ok(envelope)
        }
        Err(err) => {
            if let Some(stage) = err.stage() {
                warn!(stage = %stage, error = %err, "container rejected");
            }
            Err(err)
        }
    }
}

fn import_stages(data: &[u8]) -> Result<SignedEnvelope> {
    let parsed = parse_container(data)?;
    trace!(stage = %ImportStage::HeaderVerified, "stage reached");

    let json = decode_payload(parsed.payload, parsed.header.flags())?;
    let envelope: SignedEnvelope = serde_json::from_str(&json)
        .map_err(|e| ContainerError::corrupt(format!("invalid envelope JSON: {e}")))?;
    trace!(stage = %ImportStage::Decoded, "stage reached");

    verify_content_checksum(&envelope)?;
    trace!(stage = %ImportStage::ContentVerified, "stage reached");
    Ok(envelope)
}

fn encode_payload(json: String, flags: HeaderFlags) -> Result<Vec<u8>> {
    let bytes = if flags.contains(HeaderFlags::COMPRESSED) {
        compress(&json)?
    } else {
        json.into_bytes()
    };
    if flags.contains(HeaderFlags::TRANSFORMED) {
        Ok(transform_encode(&bytes))
    } else {
        Ok(bytes)
    }
}

fn decode_payload(payload: &[u8], flags: HeaderFlags) -> Result<String> {
    let bytes = if flags.contains(HeaderFlags::TRANSFORMED) {
        transform_decode(payload)
    } else {
        payload.to_vec()
    };
    if flags.contains(HeaderFlags::COMPRESSED) {
        decompress_payload(&bytes)
    } else {
        String::from_utf8(bytes)
            .map_err(|e| ContainerError::corrupt(format!("payload is not UTF-8: {e}")))
    }
}
