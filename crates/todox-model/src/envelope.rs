//! Export envelope: the JSON structure that is compressed into a container.
//!
//! An envelope is either unsigned (no content checksum yet) or signed. The
//! checksum is computed over the serialized unsigned form, so the two states
//! are separate types and moving between them is a pure function.

use serde::{Deserialize, Serialize};

use crate::document::TodoDocument;

/// Constant tag written into every envelope.
pub const FORMAT_SIGNATURE: &str = "MYTODO_FORMAT_V1";

/// Envelope schema version.
pub const ENVELOPE_VERSION: &str = "1.0";

/// Application identifier written when the exporter does not override it.
pub const DEFAULT_APP_IDENTIFIER: &str = "MyPersonalTodoApp";

/// Export metadata without a content checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    pub version: String,
    /// RFC 3339 timestamp with millisecond precision.
    pub created_at: String,
    pub app_identifier: String,
    pub app_version: String,
    pub export_id: String,
    pub user_fingerprint: String,
}

/// Export metadata carrying the content checksum.
///
/// `contentChecksum` serializes after the base fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedEnvelopeMetadata {
    #[serde(flatten)]
    pub base: EnvelopeMetadata,
    /// Hex SHA-256 of the unsigned envelope. Missing on the wire reads as
    /// empty, which never matches a recomputed digest.
    #[serde(default)]
    pub content_checksum: String,
}

/// The logical export structure, generic over its metadata state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope<M> {
    pub format_signature: String,
    pub metadata: M,
    #[serde(rename = "todo")]
    pub document: TodoDocument,
    pub visual_signature: String,
}

pub type UnsignedEnvelope = ExportEnvelope<EnvelopeMetadata>;
pub type SignedEnvelope = ExportEnvelope<SignedEnvelopeMetadata>;

impl UnsignedEnvelope {
    pub fn new(
        metadata: EnvelopeMetadata,
        document: TodoDocument,
        visual_signature: impl Into<String>,
    ) -> Self {
        Self {
            format_signature: FORMAT_SIGNATURE.to_string(),
            metadata,
            document,
            visual_signature: visual_signature.into(),
        }
    }

    /// Attach a content checksum.
    #[must_use]
    pub fn sign(self, content_checksum: impl Into<String>) -> SignedEnvelope {
        ExportEnvelope {
            format_signature: self.format_signature,
            metadata: SignedEnvelopeMetadata {
                base: self.metadata,
                content_checksum: content_checksum.into(),
            },
            document: self.document,
            visual_signature: self.visual_signature,
        }
    }
}

impl SignedEnvelope {
    pub fn content_checksum(&self) -> &str {
        &self.metadata.content_checksum
    }

    /// Split off the checksum, yielding the envelope it was computed over.
    pub fn unsigned(&self) -> (UnsignedEnvelope, &str) {
        let unsigned = ExportEnvelope {
            format_signature: self.format_signature.clone(),
            metadata: self.metadata.base.clone(),
            document: self.document.clone(),
            visual_signature: self.visual_signature.clone(),
        };
        (unsigned, &self.metadata.content_checksum)
    }

    pub fn into_document(self) -> TodoDocument {
        self.document
    }
}
