//! SHA-256 digests guarding the header and the envelope content.

use sha2::{Digest, Sha256};
use todox_model::{SignedEnvelope, UnsignedEnvelope};
use tracing::debug;

use crate::error::{ContainerError, Result};
use crate::header::{CHECKSUM_LEN, CHECKSUM_OFFSET};

/// Computes the SHA-256 digest of `data`.
#[must_use]
pub fn digest(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes the lowercase hex SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(digest(data))
}

/// First eight digest bytes over the checksummed header prefix.
#[must_use]
pub fn header_checksum(prefix: &[u8; CHECKSUM_OFFSET]) -> [u8; CHECKSUM_LEN] {
    let full = digest(prefix);
    let mut truncated = [0u8; CHECKSUM_LEN];
    truncated.copy_from_slice(&full[..CHECKSUM_LEN]);
    truncated
}

/// Hex digest over the compact JSON form of an unsigned envelope.
pub fn content_checksum(envelope: &UnsignedEnvelope) -> Result<String> {
    let json = serde_json::to_string(envelope).map_err(ContainerError::Serialization)?;
    Ok(sha256_hex(json.as_bytes()))
}

/// Recompute the content checksum with the stored value stripped and compare.
pub fn verify_content_checksum(envelope: &SignedEnvelope) -> Result<()> {
    let (unsigned, stored) = envelope.unsigned();
    let actual = content_checksum(&unsigned)?;
    if actual != stored {
        return Err(ContainerError::ContentChecksumMismatch {
            expected: stored.to_string(),
            actual,
        });
    }
    debug!(checksum = %actual, "content checksum verified");
    Ok(())
}
