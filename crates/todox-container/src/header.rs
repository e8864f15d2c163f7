//! Fixed 32-byte container header.
//!
//! # Structure
//!
//! | Offset | Length | Field         | Description                              |
//! |--------|--------|---------------|------------------------------------------|
//! | 0-3    | 4      | magic         | `TDOX`                                   |
//! | 4      | 1      | version major | must be <= 1                             |
//! | 5      | 1      | version minor | informational                            |
//! | 6      | 1      | flags         | bit0 compressed, bit1 transformed        |
//! | 7      | 1      | reserved      | written as 0                             |
//! | 8-11   | 4      | content len   | u32 little-endian payload length         |
//! | 12-19  | 8      | created at    | u64 little-endian ms since epoch         |
//! | 20-23  | 4      | app id        | ASCII tag                                |
//! | 24-31  | 8      | checksum      | first 8 bytes of SHA-256 over 0-23       |
//!
//! A [`ContainerHeader`] can only be obtained from [`HeaderBuilder::build`]
//! or [`ContainerHeader::parse`], so its checksum always matches its fields.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::codec::ImportStage;
use crate::error::{ContainerError, Result};
use crate::integrity::header_checksum;

/// Header length in bytes.
pub const HEADER_LEN: usize = 32;

/// Offset of the checksum; also the length of the checksummed prefix.
pub const CHECKSUM_OFFSET: usize = 24;

/// Length of the truncated header checksum.
pub const CHECKSUM_LEN: usize = 8;

/// Format identification bytes.
pub const MAGIC: [u8; 4] = *b"TDOX";

/// Highest major version this reader accepts.
pub const SUPPORTED_MAJOR: u8 = 1;

/// Minor version written by this crate.
pub const CURRENT_MINOR: u8 = 0;

/// App tag written when the exporter does not override it.
pub const DEFAULT_APP_ID: [u8; 4] = *b"MTDO";

/// Header flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderFlags(u8);

impl HeaderFlags {
    /// Payload is a zlib stream.
    pub const COMPRESSED: HeaderFlags = HeaderFlags(0b01);
    /// Payload went through the keyed byte permutation. Older writers label
    /// this bit "encryption"; it provides no confidentiality.
    pub const TRANSFORMED: HeaderFlags = HeaderFlags(0b10);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: HeaderFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, other: HeaderFlags) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn without(self, other: HeaderFlags) -> Self {
        Self(self.0 & !other.0)
    }
}

impl Default for HeaderFlags {
    fn default() -> Self {
        Self::COMPRESSED.with(Self::TRANSFORMED)
    }
}

impl fmt::Display for HeaderFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::COMPRESSED) {
            names.push("compressed");
        }
        if self.contains(Self::TRANSFORMED) {
            names.push("transformed");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// A finalized, checksummed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    version_major: u8,
    version_minor: u8,
    flags: HeaderFlags,
    reserved: u8,
    content_length: u32,
    created_at_ms: u64,
    app_id: [u8; 4],
    checksum: [u8; CHECKSUM_LEN],
}

impl ContainerHeader {
    pub fn builder() -> HeaderBuilder {
        HeaderBuilder::default()
    }

    pub fn version_major(&self) -> u8 {
        self.version_major
    }

    pub fn version_minor(&self) -> u8 {
        self.version_minor
    }

    pub fn flags(&self) -> HeaderFlags {
        self.flags
    }

    pub fn content_length(&self) -> u32 {
        self.content_length
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.created_at_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    pub fn app_id(&self) -> [u8; 4] {
        self.app_id
    }

    /// App id as text, lossy for non-ASCII tags.
    pub fn app_id_str(&self) -> String {
        String::from_utf8_lossy(&self.app_id).into_owned()
    }

    pub fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        self.checksum
    }

    pub fn checksum_hex(&self) -> String {
        hex::encode(self.checksum)
    }

    /// Serialize to the on-disk layout.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut record = [0u8; HEADER_LEN];
        record[..CHECKSUM_OFFSET].copy_from_slice(&self.prefix_bytes());
        record[CHECKSUM_OFFSET..].copy_from_slice(&self.checksum);
        record
    }

    /// The checksummed part of the header (bytes 0-23).
    fn prefix_bytes(&self) -> [u8; CHECKSUM_OFFSET] {
        write_prefix(
            self.version_major,
            self.version_minor,
            self.flags,
            self.reserved,
            self.content_length,
            self.created_at_ms,
            self.app_id,
        )
    }

    /// Parse and verify a header.
    ///
    /// Checks run in a fixed order and stop at the first failure: size,
    /// magic, version, checksum.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(ContainerError::TooSmall { len: data.len() });
        }
        trace!(stage = %ImportStage::SizeChecked, len = data.len(), "stage reached");

        let magic = read_array::<4>(data, 0);
        if magic != MAGIC {
            return Err(ContainerError::BadMagic { found: magic });
        }
        trace!(stage = %ImportStage::MagicChecked, "stage reached");

        let version_major = data[4];
        if version_major > SUPPORTED_MAJOR {
            return Err(ContainerError::UnsupportedVersion(version_major));
        }
        trace!(stage = %ImportStage::VersionChecked, version_major, "stage reached");

        let prefix = read_array::<CHECKSUM_OFFSET>(data, 0);
        let stored = read_array::<CHECKSUM_LEN>(data, CHECKSUM_OFFSET);
        let computed = header_checksum(&prefix);
        if stored != computed {
            return Err(ContainerError::HeaderChecksumMismatch {
                expected: hex::encode(stored),
                actual: hex::encode(computed),
            });
        }
        trace!("header checksum verified");

        Ok(Self {
            version_major,
            version_minor: data[5],
            flags: HeaderFlags::from_bits(data[6]),
            reserved: data[7],
            content_length: u32::from_le_bytes(read_array::<4>(data, 8)),
            created_at_ms: u64::from_le_bytes(read_array::<8>(data, 12)),
            app_id: read_array::<4>(data, 20),
            checksum: stored,
        })
    }
}

/// Collects header fields; the checksum is computed once, in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    version_minor: u8,
    flags: HeaderFlags,
    content_length: u32,
    created_at_ms: u64,
    app_id: [u8; 4],
}

impl Default for HeaderBuilder {
    fn default() -> Self {
        Self {
            version_minor: CURRENT_MINOR,
            flags: HeaderFlags::default(),
            content_length: 0,
            created_at_ms: 0,
            app_id: DEFAULT_APP_ID,
        }
    }
}

impl HeaderBuilder {
    #[must_use]
    pub fn version_minor(mut self, minor: u8) -> Self {
        self.version_minor = minor;
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: HeaderFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn content_length(mut self, len: u32) -> Self {
        self.content_length = len;
        self
    }

    #[must_use]
    pub fn created_at_ms(mut self, millis: u64) -> Self {
        self.created_at_ms = millis;
        self
    }

    #[must_use]
    pub fn app_id(mut self, app_id: [u8; 4]) -> Self {
        self.app_id = app_id;
        self
    }

    /// Finalize the fields and compute the checksum over bytes 0-23.
    #[must_use]
    pub fn build(self) -> ContainerHeader {
        let prefix = write_prefix(
            SUPPORTED_MAJOR,
            self.version_minor,
            self.flags,
            0,
            self.content_length,
            self.created_at_ms,
            self.app_id,
        );
        ContainerHeader {
            version_major: SUPPORTED_MAJOR,
            version_minor: self.version_minor,
            flags: self.flags,
            reserved: 0,
            content_length: self.content_length,
            created_at_ms: self.created_at_ms,
            app_id: self.app_id,
            checksum: header_checksum(&prefix),
        }
    }
}

/// Convert a 4-character tag to header bytes; shorter tags are space-padded.
pub fn app_id_from_str(tag: &str) -> [u8; 4] {
    let mut out = [b' '; 4];
    let bytes = tag.as_bytes();
    let copy_len = bytes.len().min(4);
    out[..copy_len].copy_from_slice(&bytes[..copy_len]);
    out
}

#[allow(clippy::too_many_arguments)]
fn write_prefix(
    version_major: u8,
    version_minor: u8,
    flags: HeaderFlags,
    reserved: u8,
    content_length: u32,
    created_at_ms: u64,
    app_id: [u8; 4],
) -> [u8; CHECKSUM_OFFSET] {
    let mut prefix = [0u8; CHECKSUM_OFFSET];
    prefix[0..4].copy_from_slice(&MAGIC);
    prefix[4] = version_major;
    prefix[5] = version_minor;
    prefix[6] = flags.bits();
    prefix[7] = reserved;
    prefix[8..12].copy_from_slice(&content_length.to_le_bytes());
    prefix[12..20].copy_from_slice(&created_at_ms.to_le_bytes());
    prefix[20..24].copy_from_slice(&app_id);
    prefix
}

/// Copy a fixed-size field; callers have already checked `data.len() >= HEADER_LEN`.
fn read_array<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[offset..offset + N]);
    out
}
