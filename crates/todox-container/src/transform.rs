//! Content transform pipeline: zlib compression and the keyed byte permutation.
//!
//! The permutation is obfuscation, not encryption. It is length-preserving and
//! position-dependent; a rolling modifier is folded over the *plain* bytes, so
//! the decoder updates it with each byte it has just recovered.

use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{ContainerError, Result};

/// Static key cycled over the payload.
const TRANSFORM_KEY: [u8; 8] = [0x3f, 0x8d, 0x2c, 0xa5, 0x76, 0xe1, 0x19, 0xb4];

/// Modulus of the rolling modifier.
const MODIFIER_PRIME: u32 = 251;

/// Compress UTF-8 text into a zlib stream.
pub fn compress(text: &str) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(ContainerError::Compression)?;
    encoder.finish().map_err(ContainerError::Compression)
}

/// Inflate a zlib stream and decode it as UTF-8.
pub fn decompress(data: &[u8]) -> Result<String> {
    let mut decoder = ZlibDecoder::new(data);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| ContainerError::corrupt(format!("decompression failed: {e}")))?;
    String::from_utf8(inflated)
        .map_err(|e| ContainerError::corrupt(format!("payload is not UTF-8: {e}")))
}

/// Compress and encode as base64, for storage as a string.
pub fn compress_to_base64(text: &str) -> Result<String> {
    compress(text).map(|data| STANDARD.encode(data))
}

/// Inverse of [`compress_to_base64`].
pub fn decompress_from_base64(encoded: &str) -> Result<String> {
    let data = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ContainerError::corrupt(format!("invalid base64: {e}")))?;
    decompress(&data)
}

/// Rolling state shared by encoder and decoder.
#[derive(Debug, Clone, Copy)]
struct Modifier(u32);

impl Modifier {
    fn seed(len: usize) -> Self {
        Self((len % MODIFIER_PRIME as usize) as u32 + 7)
    }

    fn key_at(self, index: usize) -> u8 {
        let key_byte = TRANSFORM_KEY[index % TRANSFORM_KEY.len()];
        key_byte.wrapping_add(index as u8) ^ self.0 as u8
    }

    fn advance(self, plain: u8) -> Self {
        Self((self.0 * 17 + u32::from(plain) * 13) % MODIFIER_PRIME)
    }
}

/// Rotation amount for a position: 1, 2, 3 cycling.
fn rotation(index: usize) -> u32 {
    (index % 3) as u32 + 1
}

/// Apply the keyed permutation.
#[must_use]
pub fn transform_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    data.iter()
        .enumerate()
        .fold(Modifier::seed(data.len()), |modifier, (i, &plain)| {
            let mixed = plain ^ modifier.key_at(i);
            out.push(mixed.rotate_left(rotation(i)));
            modifier.advance(plain)
        });
    out
}

/// Reverse [`transform_encode`].
#[must_use]
pub fn transform_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    data.iter()
        .enumerate()
        .fold(Modifier::seed(data.len()), |modifier, (i, &encoded)| {
            let plain = encoded.rotate_right(rotation(i)) ^ modifier.key_at(i);
            out.push(plain);
            modifier.advance(plain)
        });
    out
}

/// Decompress a decoded payload.
///
/// Older exporters stored the base64 text of the zlib stream instead of the
/// raw stream; that form is accepted when the raw read fails.
pub(crate) fn decompress_payload(data: &[u8]) -> Result<String> {
    match decompress(data) {
        Ok(text) => Ok(text),
        Err(raw_err) => {
            let Ok(text) = std::str::from_utf8(data) else {
                return Err(raw_err);
            };
            decompress_from_base64(text).map_err(|_| raw_err)
        }
    }
}
