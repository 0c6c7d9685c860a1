//! Block compression for retrieved windows.
//!
//! A [`CompressedBlock`] pairs the compressed bytes with the exact number of
//! bytes fed to the encoder. Decoding checks that length strictly: a block
//! that inflates to anything else is an error, never a partial result.
//!
//! The declared length is untrusted. It is checked against
//! [`MAX_DECODED_LEN`] and, for LZ4, against the largest size the data could
//! possibly expand to before any output buffer is reserved.
//!
//! # Frame format
//!
//! For storage outside of a JSON response, [`encode_frame`] prefixes the data
//! with a fixed 13-byte header:
//!
//! ```text
//! offset  size  field
//! 0       2     magic "LW"
//! 2       1     frame version (1)
//! 3       1     codec id (1 = zstd, 2 = lz4)
//! 4       8     uncompressed length, u64 little-endian
//! 12      1     reserved (0)
//! 13      ..    compressed data
//! ```

use std::io::Read;

use crate::error::{Result, RetrievalError};
use crate::models::{CodecKind, CompressedBlock};

/// Default zstd compression level.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

const FRAME_MAGIC: &[u8; 2] = b"LW";
const FRAME_VERSION: u8 = 1;
/// Size of the frame header in bytes.
pub const FRAME_HEADER_LEN: usize = 13;

/// Largest uncompressed length a block may declare.
pub const MAX_DECODED_LEN: usize = 1 << 30;

/// An LZ4 block never inflates by more than this factor.
const LZ4_MAX_EXPANSION: usize = 255;

/// Initial reservation for streaming decodes.
const CHUNK_HINT: usize = 64 * 1024;

/// Compress `data` with `kind` at the default level.
pub fn encode(data: &[u8], kind: CodecKind) -> Result<CompressedBlock> {
    encode_with_level(data, kind, DEFAULT_ZSTD_LEVEL)
}

/// Compress `data`. `zstd_level` is ignored for LZ4.
///
/// Empty input is legal and yields a valid block.
pub fn encode_with_level(data: &[u8], kind: CodecKind, zstd_level: i32) -> Result<CompressedBlock> {
    let compressed = match kind {
        CodecKind::Zstd => zstd::stream::encode_all(data, zstd_level)
            .map_err(|e| RetrievalError::Codec(format!("zstd compression failed: {}", e)))?,
        CodecKind::Lz4 => lz4_flex::block::compress(data),
    };

    log::debug!(
        "{} encoded {} -> {} bytes",
        kind,
        data.len(),
        compressed.len()
    );

    Ok(CompressedBlock {
        codec: kind,
        data: compressed,
        uncompressed_length: data.len(),
    })
}

/// Decompress a block, requiring exactly `uncompressed_length` bytes out.
pub fn decode(block: &CompressedBlock) -> Result<Vec<u8>> {
    let expected = block.uncompressed_length;
    check_declared_length(block.codec, block.data.len(), expected)?;

    let out = match block.codec {
        CodecKind::Zstd => decode_zstd(&block.data, expected)?,
        CodecKind::Lz4 => decode_lz4(&block.data, expected)?,
    };

    if out.len() != expected {
        return Err(RetrievalError::Codec(format!(
            "length mismatch: block declares {} bytes but decodes to {}",
            expected,
            out.len()
        )));
    }
    Ok(out)
}

/// Reject declared lengths no valid block of `data_len` bytes could have.
fn check_declared_length(kind: CodecKind, data_len: usize, expected: usize) -> Result<()> {
    if expected > MAX_DECODED_LEN {
        return Err(RetrievalError::Codec(format!(
            "declared length {} exceeds the {} byte limit",
            expected, MAX_DECODED_LEN
        )));
    }
    if kind == CodecKind::Lz4 && expected > data_len.saturating_mul(LZ4_MAX_EXPANSION) {
        return Err(RetrievalError::Codec(format!(
            "declared length {} is impossible for a {} byte lz4 block",
            expected, data_len
        )));
    }
    Ok(())
}

fn reserve(out: &mut Vec<u8>, len: usize) -> Result<()> {
    out.try_reserve_exact(len)
        .map_err(|e| RetrievalError::Codec(format!("cannot allocate {} bytes: {}", len, e)))
}

/// Streaming zstd decode. The output grows with the data actually produced
/// and stops one byte past `expected`, so a block lying about its length
/// cannot force a large allocation.
fn decode_zstd(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let decoder = zstd::stream::read::Decoder::new(data)
        .map_err(|e| RetrievalError::Codec(format!("zstd init failed: {}", e)))?;

    let mut out = Vec::new();
    reserve(&mut out, expected.min(CHUNK_HINT))?;
    decoder
        .take((expected as u64).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| RetrievalError::Codec(format!("zstd block is corrupt: {}", e)))?;
    Ok(out)
}

fn decode_lz4(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    reserve(&mut out, expected)?;
    out.resize(expected, 0);
    let written = lz4_flex::block::decompress_into(data, &mut out)
        .map_err(|e| RetrievalError::Codec(format!("lz4 block is corrupt: {}", e)))?;
    out.truncate(written);
    Ok(out)
}

fn codec_id(kind: CodecKind) -> u8 {
    match kind {
        CodecKind::Zstd => 1,
        CodecKind::Lz4 => 2,
    }
}

fn codec_from_id(id: u8) -> Result<CodecKind> {
    match id {
        1 => Ok(CodecKind::Zstd),
        2 => Ok(CodecKind::Lz4),
        other => Err(RetrievalError::Codec(format!("unknown codec id {}", other))),
    }
}

/// Serialize a block with its length header.
pub fn encode_frame(block: &CompressedBlock) -> Vec<u8> {
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + block.data.len());
    out.extend_from_slice(FRAME_MAGIC);
    out.push(FRAME_VERSION);
    out.push(codec_id(block.codec));
    out.extend_from_slice(&(block.uncompressed_length as u64).to_le_bytes());
    out.push(0);
    out.extend_from_slice(&block.data);
    out
}

/// Parse a frame produced by [`encode_frame`]. The data is not decompressed.
pub fn decode_frame(frame: &[u8]) -> Result<CompressedBlock> {
    if frame.len() < FRAME_HEADER_LEN {
        return Err(RetrievalError::Codec(format!(
            "frame too short: {} bytes, header needs {}",
            frame.len(),
            FRAME_HEADER_LEN
        )));
    }
    if &frame[0..2] != FRAME_MAGIC {
        return Err(RetrievalError::Codec("bad frame magic".to_string()));
    }
    if frame[2] != FRAME_VERSION {
        return Err(RetrievalError::Codec(format!(
            "unsupported frame version {}",
            frame[2]
        )));
    }
    let codec = codec_from_id(frame[3])?;

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&frame[4..12]);
    let length = u64::from_le_bytes(len_bytes);
    let uncompressed_length = usize::try_from(length)
        .map_err(|_| RetrievalError::Codec(format!("declared length {} too large", length)))?;
    let data = &frame[FRAME_HEADER_LEN..];
    check_declared_length(codec, data.len(), uncompressed_length)?;

    Ok(CompressedBlock {
        codec,
        data: data.to_vec(),
        uncompressed_length,
    })
}
