//! Block decompression for W3G replay bodies.
//!
//! The replay body is stored as a sequence of independently zlib-compressed
//! blocks, each preceded by a small framing header:
//!
//! | Field | Legacy | Version >= 10032 |
//! |-------|--------|------------------|
//! | compressed size | u16 | u32 |
//! | expected decompressed size | u16 | u32 |
//! | checksum (ignored) | u32 | u32 |
//!
//! Each block inflates on its own; the results are concatenated, in order,
//! into one buffer that the record stream decoder consumes sequentially.
//! A block that inflates to a length other than its declared size fails the
//! decode, naming the offending block index.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::{DecodeError, Result};
use crate::reader::ByteReader;

/// Nominal decompressed size of a full block (8 KiB). Used only to pre-size
/// the output buffer; short final blocks are normal.
pub const BLOCK_SIZE_HINT: usize = 0x2000;

/// Inflates `block_count` framed blocks into one contiguous buffer.
///
/// `new_format` selects the widened 32-bit framing fields used by versions
/// at or past 10032 (see [`Header::uses_new_block_format`]).
///
/// [`Header::uses_new_block_format`]: crate::header::Header::uses_new_block_format
///
/// # Errors
///
/// - `DecodeError::UnexpectedEof` if a frame or its payload is truncated
/// - `DecodeError::Decompression` if a block's zlib stream is invalid or
///   inflates to a length other than the declared one
pub fn decompress_blocks(
    r: &mut ByteReader<'_>,
    block_count: u32,
    new_format: bool,
) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(block_count as usize * BLOCK_SIZE_HINT);

    for block in 0..block_count as usize {
        inflate_block(r, new_format, block, &mut body)
            .map_err(|e| e.context(format!("block {block}")))?;
    }

    Ok(body)
}

/// Reads one framed block and appends its inflated payload to `out`.
fn inflate_block(
    r: &mut ByteReader<'_>,
    new_format: bool,
    block: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    let compressed_len = if new_format {
        r.read_u32_le()? as usize
    } else {
        r.read_u16_le()? as usize
    };
    let expected_len = if new_format {
        r.read_u32_le()? as usize
    } else {
        r.read_u16_le()? as usize
    };

    // checksum, uninterpreted
    r.read_u32_le()?;

    let compressed = r.read_bytes(compressed_len)?;

    let mut inflated = Vec::with_capacity(expected_len);
    let mut decoder = ZlibDecoder::new(compressed);
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| DecodeError::decompression(block, e.to_string()))?;

    if inflated.len() != expected_len {
        return Err(DecodeError::decompression(
            block,
            format!(
                "inflated {} bytes, declared {expected_len}",
                inflated.len()
            ),
        ));
    }

    out.extend_from_slice(&inflated);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    /// Compresses `payload` with zlib.
    fn deflate(payload: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        encoder.finish().unwrap()
    }

    /// Frames one block in legacy (16-bit) framing.
    fn frame_legacy(payload: &[u8], declared_len: u16) -> Vec<u8> {
        let compressed = deflate(payload);
        let mut data = Vec::new();
        data.extend_from_slice(&(compressed.len() as u16).to_le_bytes());
        data.extend_from_slice(&declared_len.to_le_bytes());
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]); // checksum
        data.extend_from_slice(&compressed);
        data
    }

    /// Frames one block in the widened (32-bit) framing.
    fn frame_new(payload: &[u8], declared_len: u32) -> Vec<u8> {
        let compressed = deflate(payload);
        let mut data = Vec::new();
        data.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        data.extend_from_slice(&declared_len.to_le_bytes());
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
        data.extend_from_slice(&compressed);
        data
    }

    #[test]
    fn test_single_legacy_block() {
        let data = frame_legacy(b"Test", 4);
        let mut r = ByteReader::new(&data);

        let body = decompress_blocks(&mut r, 1, false).unwrap();
        assert_eq!(body, b"Test");
        assert!(r.is_empty());
    }

    #[test]
    fn test_single_new_format_block() {
        let data = frame_new(b"Test", 4);
        let mut r = ByteReader::new(&data);

        let body = decompress_blocks(&mut r, 1, true).unwrap();
        assert_eq!(body, b"Test");
    }

    #[test]
    fn test_blocks_concatenate_in_order() {
        let mut data = frame_legacy(b"alpha ", 6);
        data.extend_from_slice(&frame_legacy(b"beta", 4));
        let mut r = ByteReader::new(&data);

        let body = decompress_blocks(&mut r, 2, false).unwrap();
        assert_eq!(body, b"alpha beta");
    }

    #[test]
    fn test_declared_length_mismatch_names_block() {
        let mut data = frame_legacy(b"first", 5);
        // second block declares 100 bytes but carries 4
        data.extend_from_slice(&frame_legacy(b"Test", 100));
        let mut r = ByteReader::new(&data);

        let err = decompress_blocks(&mut r, 2, false).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("block 1"), "got: {message}");
        assert!(message.contains("declared 100"), "got: {message}");
    }

    #[test]
    fn test_invalid_zlib_stream() {
        let mut data = Vec::new();
        data.extend_from_slice(&4u16.to_le_bytes()); // compressed size
        data.extend_from_slice(&4u16.to_le_bytes()); // declared size
        data.extend_from_slice(&[0, 0, 0, 0]); // checksum
        data.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]); // not zlib

        let mut r = ByteReader::new(&data);
        let err = decompress_blocks(&mut r, 1, false).unwrap_err();
        assert!(err.to_string().contains("block 0"));
    }

    #[test]
    fn test_truncated_payload() {
        let mut data = frame_legacy(b"Test", 4);
        data.truncate(data.len() - 2);

        let mut r = ByteReader::new(&data);
        let err = decompress_blocks(&mut r, 1, false).unwrap_err();
        assert!(err.to_string().contains("block 0"));
    }

    #[test]
    fn test_truncated_frame_header() {
        let data = [0x10u8, 0x00, 0x00]; // half a legacy frame
        let mut r = ByteReader::new(&data);
        assert!(decompress_blocks(&mut r, 1, false).is_err());
    }

    #[test]
    fn test_zero_blocks_is_empty() {
        let mut r = ByteReader::new(&[]);
        let body = decompress_blocks(&mut r, 0, false).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_framing_width_differs_per_format() {
        // The same payload framed both ways round-trips only with the
        // matching format flag.
        let legacy = frame_legacy(b"Test", 4);
        let mut r = ByteReader::new(&legacy);
        assert!(decompress_blocks(&mut r, 1, true).is_err());

        let new = frame_new(b"Test", 4);
        let mut r = ByteReader::new(&new);
        assert!(decompress_blocks(&mut r, 1, false).is_err());
    }
}
