//! Per-sector compression: a one-byte mask selects a fixed-order stack of
//! codecs.

mod adpcm;
mod bzip2_codec;
mod huffman;
mod lzma_codec;
mod pkware;
mod sparse;
mod zlib_codec;

use crate::error::{Error, Result};

/// Mask bits, in the fixed composition order used by [`compress_sector`] and
/// reversed by [`decompress_sector`].
pub mod flags {
    /// IMA ADPCM, mono.
    pub const ADPCM_MONO: u8 = 0x40;
    /// IMA ADPCM, stereo.
    pub const ADPCM_STEREO: u8 = 0x80;
    /// MPQ Huffman coder.
    pub const HUFFMAN: u8 = 0x01;
    /// zlib/deflate.
    pub const ZLIB: u8 = 0x02;
    /// Legacy PKWARE implode, used as one stage of a composed mask.
    pub const PKWARE: u8 = 0x08;
    /// bzip2.
    pub const BZIP2: u8 = 0x10;
    /// LZMA. Exclusive: no other bit may be set alongside it.
    pub const LZMA: u8 = 0x12;
    /// Zero-run-length ("sparse") encoding.
    pub const SPARSE: u8 = 0x20;

    /// Composition order: applied bottom-up on compress, top-down on decompress.
    pub const COMPOSE_ORDER: [u8; 8] = [
        ADPCM_MONO,
        ADPCM_STEREO,
        HUFFMAN,
        ZLIB,
        PKWARE,
        BZIP2,
        LZMA,
        SPARSE,
    ];
}

/// Compresses one sector's worth of data, trying each bit of `mask` in
/// [`flags::COMPOSE_ORDER`]. Returns `None` if the composed result is not
/// smaller than `data` (the caller should then store the sector verbatim,
/// with no mask byte).
pub fn compress_sector(data: &[u8], mask: u8) -> Result<Option<Vec<u8>>> {
    if mask == 0 {
        return Ok(None);
    }

    let mut buffer = data.to_vec();
    for &bit in flags::COMPOSE_ORDER.iter() {
        if mask & bit == 0 {
            continue;
        }
        buffer = apply_compress(bit, &buffer)?;
    }

    if buffer.len() >= data.len() {
        return Ok(None);
    }

    let mut out = Vec::with_capacity(buffer.len() + 1);
    out.push(mask);
    out.extend_from_slice(&buffer);
    Ok(Some(out))
}

/// Decompresses a sector whose first byte is the compression mask, per
/// The mask's first byte selects the stack; `expected_size` is the sector's decompressed size.
pub fn decompress_sector(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(Error::compression("empty compressed sector"));
    }

    let mask = data[0];
    let mut buffer = data[1..].to_vec();

    for &bit in flags::COMPOSE_ORDER.iter().rev() {
        if mask & bit == 0 {
            continue;
        }
        buffer = apply_decompress(bit, &buffer, expected_size)?;
    }

    if buffer.len() != expected_size {
        return Err(Error::compression(format!(
            "decompressed sector size mismatch: got {}, expected {}",
            buffer.len(),
            expected_size
        )));
    }

    Ok(buffer)
}

/// Decompresses a block stored with the legacy IMPLODE flag: raw PKWARE
/// implode data with no leading mask byte.
pub fn explode_legacy(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    pkware::explode(data, expected_size)
}

/// Compresses a block for the legacy IMPLODE flag.
pub fn implode_legacy(data: &[u8]) -> Result<Vec<u8>> {
    pkware::implode(data)
}

fn apply_compress(bit: u8, data: &[u8]) -> Result<Vec<u8>> {
    match bit {
        flags::ADPCM_MONO => adpcm::compress_mono(data),
        flags::ADPCM_STEREO => adpcm::compress_stereo(data),
        flags::HUFFMAN => huffman::compress(data),
        flags::ZLIB => zlib_codec::compress(data),
        flags::PKWARE => pkware::implode(data),
        flags::BZIP2 => bzip2_codec::compress(data),
        flags::LZMA => lzma_codec::compress(data),
        flags::SPARSE => sparse::compress(data),
        _ => Err(Error::compression(format!("unknown compression bit 0x{bit:02X}"))),
    }
}

fn apply_decompress(bit: u8, data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    match bit {
        flags::ADPCM_MONO => adpcm::decompress_mono(data, expected_size),
        flags::ADPCM_STEREO => adpcm::decompress_stereo(data, expected_size),
        flags::HUFFMAN => huffman::decompress(data, expected_size),
        flags::ZLIB => zlib_codec::decompress(data, expected_size),
        flags::PKWARE => pkware::explode(data, expected_size),
        flags::BZIP2 => bzip2_codec::decompress(data, expected_size),
        flags::LZMA => lzma_codec::decompress(data, expected_size),
        flags::SPARSE => sparse::decompress(data, expected_size),
        _ => Err(Error::compression(format!("unknown compression bit 0x{bit:02X}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_single_codec() {
        let data = b"the quick brown fox jumps over the lazy dog, again and again and again";
        let compressed = compress_sector(data, flags::ZLIB).unwrap().unwrap();
        assert_eq!(compressed[0], flags::ZLIB);
        let decompressed = decompress_sector(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn round_trips_composed_mask() {
        let data = vec![0u8; 200].into_iter().chain(b"payload".iter().copied()).collect::<Vec<u8>>();
        let mask = flags::SPARSE | flags::ZLIB;
        let compressed = compress_sector(&data, mask).unwrap();
        if let Some(compressed) = compressed {
            let decompressed = decompress_sector(&compressed, data.len()).unwrap();
            assert_eq!(decompressed, data);
        }
    }

    #[test]
    fn incompressible_data_returns_none() {
        // Small, high-entropy-ish input that won't shrink under any codec here.
        let data: Vec<u8> = (0..16u8).collect();
        let result = compress_sector(&data, flags::ZLIB).unwrap();
        assert!(result.is_none() || result.unwrap().len() < data.len());
    }
}
