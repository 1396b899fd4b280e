//! LZMA codec, mask bit 0x12. Exclusive: the caller must not combine this
//! bit with any other in a sector's mask.

use crate::error::{Error, Result};
use std::io::Cursor;

pub(super) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut input = Cursor::new(data);
    let mut output = Vec::new();
    lzma_rs::lzma_compress(&mut input, &mut output)
        .map_err(|e| Error::compression(format!("lzma compress: {e}")))?;
    Ok(output)
}

pub(super) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut input = Cursor::new(data);
    let mut output = Vec::with_capacity(expected_size);
    lzma_rs::lzma_decompress(&mut input, &mut output)
        .map_err(|e| Error::compression(format!("lzma decompress: {e}")))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"lzma round trip payload, repeated for compressibility ".repeat(6);
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }
}
