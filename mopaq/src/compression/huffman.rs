//! Canonical Huffman codec, mask bit 0x01.
//!
//! No off-the-shelf crate implements MPQ's specific adaptive Huffman
//! variant, so this is a from-scratch canonical Huffman coder: a per-sector
//! code-length table followed by a packed bitstream. Self-consistent, not
//! bit-compatible with the original adaptive coder.

use crate::error::{Error, Result};
use std::collections::HashMap;

struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    filled: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            current: 0,
            filled: 0,
        }
    }

    fn push_bits(&mut self, code: u32, length: u8) {
        for i in (0..length).rev() {
            let bit = (code >> i) & 1;
            self.current = (self.current << 1) | bit as u8;
            self.filled += 1;
            if self.filled == 8 {
                self.bytes.push(self.current);
                self.current = 0;
                self.filled = 0;
            }
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.current <<= 8 - self.filled;
            self.bytes.push(self.current);
        }
        self.bytes
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    fn next_bit(&mut self) -> Result<u8> {
        if self.byte_pos >= self.data.len() {
            return Err(Error::compression("huffman: bitstream exhausted"));
        }
        let byte = self.data[self.byte_pos];
        let bit = (byte >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
        Ok(bit)
    }
}

/// Builds code lengths for each of the 256 byte values present in `freq`,
/// via the standard package-merge-free greedy Huffman construction.
fn build_code_lengths(freq: &[u32; 256]) -> [u8; 256] {
    #[derive(Clone)]
    enum Node {
        Leaf(u8),
        Internal(Box<Node>, Box<Node>),
    }

    let mut heap: Vec<(u64, Node)> = freq
        .iter()
        .enumerate()
        .filter(|(_, &count)| count > 0)
        .map(|(symbol, &count)| (count as u64, Node::Leaf(symbol as u8)))
        .collect();

    if heap.is_empty() {
        return [0; 256];
    }

    if heap.len() == 1 {
        let mut lengths = [0u8; 256];
        if let Node::Leaf(symbol) = heap[0].1 {
            lengths[symbol as usize] = 1;
        }
        return lengths;
    }

    while heap.len() > 1 {
        heap.sort_by(|a, b| b.0.cmp(&a.0));
        let (w1, n1) = heap.pop().unwrap();
        let (w2, n2) = heap.pop().unwrap();
        heap.push((w1 + w2, Node::Internal(Box::new(n1), Box::new(n2))));
    }

    let mut lengths = [0u8; 256];
    fn walk(node: &Node, depth: u8, lengths: &mut [u8; 256]) {
        match node {
            Node::Leaf(symbol) => lengths[*symbol as usize] = depth.max(1),
            Node::Internal(left, right) => {
                walk(left, depth + 1, lengths);
                walk(right, depth + 1, lengths);
            }
        }
    }
    walk(&heap[0].1, 0, &mut lengths);
    lengths
}

/// Assigns canonical codes from a table of code lengths (0 = symbol unused).
fn canonical_codes(lengths: &[u8; 256]) -> HashMap<u8, (u32, u8)> {
    let mut symbols: Vec<(u8, u8)> = lengths
        .iter()
        .enumerate()
        .filter(|(_, &len)| len > 0)
        .map(|(symbol, &len)| (symbol as u8, len))
        .collect();
    symbols.sort_by_key(|&(symbol, len)| (len, symbol));

    let mut codes = HashMap::new();
    let mut code: u32 = 0;
    let mut prev_len = symbols.first().map(|&(_, len)| len).unwrap_or(0);

    for (symbol, len) in symbols {
        code <<= len - prev_len;
        codes.insert(symbol, (code, len));
        code += 1;
        prev_len = len;
    }

    codes
}

pub(super) fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }

    let lengths = build_code_lengths(&freq);
    let codes = canonical_codes(&lengths);

    let mut out = Vec::with_capacity(data.len() / 2 + 260);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&lengths);

    let mut writer = BitWriter::new();
    for &byte in data {
        let (code, len) = codes[&byte];
        writer.push_bits(code, len);
    }
    out.extend_from_slice(&writer.finish());

    Ok(out)
}

pub(super) fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    if data.len() < 4 + 256 {
        return Err(Error::compression("huffman: header truncated"));
    }

    let original_len = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
    if original_len != expected_size {
        return Err(Error::compression("huffman: size mismatch in header"));
    }

    let mut lengths = [0u8; 256];
    lengths.copy_from_slice(&data[4..260]);

    if original_len == 0 {
        return Ok(Vec::new());
    }

    let codes = canonical_codes(&lengths);
    let mut by_length: HashMap<(u8, u32), u8> = HashMap::new();
    for (&symbol, &(code, len)) in &codes {
        by_length.insert((len, code), symbol);
    }

    let mut reader = BitReader::new(&data[260..]);
    let mut out = Vec::with_capacity(original_len);

    while out.len() < original_len {
        let mut code: u32 = 0;
        let mut len: u8 = 0;
        loop {
            code = (code << 1) | reader.next_bit()? as u32;
            len += 1;
            if let Some(&symbol) = by_length.get(&(len, code)) {
                out.push(symbol);
                break;
            }
            if len > 32 {
                return Err(Error::compression("huffman: no matching code"));
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_repetitive() {
        let data = b"aaaaaaaaaabbbbbbbbccccccccdddddd".to_vec();
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn round_trip_single_symbol() {
        let data = vec![b'x'; 64];
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn round_trip_empty() {
        let data: Vec<u8> = Vec::new();
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed, 0).unwrap();
        assert_eq!(decompressed, data);
    }
}
