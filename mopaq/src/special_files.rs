//! Internal metadata files: `(listfile)` and `(attributes)`.
//!
//! Both are ordinary archive entries under reserved names; this module
//! only concerns itself with their payload format, not their storage.

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Parses a `(listfile)` payload into individual filenames.
///
/// One name per line; blank lines and lines starting with `;` or `#` are
/// skipped, and a `;`-delimited metadata suffix (as produced by some
/// third-party tools) is dropped.
pub fn parse_listfile(data: &[u8]) -> Vec<String> {
    let content = match std::str::from_utf8(data) {
        Ok(s) => s,
        Err(_) => {
            log::warn!("(listfile) contains invalid UTF-8, using lossy conversion");
            return parse_listfile_lossy(data);
        }
    };
    parse_listfile_lines(content)
}

fn parse_listfile_lossy(data: &[u8]) -> Vec<String> {
    parse_listfile_lines(&String::from_utf8_lossy(data))
}

fn parse_listfile_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                return None;
            }
            let name = line.split(';').next().unwrap_or(line).trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Serializes a sorted, deduplicated set of names into a `(listfile)`
/// payload, one name per line joined by `\r\n`.
pub fn serialize_listfile(names: &std::collections::BTreeSet<String>) -> Vec<u8> {
    let joined = names.iter().cloned().collect::<Vec<_>>().join("\r\n");
    let mut bytes = joined.into_bytes();
    if !bytes.is_empty() {
        bytes.extend_from_slice(b"\r\n");
    }
    bytes
}

/// Static facts about a reserved archive entry name.
#[derive(Debug, Clone, Copy)]
pub struct SpecialFileInfo {
    /// Canonical name, including the parentheses.
    pub name: &'static str,
    /// Whether the engine encrypts this entry by default.
    pub encrypted: bool,
    /// Whether the engine compresses this entry by default.
    pub compressed: bool,
}

/// Looks up the storage policy for a reserved archive entry name.
pub fn get_special_file_info(filename: &str) -> Option<SpecialFileInfo> {
    match filename {
        "(listfile)" => Some(SpecialFileInfo {
            name: "(listfile)",
            encrypted: true,
            compressed: true,
        }),
        "(attributes)" => Some(SpecialFileInfo {
            name: "(attributes)",
            encrypted: false,
            compressed: true,
        }),
        "(signature)" => Some(SpecialFileInfo {
            name: "(signature)",
            encrypted: false,
            compressed: false,
        }),
        _ => None,
    }
}

bitflags::bitflags! {
    /// Selects which parallel arrays follow the `(attributes)` header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AttributeFlags: u32 {
        /// A `u32` CRC32 per block.
        const CRC32 = 0x01;
        /// A `u64` FILETIME per block.
        const FILETIME = 0x02;
        /// A 16-byte MD5 digest per block.
        const MD5 = 0x04;
    }
}

/// Parsed `(attributes)` payload: a small header followed by
/// up to three parallel arrays, each sized to the block table's length.
#[derive(Debug, Clone)]
pub struct AttributesBlock {
    /// Format version, always 100 for every archive this engine writes.
    pub version: u32,
    /// Which arrays are present.
    pub flags: AttributeFlags,
    /// CRC32 of each block's decompressed content, if `flags` has `CRC32`.
    pub crc32: Vec<u32>,
    /// Windows FILETIME (100ns ticks since 1601-01-01 UTC) per block, if `flags` has `FILETIME`.
    pub filetime: Vec<u64>,
    /// MD5 of each block's decompressed content, if `flags` has `MD5`.
    pub md5: Vec<[u8; 16]>,
}

const ATTRIBUTES_VERSION: u32 = 100;

impl AttributesBlock {
    /// Builds a fully-populated attributes block for `block_count` blocks,
    /// carrying all three arrays (the policy this engine pins, since the
    /// question: always write CRC32, FILETIME, and MD5, fully sized).
    pub fn new(block_count: usize) -> Self {
        Self {
            version: ATTRIBUTES_VERSION,
            flags: AttributeFlags::CRC32 | AttributeFlags::FILETIME | AttributeFlags::MD5,
            crc32: vec![0; block_count],
            filetime: vec![0; block_count],
            md5: vec![[0; 16]; block_count],
        }
    }

    /// Parses a `(attributes)` payload.
    pub fn read(data: &[u8], block_count: usize) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let version = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::invalid_format("(attributes) truncated before version"))?;
        let flags = AttributeFlags::from_bits_truncate(
            cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| Error::invalid_format("(attributes) truncated before flags"))?,
        );

        let mut crc32 = Vec::new();
        if flags.contains(AttributeFlags::CRC32) {
            for _ in 0..block_count {
                crc32.push(
                    cursor
                        .read_u32::<LittleEndian>()
                        .map_err(|_| Error::invalid_format("(attributes) CRC32 array truncated"))?,
                );
            }
        }

        let mut filetime = Vec::new();
        if flags.contains(AttributeFlags::FILETIME) {
            for _ in 0..block_count {
                filetime.push(
                    cursor
                        .read_u64::<LittleEndian>()
                        .map_err(|_| Error::invalid_format("(attributes) FILETIME array truncated"))?,
                );
            }
        }

        let mut md5 = Vec::new();
        if flags.contains(AttributeFlags::MD5) {
            for _ in 0..block_count {
                let mut digest = [0u8; 16];
                std::io::Read::read_exact(&mut cursor, &mut digest)
                    .map_err(|_| Error::invalid_format("(attributes) MD5 array truncated"))?;
                md5.push(digest);
            }
        }

        Ok(Self {
            version,
            flags,
            crc32,
            filetime,
            md5,
        })
    }

    /// Serializes the attributes payload.
    pub fn write(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(self.version)?;
        buf.write_u32::<LittleEndian>(self.flags.bits())?;

        if self.flags.contains(AttributeFlags::CRC32) {
            for &crc in &self.crc32 {
                buf.write_u32::<LittleEndian>(crc)?;
            }
        }
        if self.flags.contains(AttributeFlags::FILETIME) {
            for &ft in &self.filetime {
                buf.write_u64::<LittleEndian>(ft)?;
            }
        }
        if self.flags.contains(AttributeFlags::MD5) {
            for digest in &self.md5 {
                std::io::Write::write_all(&mut buf, digest)?;
            }
        }

        Ok(buf)
    }
}

/// Converts a Unix timestamp (seconds) to Windows FILETIME ticks.
pub fn unix_to_filetime(unix_seconds: u64) -> u64 {
    const EPOCH_DIFF_SECONDS: u64 = 11_644_473_600;
    (unix_seconds + EPOCH_DIFF_SECONDS) * 10_000_000
}

/// The placeholder name `list`/`extract` give a block with no entry in
/// either the internal or a supplied external `(listfile)`.
pub fn synthesize_name(block_index: usize) -> String {
    format!("File{block_index:08}.xxx")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn parses_simple_listfile() {
        let data = b"file1.txt\nfile2.dat\nfile3.bin";
        let files = parse_listfile(data);
        assert_eq!(files, vec!["file1.txt", "file2.dat", "file3.bin"]);
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let data = b"; comment\nfile1.txt\n\n# also a comment\nfile2.dat\n";
        let files = parse_listfile(data);
        assert_eq!(files, vec!["file1.txt", "file2.dat"]);
    }

    #[test]
    fn strips_metadata_suffix() {
        let data = b"file1.txt;12345\nfile2.dat;67890;extra";
        let files = parse_listfile(data);
        assert_eq!(files, vec!["file1.txt", "file2.dat"]);
    }

    #[test]
    fn listfile_round_trips_sorted() {
        let mut names = BTreeSet::new();
        names.insert("dogs.txt".to_string());
        names.insert("cats.txt".to_string());
        let payload = serialize_listfile(&names);
        assert_eq!(payload, b"cats.txt\r\ndogs.txt\r\n");

        let parsed = parse_listfile(&payload);
        assert_eq!(parsed, vec!["cats.txt", "dogs.txt"]);
    }

    #[test]
    fn attributes_round_trip() {
        let mut attrs = AttributesBlock::new(3);
        attrs.crc32[1] = 0xDEAD_BEEF;
        attrs.md5[2] = [7; 16];

        let bytes = attrs.write().unwrap();
        let parsed = AttributesBlock::read(&bytes, 3).unwrap();

        assert_eq!(parsed.version, 100);
        assert_eq!(parsed.crc32[1], 0xDEAD_BEEF);
        assert_eq!(parsed.md5[2], [7; 16]);
        assert_eq!(parsed.filetime.len(), 3);
    }

    #[test]
    fn special_file_policies() {
        assert!(get_special_file_info("(listfile)").unwrap().compressed);
        assert!(!get_special_file_info("(signature)").unwrap().compressed);
        assert!(get_special_file_info("regular.txt").is_none());
    }
}
