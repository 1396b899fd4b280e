//! MPQ header and user-data preamble parsing/emission.

use crate::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom, Write};

/// MPQ archive header signature ('MPQ\x1A')
pub const MPQ_HEADER_SIGNATURE: u32 = 0x1A51_504D;
/// MPQ user-data preamble signature ('MPQ\x1B')
pub const MPQ_USERDATA_SIGNATURE: u32 = 0x1B51_504D;
/// Header search granularity.
pub const HEADER_ALIGNMENT: u64 = 0x200;

/// MPQ format version, encoded as the header's `format_version` field.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatVersion {
    /// Original format, 32-byte header.
    V1 = 0,
    /// Burning Crusade format, 44-byte header.
    V2 = 1,
    /// Cataclysm beta format, 68-byte header.
    V3 = 2,
    /// Cataclysm+ format, header size >= 208 bytes.
    V4 = 3,
}

impl FormatVersion {
    /// Minimum on-disk header size for this version.
    pub fn header_size(self) -> u32 {
        match self {
            FormatVersion::V1 => 0x20,
            FormatVersion::V2 => 0x2C,
            FormatVersion::V3 => 0x44,
            FormatVersion::V4 => 0xD0,
        }
    }

    /// Parses the raw `u16` stored in the header.
    pub fn from_raw(raw: u16) -> Result<Self> {
        match raw {
            0 => Ok(FormatVersion::V1),
            1 => Ok(FormatVersion::V2),
            2 => Ok(FormatVersion::V3),
            3 => Ok(FormatVersion::V4),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

/// Optional preamble preceding the real header, identified by "MPQ\x1B".
#[derive(Debug, Clone)]
pub struct UserDataHeader {
    /// Maximum size of the user data region.
    pub user_data_size: u32,
    /// Offset of the real MPQ header, relative to the start of this header.
    pub header_offset: u32,
    /// Size of this user-data header structure itself.
    pub user_data_header_size: u32,
}

/// MD5 digests carried by a v4 header.
#[derive(Debug, Clone)]
pub struct V4Digests {
    /// MD5 of the (decrypted) block table.
    pub block_table: [u8; 16],
    /// MD5 of the (decrypted) hash table.
    pub hash_table: [u8; 16],
    /// MD5 of the hi-block table.
    pub hi_block_table: [u8; 16],
    /// MD5 of the BET table (unused, kept for round-tripping foreign archives).
    pub bet_table: [u8; 16],
    /// MD5 of the HET table (unused, kept for round-tripping foreign archives).
    pub het_table: [u8; 16],
    /// MD5 of the header itself, computed over all preceding header bytes.
    pub header: [u8; 16],
}

/// Parsed MPQ header, normalized across versions.
#[derive(Debug, Clone)]
pub struct Header {
    /// Size of the header structure as stored on disk.
    pub header_size: u32,
    /// v1-style 32-bit archive size (superseded by `archive_size_64` on v3+).
    pub archive_size: u32,
    /// Format version.
    pub format_version: FormatVersion,
    /// `sector_bytes = 512 << sector_size_shift`.
    pub sector_size_shift: u16,
    /// Low 32 bits of the hash table offset.
    pub hash_table_pos: u32,
    /// Low 32 bits of the block table offset.
    pub block_table_pos: u32,
    /// Hash table entry count (power of two).
    pub hash_table_size: u32,
    /// Block table entry count.
    pub block_table_size: u32,

    /// High 16 bits of the hi-block table offset (v2+).
    pub hi_block_table_pos: Option<u64>,
    /// High 16 bits of the hash table offset (v2+).
    pub hash_table_pos_hi: Option<u16>,
    /// High 16 bits of the block table offset (v2+).
    pub block_table_pos_hi: Option<u16>,

    /// 64-bit archive size (v3+).
    pub archive_size_64: Option<u64>,
    /// BET table position (v3+, unused by this engine).
    pub bet_table_pos: Option<u64>,
    /// HET table position (v3+, unused by this engine).
    pub het_table_pos: Option<u64>,

    /// v4-only fields: compressed table sizes and MD5 digests.
    pub v4_table_sizes: Option<[u64; 5]>,
    /// v4 MD5 digests.
    pub v4_digests: Option<V4Digests>,
}

impl Header {
    /// `512 << sector_size_shift`
    pub fn sector_size(&self) -> usize {
        512usize << self.sector_size_shift
    }

    /// Full 64-bit hash table position.
    pub fn hash_table_pos64(&self) -> u64 {
        self.hash_table_pos_hi
            .map(|hi| ((hi as u64) << 32) | self.hash_table_pos as u64)
            .unwrap_or(self.hash_table_pos as u64)
    }

    /// Full 64-bit block table position.
    pub fn block_table_pos64(&self) -> u64 {
        self.block_table_pos_hi
            .map(|hi| ((hi as u64) << 32) | self.block_table_pos as u64)
            .unwrap_or(self.block_table_pos as u64)
    }

    /// Full archive size, preferring the 64-bit field when present.
    pub fn archive_size64(&self) -> u64 {
        self.archive_size_64.unwrap_or(self.archive_size as u64)
    }

    /// Reads a header (the caller must have already seeked to its start).
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let signature = read_u32(reader)?;
        if signature != MPQ_HEADER_SIGNATURE {
            return Err(Error::NotAnArchive(
                "missing MPQ\\x1A signature".to_string(),
            ));
        }

        let header_size = read_u32(reader)?;
        let archive_size = read_u32(reader)?;
        let format_version = FormatVersion::from_raw(read_u16(reader)?)?;
        let sector_size_shift = read_u16(reader)?;
        let hash_table_pos = read_u32(reader)?;
        let block_table_pos = read_u32(reader)?;
        let hash_table_size = read_u32(reader)?;
        let block_table_size = read_u32(reader)?;

        if header_size < format_version.header_size() {
            return Err(Error::invalid_format(format!(
                "header size {header_size} too small for {format_version:?}"
            )));
        }

        let mut header = Header {
            header_size,
            archive_size,
            format_version,
            sector_size_shift,
            hash_table_pos,
            block_table_pos,
            hash_table_size,
            block_table_size,
            hi_block_table_pos: None,
            hash_table_pos_hi: None,
            block_table_pos_hi: None,
            archive_size_64: None,
            bet_table_pos: None,
            het_table_pos: None,
            v4_table_sizes: None,
            v4_digests: None,
        };

        if format_version >= FormatVersion::V2 {
            header.hi_block_table_pos = Some(read_u64(reader)?);
            header.hash_table_pos_hi = Some(read_u16(reader)?);
            header.block_table_pos_hi = Some(read_u16(reader)?);
        }

        if format_version >= FormatVersion::V3 {
            header.archive_size_64 = Some(read_u64(reader)?);
            header.bet_table_pos = Some(read_u64(reader)?);
            header.het_table_pos = Some(read_u64(reader)?);
        }

        if format_version >= FormatVersion::V4 {
            let sizes = [
                read_u64(reader)?,
                read_u64(reader)?,
                read_u64(reader)?,
                read_u64(reader)?,
                read_u64(reader)?,
            ];
            let _raw_chunk_size = read_u32(reader)?;

            let mut digests = V4Digests {
                block_table: [0; 16],
                hash_table: [0; 16],
                hi_block_table: [0; 16],
                bet_table: [0; 16],
                het_table: [0; 16],
                header: [0; 16],
            };
            reader.read_exact(&mut digests.block_table)?;
            reader.read_exact(&mut digests.hash_table)?;
            reader.read_exact(&mut digests.hi_block_table)?;
            reader.read_exact(&mut digests.bet_table)?;
            reader.read_exact(&mut digests.het_table)?;
            reader.read_exact(&mut digests.header)?;

            header.v4_table_sizes = Some(sizes);
            header.v4_digests = Some(digests);
        }

        Ok(header)
    }

    /// Serializes the header (without v4 MD5 digests, which the caller
    /// fills in afterward once the table bytes are known).
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_u32(writer, MPQ_HEADER_SIGNATURE)?;
        write_u32(writer, self.header_size)?;
        write_u32(writer, self.archive_size)?;
        write_u16(writer, self.format_version as u16)?;
        write_u16(writer, self.sector_size_shift)?;
        write_u32(writer, self.hash_table_pos)?;
        write_u32(writer, self.block_table_pos)?;
        write_u32(writer, self.hash_table_size)?;
        write_u32(writer, self.block_table_size)?;

        if self.format_version >= FormatVersion::V2 {
            write_u64(writer, self.hi_block_table_pos.unwrap_or(0))?;
            write_u16(writer, self.hash_table_pos_hi.unwrap_or(0))?;
            write_u16(writer, self.block_table_pos_hi.unwrap_or(0))?;
        }

        if self.format_version >= FormatVersion::V3 {
            write_u64(writer, self.archive_size_64.unwrap_or(0))?;
            write_u64(writer, self.bet_table_pos.unwrap_or(0))?;
            write_u64(writer, self.het_table_pos.unwrap_or(0))?;
        }

        if self.format_version >= FormatVersion::V4 {
            let sizes = self.v4_table_sizes.unwrap_or([0; 5]);
            for size in sizes {
                write_u64(writer, size)?;
            }
            write_u32(writer, 0)?; // raw_chunk_size, unused by this engine

            let digests = self.v4_digests.clone().unwrap_or(V4Digests {
                block_table: [0; 16],
                hash_table: [0; 16],
                hi_block_table: [0; 16],
                bet_table: [0; 16],
                het_table: [0; 16],
                header: [0; 16],
            });
            writer.write_all(&digests.block_table)?;
            writer.write_all(&digests.hash_table)?;
            writer.write_all(&digests.hi_block_table)?;
            writer.write_all(&digests.bet_table)?;
            writer.write_all(&digests.het_table)?;
            writer.write_all(&digests.header)?;
        }

        Ok(())
    }
}

/// Locates the MPQ header within `reader`, scanning from offset 0 in
/// [`HEADER_ALIGNMENT`]-byte increments.
///
/// Returns the archive base offset (where the real header begins), any
/// user-data preamble, and the parsed header.
pub fn find_header<R: Read + Seek>(
    reader: &mut R,
) -> Result<(u64, Option<UserDataHeader>, Header)> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    let mut offset = 0u64;

    while offset < file_size {
        reader.seek(SeekFrom::Start(offset))?;
        let signature = match read_u32(reader) {
            Ok(sig) => sig,
            Err(_) => {
                offset += HEADER_ALIGNMENT;
                continue;
            }
        };

        match signature {
            MPQ_HEADER_SIGNATURE => {
                reader.seek(SeekFrom::Start(offset))?;
                let header = Header::read(reader)?;
                return Ok((offset, None, header));
            }
            MPQ_USERDATA_SIGNATURE => {
                let user_data_size = read_u32(reader)?;
                let header_offset = read_u32(reader)?;
                let user_data_header_size = read_u32(reader)?;
                let user_data = UserDataHeader {
                    user_data_size,
                    header_offset,
                    user_data_header_size,
                };

                let mpq_offset = offset + header_offset as u64;
                if mpq_offset < file_size {
                    reader.seek(SeekFrom::Start(mpq_offset))?;
                    if let Ok(MPQ_HEADER_SIGNATURE) = read_u32(reader) {
                        reader.seek(SeekFrom::Start(mpq_offset))?;
                        let header = Header::read(reader)?;
                        return Ok((mpq_offset, Some(user_data), header));
                    }
                }
            }
            _ => {}
        }

        offset += HEADER_ALIGNMENT;
    }

    Err(Error::NotAnArchive(
        "no MPQ header found in file".to_string(),
    ))
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn write_u16<W: Write>(writer: &mut W, value: u16) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_u64<W: Write>(writer: &mut W, value: u64) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_v1_header() -> Header {
        Header {
            header_size: 0x20,
            archive_size: 1234,
            format_version: FormatVersion::V1,
            sector_size_shift: 3,
            hash_table_pos: 0x20,
            block_table_pos: 0x40,
            hash_table_size: 16,
            block_table_size: 4,
            hi_block_table_pos: None,
            hash_table_pos_hi: None,
            block_table_pos_hi: None,
            archive_size_64: None,
            bet_table_pos: None,
            het_table_pos: None,
            v4_table_sizes: None,
            v4_digests: None,
        }
    }

    #[test]
    fn v1_round_trip() {
        let header = sample_v1_header();
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 0x20);

        let mut cursor = Cursor::new(buf);
        let parsed = Header::read(&mut cursor).unwrap();
        assert_eq!(parsed.header_size, 0x20);
        assert_eq!(parsed.archive_size, 1234);
        assert_eq!(parsed.format_version, FormatVersion::V1);
        assert_eq!(parsed.sector_size(), 4096);
    }

    #[test]
    fn v2_round_trip_with_hi_fields() {
        let mut header = sample_v1_header();
        header.header_size = 0x2C;
        header.format_version = FormatVersion::V2;
        header.hi_block_table_pos = Some(0);
        header.hash_table_pos_hi = Some(0);
        header.block_table_pos_hi = Some(0);

        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 0x2C);

        let mut cursor = Cursor::new(buf);
        let parsed = Header::read(&mut cursor).unwrap();
        assert_eq!(parsed.format_version, FormatVersion::V2);
        assert_eq!(parsed.hash_table_pos64(), 0x20);
    }

    #[test]
    fn rejects_bad_signature() {
        let buf = vec![0u8; 32];
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            Header::read(&mut cursor),
            Err(Error::NotAnArchive(_))
        ));
    }

    #[test]
    fn find_header_scans_past_padding() {
        let mut buf = vec![0u8; 0x200];
        let header = sample_v1_header();
        header.write(&mut buf).unwrap(); // overwritten below at proper offset

        let mut archive = vec![0u8; 0x200];
        let mut header_bytes = Vec::new();
        header.write(&mut header_bytes).unwrap();
        archive.extend_from_slice(&header_bytes);

        let mut cursor = Cursor::new(archive);
        let (offset, user_data, found) = find_header(&mut cursor).unwrap();
        assert_eq!(offset, 0x200);
        assert!(user_data.is_none());
        assert_eq!(found.archive_size, 1234);
    }
}
