//! Hash table and block table structures.
//!
//! HET/BET tables (v3/v4's richer name-lookup structures) are explicitly
//! out of scope: the v4 header's MD5 digest fields for them are parsed and
//! round-tripped, but their contents are neither built nor consulted.

use crate::crypto::{decrypt_block, encrypt_block};
use crate::error::{Error, Result};
use crate::hash::{hash_string, hash_type};
use bitflags::bitflags;
use std::io::{Read, Seek, SeekFrom, Write};

/// Hash table entry (16 bytes on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEntry {
    /// First name hash (`NameA`).
    pub name_a: u32,
    /// Second name hash (`NameB`).
    pub name_b: u32,
    /// Locale ID, 0 = neutral/default.
    pub locale: u16,
    /// Platform ID, always 0 for this engine.
    pub platform: u16,
    /// Index into the block table, or one of the `EMPTY_*` sentinels.
    pub block_index: u32,
}

impl HashEntry {
    /// The slot has never held an entry; probing stops here.
    pub const EMPTY_NEVER_USED: u32 = 0xFFFF_FFFF;
    /// The slot held an entry that was removed; probing continues past it.
    pub const EMPTY_DELETED: u32 = 0xFFFF_FFFE;

    /// An unused slot.
    pub fn empty() -> Self {
        Self {
            name_a: 0,
            name_b: 0,
            locale: 0,
            platform: 0,
            block_index: Self::EMPTY_NEVER_USED,
        }
    }

    /// True if this slot has never been occupied.
    pub fn is_empty(&self) -> bool {
        self.block_index == Self::EMPTY_NEVER_USED
    }

    /// True if this slot held an entry that was deleted.
    pub fn is_deleted(&self) -> bool {
        self.block_index == Self::EMPTY_DELETED
    }

    /// True if this slot currently resolves to a real block.
    pub fn is_valid(&self) -> bool {
        self.block_index < Self::EMPTY_DELETED
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(Error::invalid_format("hash entry too small"));
        }
        Ok(Self {
            name_a: u32::from_le_bytes(data[0..4].try_into().unwrap()),
            name_b: u32::from_le_bytes(data[4..8].try_into().unwrap()),
            locale: u16::from_le_bytes(data[8..10].try_into().unwrap()),
            platform: u16::from_le_bytes(data[10..12].try_into().unwrap()),
            block_index: u32::from_le_bytes(data[12..16].try_into().unwrap()),
        })
    }

    fn to_bytes(self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&self.name_a.to_le_bytes());
        buf[4..8].copy_from_slice(&self.name_b.to_le_bytes());
        buf[8..10].copy_from_slice(&self.locale.to_le_bytes());
        buf[10..12].copy_from_slice(&self.platform.to_le_bytes());
        buf[12..16].copy_from_slice(&self.block_index.to_le_bytes());
        buf
    }
}

bitflags! {
    /// Block entry flag bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u32 {
        /// File is compressed using the legacy PKWARE implode codec (no mask byte).
        const IMPLODE = 0x0000_0100;
        /// File is compressed using one or more mask-dispatched codecs.
        const COMPRESS = 0x0000_0200;
        /// File sectors are encrypted.
        const ENCRYPTED = 0x0001_0000;
        /// The per-file key is adjusted by file offset and uncompressed size.
        const FIX_KEY = 0x0002_0000;
        /// File is a patch file (content is a diff against a base version).
        const PATCH_FILE = 0x0010_0000;
        /// File is stored as a single sector regardless of size.
        const SINGLE_UNIT = 0x0100_0000;
        /// File is a deletion marker: present in the table but logically absent.
        const DELETE_MARKER = 0x0200_0000;
        /// A parallel ADLER32 array follows the sector offset table.
        const SECTOR_CRC = 0x0400_0000;
        /// The entry is in use.
        const EXISTS = 0x8000_0000;
    }
}

/// Block table entry (16 bytes on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Offset of the file's sector stream, relative to archive base.
    pub file_pos: u32,
    /// Size of the stored (possibly compressed) sector stream.
    pub compressed_size: u32,
    /// Size of the file's decompressed content.
    pub file_size: u32,
    /// Flag bits.
    pub flags: BlockFlags,
}

impl BlockEntry {
    /// An all-zero, unused entry.
    pub fn empty() -> Self {
        Self {
            file_pos: 0,
            compressed_size: 0,
            file_size: 0,
            flags: BlockFlags::empty(),
        }
    }

    /// True if the entry is compressed with the mask-dispatch or implode codec.
    pub fn is_compressed(&self) -> bool {
        self.flags
            .intersects(BlockFlags::IMPLODE | BlockFlags::COMPRESS)
    }

    /// True if sectors are encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(BlockFlags::ENCRYPTED)
    }

    /// True if the file is stored as a single sector.
    pub fn is_single_unit(&self) -> bool {
        self.flags.contains(BlockFlags::SINGLE_UNIT)
    }

    /// True if a sector CRC array follows the sector offset table.
    pub fn has_sector_crc(&self) -> bool {
        self.flags.contains(BlockFlags::SECTOR_CRC)
    }

    /// True if FIX_KEY adjustment applies to this file's sector keys.
    pub fn has_fix_key(&self) -> bool {
        self.flags.contains(BlockFlags::FIX_KEY)
    }

    /// True if the entry is in use (a file exists for this block index).
    pub fn exists(&self) -> bool {
        self.flags.contains(BlockFlags::EXISTS)
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(Error::invalid_format("block entry too small"));
        }
        Ok(Self {
            file_pos: u32::from_le_bytes(data[0..4].try_into().unwrap()),
            compressed_size: u32::from_le_bytes(data[4..8].try_into().unwrap()),
            file_size: u32::from_le_bytes(data[8..12].try_into().unwrap()),
            flags: BlockFlags::from_bits_truncate(u32::from_le_bytes(
                data[12..16].try_into().unwrap(),
            )),
        })
    }

    fn to_bytes(self) -> [u8; 16] {
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&self.file_pos.to_le_bytes());
        buf[4..8].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[8..12].copy_from_slice(&self.file_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf
    }
}

fn read_and_decrypt(reader: &mut (impl Read + Seek), offset: u64, count: u32, key: u32) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut raw = vec![0u8; count as usize * 16];
    reader.read_exact(&mut raw)?;

    let mut words: Vec<u32> = raw
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    decrypt_block(&mut words, key);
    for (chunk, word) in raw.chunks_exact_mut(4).zip(&words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    Ok(raw)
}

fn encrypt_and_write(
    writer: &mut impl Write,
    entries_bytes: &[u8],
    key: u32,
) -> Result<()> {
    let mut words: Vec<u32> = entries_bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    encrypt_block(&mut words, key);
    let mut raw = entries_bytes.to_vec();
    for (chunk, word) in raw.chunks_exact_mut(4).zip(&words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    writer.write_all(&raw)?;
    Ok(())
}

/// The fixed key used to en/decrypt the hash table, `hash("(hash table)", FileKey)`.
pub fn hash_table_key() -> u32 {
    hash_string("(hash table)", hash_type::FILE_KEY)
}

/// The fixed key used to en/decrypt the block table, `hash("(block table)", FileKey)`.
pub fn block_table_key() -> u32 {
    hash_string("(block table)", hash_type::FILE_KEY)
}

/// The archive's name → block resolution table.
#[derive(Debug, Clone)]
pub struct HashTable {
    entries: Vec<HashEntry>,
}

impl HashTable {
    /// Allocates a new table of `size` empty entries. `size` must be a power of two.
    pub fn new(size: usize) -> Result<Self> {
        if !crate::is_power_of_two(size as u32) {
            return Err(Error::hash_table("hash table size must be a power of two"));
        }
        Ok(Self {
            entries: vec![HashEntry::empty(); size],
        })
    }

    /// Reads and decrypts a hash table from `reader` at `offset`.
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64, size: u32) -> Result<Self> {
        if !crate::is_power_of_two(size) {
            return Err(Error::hash_table("hash table size must be a power of two"));
        }
        let raw = read_and_decrypt(reader, offset, size, hash_table_key())?;
        let mut entries = Vec::with_capacity(size as usize);
        for chunk in raw.chunks_exact(16) {
            entries.push(HashEntry::from_bytes(chunk)?);
        }
        Ok(Self { entries })
    }

    /// Encrypts and writes the table.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut raw = Vec::with_capacity(self.entries.len() * 16);
        for entry in &self.entries {
            raw.extend_from_slice(&entry.to_bytes());
        }
        encrypt_and_write(writer, &raw, hash_table_key())
    }

    /// All entries, in table order.
    pub fn entries(&self) -> &[HashEntry] {
        &self.entries
    }

    /// Table capacity (always a power of two).
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    fn start_index(&self, filename: &str) -> usize {
        hash_string(filename, hash_type::TABLE_OFFSET) as usize & (self.entries.len() - 1)
    }

    /// Finds `filename` using the locale fallback policy: an exact locale
    /// match, then locale 0, in that order. No "any locale" pass — a file
    /// present only at a non-default locale must not silently cross-match a
    /// read for a different, non-matching locale. Used by `read`/`extract`
    /// when the caller has not pinned an exact locale.
    pub fn find_with_fallback(&self, filename: &str, locale: u16) -> Option<(usize, &HashEntry)> {
        self.find_exact(filename, locale)
            .or_else(|| if locale != 0 { self.find_exact(filename, 0) } else { None })
    }

    /// Finds `filename` at exactly `locale`, with no fallback.
    pub fn find_exact(&self, filename: &str, locale: u16) -> Option<(usize, &HashEntry)> {
        let name_a = hash_string(filename, hash_type::NAME_A);
        let name_b = hash_string(filename, hash_type::NAME_B);
        self.probe(filename, |entry| {
            entry.name_a == name_a && entry.name_b == name_b && entry.locale == locale
        })
    }

    /// Finds `filename` under any locale, ignoring locale entirely. Used by
    /// `learn_name`/`has_file`, which only care whether some entry for this
    /// name exists anywhere in the table, not which locale it resolves for.
    pub fn find_any_locale(&self, filename: &str) -> Option<(usize, &HashEntry)> {
        let name_a = hash_string(filename, hash_type::NAME_A);
        let name_b = hash_string(filename, hash_type::NAME_B);
        self.probe(filename, |entry| entry.name_a == name_a && entry.name_b == name_b)
    }

    fn probe(&self, filename: &str, matches: impl Fn(&HashEntry) -> bool) -> Option<(usize, &HashEntry)> {
        let table_size = self.entries.len();
        let start = self.start_index(filename);
        let mut index = start;

        loop {
            let entry = &self.entries[index];
            if entry.is_empty() {
                return None;
            }
            if entry.is_valid() && matches(entry) {
                return Some((index, entry));
            }
            index = (index + 1) & (table_size - 1);
            if index == start {
                return None;
            }
        }
    }

    /// Finds a free (empty-never-used or empty-deleted) slot, or an existing
    /// slot for the exact `(name, locale)` tuple.
    ///
    /// Returns `(index, existing)` where `existing` is `Some` if the tuple is
    /// already present (regardless of whether that slot is still valid).
    pub fn find_insert_slot(&self, filename: &str, locale: u16) -> Result<(usize, Option<usize>)> {
        let name_a = hash_string(filename, hash_type::NAME_A);
        let name_b = hash_string(filename, hash_type::NAME_B);
        let table_size = self.entries.len();
        let start = self.start_index(filename);
        let mut index = start;
        let mut free_slot = None;

        loop {
            let entry = &self.entries[index];
            if entry.name_a == name_a && entry.name_b == name_b && entry.locale == locale && entry.is_valid()
            {
                return Ok((index, Some(index)));
            }
            if free_slot.is_none() && (entry.is_empty() || entry.is_deleted()) {
                free_slot = Some(index);
            }
            if entry.is_empty() {
                break;
            }
            index = (index + 1) & (table_size - 1);
            if index == start {
                break;
            }
        }

        free_slot
            .map(|slot| (slot, None))
            .ok_or(Error::NoHashTableSpace)
    }

    /// Writes a new entry at `index`.
    pub fn insert(&mut self, index: usize, entry: HashEntry) {
        self.entries[index] = entry;
    }

    /// Marks the entry at `index` deleted.
    pub fn mark_deleted(&mut self, index: usize) {
        self.entries[index].block_index = HashEntry::EMPTY_DELETED;
    }
}

/// The archive's block metadata table.
#[derive(Debug, Clone)]
pub struct BlockTable {
    entries: Vec<BlockEntry>,
}

impl BlockTable {
    /// Allocates a new table of `size` empty entries.
    pub fn new(size: usize) -> Self {
        Self {
            entries: vec![BlockEntry::empty(); size],
        }
    }

    /// Reads and decrypts a block table from `reader` at `offset`.
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64, size: u32) -> Result<Self> {
        let raw = read_and_decrypt(reader, offset, size, block_table_key())?;
        let mut entries = Vec::with_capacity(size as usize);
        for chunk in raw.chunks_exact(16) {
            entries.push(BlockEntry::from_bytes(chunk)?);
        }
        Ok(Self { entries })
    }

    /// Encrypts and writes the table.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut raw = Vec::with_capacity(self.entries.len() * 16);
        for entry in &self.entries {
            raw.extend_from_slice(&entry.to_bytes());
        }
        encrypt_and_write(writer, &raw, block_table_key())
    }

    /// All entries, in table order.
    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    /// A specific entry by block index.
    pub fn get(&self, index: usize) -> Option<&BlockEntry> {
        self.entries.get(index)
    }

    /// Table capacity.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Appends a new entry, returning its block index.
    pub fn push(&mut self, entry: BlockEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Replaces the entry at `index`.
    pub fn set(&mut self, index: usize, entry: BlockEntry) {
        self.entries[index] = entry;
    }

    /// Finds the first unused (empty, non-existent) slot, if any, so a new
    /// block can reuse it instead of growing the table.
    pub fn find_free_slot(&self) -> Option<usize> {
        self.entries.iter().position(|e| !e.exists())
    }
}

/// Hi-block table: the high 16 bits of `file_pos` for archives whose size
/// exceeds 4 GiB (v2+).
#[derive(Debug, Clone)]
pub struct HiBlockTable {
    entries: Vec<u16>,
}

impl HiBlockTable {
    /// A table of `size` zeroed entries (no archive so far exceeds 4 GiB).
    pub fn new(size: usize) -> Self {
        Self {
            entries: vec![0; size],
        }
    }

    /// Reads the (unencrypted) hi-block table.
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u64, size: u32) -> Result<Self> {
        reader.seek(SeekFrom::Start(offset))?;
        let mut entries = Vec::with_capacity(size as usize);
        for _ in 0..size {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            entries.push(u16::from_le_bytes(buf));
        }
        Ok(Self { entries })
    }

    /// Writes the table (unencrypted, per the format).
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for &entry in &self.entries {
            writer.write_all(&entry.to_le_bytes())?;
        }
        Ok(())
    }

    /// The high 16 bits of the `index`th block's file position, or 0 if the
    /// table doesn't cover that index (treated as archives under 4 GiB).
    pub fn high_bits(&self, index: usize) -> u16 {
        self.entries.get(index).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_entry_states() {
        let empty = HashEntry::empty();
        assert!(empty.is_empty());
        assert!(!empty.is_valid());

        let deleted = HashEntry {
            block_index: HashEntry::EMPTY_DELETED,
            ..HashEntry::empty()
        };
        assert!(deleted.is_deleted());
        assert!(!deleted.is_valid());

        let valid = HashEntry {
            name_a: 1,
            name_b: 2,
            locale: 0,
            platform: 0,
            block_index: 0,
        };
        assert!(valid.is_valid());
    }

    #[test]
    fn block_entry_flags() {
        let entry = BlockEntry {
            file_pos: 0,
            compressed_size: 10,
            file_size: 20,
            flags: BlockFlags::COMPRESS | BlockFlags::ENCRYPTED | BlockFlags::FIX_KEY | BlockFlags::EXISTS,
        };
        assert!(entry.is_compressed());
        assert!(entry.is_encrypted());
        assert!(entry.has_fix_key());
        assert!(entry.exists());
        assert!(!entry.is_single_unit());
    }

    #[test]
    fn hash_table_requires_power_of_two() {
        assert!(HashTable::new(16).is_ok());
        assert!(HashTable::new(15).is_err());
        assert!(HashTable::new(0).is_err());
    }

    #[test]
    fn insert_then_find_round_trips() {
        let mut table = HashTable::new(16).unwrap();
        let (slot, existing) = table.find_insert_slot("war3map.j", 0).unwrap();
        assert!(existing.is_none());

        let name_a = hash_string("war3map.j", hash_type::NAME_A);
        let name_b = hash_string("war3map.j", hash_type::NAME_B);
        table.insert(
            slot,
            HashEntry {
                name_a,
                name_b,
                locale: 0,
                platform: 0,
                block_index: 3,
            },
        );

        let (found_index, entry) = table.find_exact("war3map.j", 0).unwrap();
        assert_eq!(found_index, slot);
        assert_eq!(entry.block_index, 3);
    }

    #[test]
    fn deleted_slot_does_not_block_probing() {
        // Three names that happen to collide on TABLE_OFFSET are inserted in
        // sequence; deleting the middle one must not hide the third.
        let mut table = HashTable::new(4).unwrap();
        let names = ["a", "b", "c"];
        let mut slots = Vec::new();
        for name in names {
            let (slot, _) = table.find_insert_slot(name, 0).unwrap();
            table.insert(
                slot,
                HashEntry {
                    name_a: hash_string(name, hash_type::NAME_A),
                    name_b: hash_string(name, hash_type::NAME_B),
                    locale: 0,
                    platform: 0,
                    block_index: slot as u32,
                },
            );
            slots.push(slot);
        }

        table.mark_deleted(slots[1]);
        assert!(table.entries()[slots[1]].is_deleted());
        assert!(table.find_exact(names[0], 0).is_some());
        assert!(table.find_exact(names[2], 0).is_some());
        assert!(table.find_exact(names[1], 0).is_none());
    }

    #[test]
    fn locale_fallback_order() {
        let mut table = HashTable::new(16).unwrap();
        let name_a = hash_string("cats.txt", hash_type::NAME_A);
        let name_b = hash_string("cats.txt", hash_type::NAME_B);
        let (slot, _) = table.find_insert_slot("cats.txt", 0x040A).unwrap();
        table.insert(
            slot,
            HashEntry {
                name_a,
                name_b,
                locale: 0x040A,
                platform: 0,
                block_index: 0,
            },
        );

        assert!(table.find_exact("cats.txt", 0).is_none());
        // No locale-0 entry and no cross-locale fallback: neither a
        // default-locale nor an unrelated-locale read resolves the esES
        // entry.
        assert!(table.find_with_fallback("cats.txt", 0).is_none());
        assert!(table.find_with_fallback("cats.txt", 0x0409).is_none());

        // A locale-0 entry for the same name is still reached by the
        // default-locale fallback pass.
        let (default_slot, _) = table.find_insert_slot("dogs.txt", 0).unwrap();
        table.insert(
            default_slot,
            HashEntry {
                name_a: hash_string("dogs.txt", hash_type::NAME_A),
                name_b: hash_string("dogs.txt", hash_type::NAME_B),
                locale: 0,
                platform: 0,
                block_index: 1,
            },
        );
        assert!(table.find_with_fallback("dogs.txt", 0x040A).is_some());
    }
}
