//! MPQ encryption table and block cipher.
//!
//! The table is generated once at compile time and shared by every
//! encrypt/decrypt/hash operation in the crate.

/// The deterministic 1280-entry MPQ crypt table. Indices `0x000..0x100` are
/// used by `hash(_, TableOffset)`, `0x100..0x200` by `NameA`, `0x200..0x300`
/// by `NameB`, `0x300..0x400` by `FileKey`, and `0x400..0x500` by the block
/// cipher's seed update.
pub const ENCRYPTION_TABLE: [u32; 0x500] = generate_encryption_table();

const fn generate_encryption_table() -> [u32; 0x500] {
    let mut table = [0u32; 0x500];
    let mut seed: u32 = 0x0010_0001;

    let mut index1 = 0usize;
    while index1 < 0x100 {
        let mut index2 = 0usize;
        while index2 < 5 {
            let table_index = index1 + index2 * 0x100;

            seed = (seed.wrapping_mul(125).wrapping_add(3)) % 0x2AAAAB;
            let temp1 = (seed & 0xFFFF) << 0x10;

            seed = (seed.wrapping_mul(125).wrapping_add(3)) % 0x2AAAAB;
            let temp2 = seed & 0xFFFF;

            table[table_index] = temp1 | temp2;
            index2 += 1;
        }
        index1 += 1;
    }

    table
}

/// Keys used to (de/en)crypt the built-in tables: `hash("(hash table)", FILE_KEY)`
/// and `hash("(block table)", FILE_KEY)`.
pub const HASH_TABLE_KEY: u32 = 0xC3AF3770;
/// Block table encryption key.
pub const BLOCK_TABLE_KEY: u32 = 0xEC83B3A3;

/// Decrypts a buffer of little-endian `u32` words in place with `key`.
///
/// A `key` of zero is never produced by [`crate::hash::hash_string`] for a
/// nonempty name, but callers that pass one get a no-op rather than a panic.
pub fn decrypt_block(data: &mut [u32], mut key: u32) {
    if key == 0 {
        return;
    }

    let mut seed: u32 = 0xEEEE_EEEE;

    for value in data.iter_mut() {
        seed = seed.wrapping_add(ENCRYPTION_TABLE[0x400 + (key & 0xFF) as usize]);

        let plain = *value ^ key.wrapping_add(seed);
        *value = plain;

        key = ((!key).wrapping_shl(0x15))
            .wrapping_add(0x1111_1111)
            | (key >> 0x0B);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
    }
}

/// Encrypts a buffer of little-endian `u32` words in place with `key`.
pub fn encrypt_block(data: &mut [u32], mut key: u32) {
    if key == 0 {
        return;
    }

    let mut seed: u32 = 0xEEEE_EEEE;

    for value in data.iter_mut() {
        seed = seed.wrapping_add(ENCRYPTION_TABLE[0x400 + (key & 0xFF) as usize]);

        let plain = *value;
        *value = plain ^ key.wrapping_add(seed);

        key = ((!key).wrapping_shl(0x15))
            .wrapping_add(0x1111_1111)
            | (key >> 0x0B);
        seed = plain
            .wrapping_add(seed)
            .wrapping_add(seed << 5)
            .wrapping_add(3);
    }
}

/// Decrypts a single `u32`, as used when peeling the sector offset table's
/// first entry to recover a sector key without decrypting the whole table.
pub fn decrypt_dword(value: u32, key: u32) -> u32 {
    if key == 0 {
        return value;
    }
    let seed = 0xEEEE_EEEEu32.wrapping_add(ENCRYPTION_TABLE[0x400 + (key & 0xFF) as usize]);
    value ^ key.wrapping_add(seed)
}

/// Derives the sector-offset-table key from a file's base key, per
/// The sector offset table is encrypted with key minus one.
pub fn sector_offset_table_key(file_key: u32) -> u32 {
    file_key.wrapping_sub(1)
}

/// Derives the key for sector `index` from a file's base key, per
/// Sector encryption uses keys derived from the filename, adjusted by FIX_KEY.
pub fn sector_key(file_key: u32, sector_index: u32) -> u32 {
    file_key.wrapping_add(sector_index)
}

/// Applies FIX_KEY adjustment: `(key + file_offset_low) XOR uncompressed_size`.
pub fn fix_key(base_key: u32, file_offset_low: u32, uncompressed_size: u32) -> u32 {
    base_key.wrapping_add(file_offset_low) ^ uncompressed_size
}

/// Encrypts an arbitrary byte buffer in place, word by word. The cipher
/// operates on whole `u32`s; any trailing 1-3 bytes that don't fill a full
/// word are left untouched (sector offset tables and compressed sector
/// streams are not guaranteed to be 4-byte aligned).
pub fn encrypt_bytes(data: &mut [u8], key: u32) {
    let word_len = data.len() / 4 * 4;
    if word_len == 0 {
        return;
    }
    let mut words: Vec<u32> = data[..word_len]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    encrypt_block(&mut words, key);
    for (chunk, word) in data[..word_len].chunks_exact_mut(4).zip(&words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Inverse of [`encrypt_bytes`].
pub fn decrypt_bytes(data: &mut [u8], key: u32) {
    let word_len = data.len() / 4 * 4;
    if word_len == 0 {
        return;
    }
    let mut words: Vec<u32> = data[..word_len]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    decrypt_block(&mut words, key);
    for (chunk, word) in data[..word_len].chunks_exact_mut(4).zip(&words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_table_known_values() {
        assert_eq!(ENCRYPTION_TABLE[0x000], 0x55C6_36E2);
        assert_eq!(ENCRYPTION_TABLE[0x001], 0x02BE_0170);
        assert_eq!(ENCRYPTION_TABLE[0x002], 0x584B_71D4);
        assert_eq!(ENCRYPTION_TABLE[0x4FF], 0x7303_286C);
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let original = vec![
            0x1234_5678,
            0x9ABC_DEF0,
            0x1357_9BDF,
            0x2468_ACE0,
            0xFEDC_BA98,
        ];
        let mut data = original.clone();
        encrypt_block(&mut data, 0xC1EB_1CEF);
        assert_ne!(data, original);
        decrypt_block(&mut data, 0xC1EB_1CEF);
        assert_eq!(data, original);
    }

    #[test]
    fn zero_key_is_identity() {
        let original = vec![0x1234_5678, 0x9ABC_DEF0];
        let mut data = original.clone();
        encrypt_block(&mut data, 0);
        assert_eq!(data, original);
        decrypt_block(&mut data, 0);
        assert_eq!(data, original);
    }

    #[test]
    fn dword_round_trip_matches_block() {
        let key = 0xDEAD_BEEF;
        let mut data = vec![0x1122_3344u32];
        encrypt_block(&mut data, key);
        assert_eq!(decrypt_dword(data[0], key), 0x1122_3344);
    }

    #[test]
    fn byte_buffer_round_trip_with_odd_tail() {
        let original = b"a sector's worth of bytes, not a multiple of 4".to_vec();
        let mut data = original.clone();
        encrypt_bytes(&mut data, 0x1234_5678);
        assert_ne!(data, original);
        decrypt_bytes(&mut data, 0x1234_5678);
        assert_eq!(data, original);
    }
}
