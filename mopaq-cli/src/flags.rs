//! Parses CLI flag/compression option strings into the engine's typed
//! equivalents.

use mopaq::compression::flags as compression_flags;
use mopaq::tables::BlockFlags;

/// Parses a `--compression`/`--compression-next` value: either a bare hex
/// mask (`0x12`, `12`) or a comma-separated list of codec names.
pub fn parse_compression_mask(raw: &str) -> Result<u8, String> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).map_err(|_| format!("invalid compression mask: {raw}"));
    }
    if !raw.is_empty() && raw.len() <= 2 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
        if let Ok(mask) = u8::from_str_radix(raw, 16) {
            return Ok(mask);
        }
    }

    let mut mask = 0u8;
    for name in raw.split(',').map(str::trim) {
        mask |= match name.to_ascii_lowercase().as_str() {
            "adpcm-mono" => compression_flags::ADPCM_MONO,
            "adpcm-stereo" => compression_flags::ADPCM_STEREO,
            "huffman" => compression_flags::HUFFMAN,
            "zlib" | "deflate" => compression_flags::ZLIB,
            "pkware" | "implode" => compression_flags::PKWARE,
            "bzip2" => compression_flags::BZIP2,
            "lzma" => compression_flags::LZMA,
            "sparse" => compression_flags::SPARSE,
            "none" | "store" => 0,
            other => return Err(format!("unknown compression codec: {other}")),
        };
    }
    Ok(mask)
}

/// Parses a `--file-flags1/2/3`/`--attr-flags`/`--flags` raw hex bitmask.
pub fn parse_raw_flags(raw: &str) -> Result<BlockFlags, String> {
    let raw = raw.trim();
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")).unwrap_or(raw);
    let bits = u32::from_str_radix(digits, 16).map_err(|_| format!("invalid flags value: {raw}"))?;
    Ok(BlockFlags::from_bits_truncate(bits))
}

/// Applies a raw block-flags override onto an already-built [`mopaq::AddOptions`].
/// `COMPRESS` and `IMPLODE` are translated back into `compression_mask`/
/// `legacy_implode` rather than stored verbatim, since those two fields
/// (not the generic bit) drive which codec the engine actually runs.
pub fn apply_raw_flags(opts: &mut mopaq::AddOptions, raw: BlockFlags) {
    opts.legacy_implode = raw.contains(BlockFlags::IMPLODE);
    if !raw.contains(BlockFlags::COMPRESS) && !opts.legacy_implode {
        opts.compression_mask = 0;
    }
    opts.encrypt = raw.contains(BlockFlags::ENCRYPTED);
    opts.fix_key = raw.contains(BlockFlags::FIX_KEY);
    opts.single_unit = raw.contains(BlockFlags::SINGLE_UNIT);
    opts.sector_crc = raw.contains(BlockFlags::SECTOR_CRC);
    opts.patch_file = raw.contains(BlockFlags::PATCH_FILE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_mask() {
        assert_eq!(parse_compression_mask("0x12").unwrap(), 0x12);
        assert_eq!(parse_compression_mask("02").unwrap(), 0x02);
    }

    #[test]
    fn parses_codec_names() {
        let mask = parse_compression_mask("zlib,sparse").unwrap();
        assert_eq!(mask, compression_flags::ZLIB | compression_flags::SPARSE);
    }

    #[test]
    fn rejects_unknown_codec() {
        assert!(parse_compression_mask("rot13").is_err());
    }

    #[test]
    fn raw_flags_round_trip_into_options() {
        let mut opts = mopaq::AddOptions::default();
        let raw = parse_raw_flags("0x10000").unwrap(); // ENCRYPTED
        apply_raw_flags(&mut opts, raw);
        assert!(opts.encrypt);
        assert_eq!(opts.compression_mask, 0);
    }
}
