//! Game profiles: the closed set of presets `create`/`add` select version,
//! default compression, and added-file flags from.

use crate::compression::flags as compression_flags;
use crate::error::{Error, Result};
use crate::header::FormatVersion;
use crate::tables::BlockFlags;

/// A named preset bundling format version, default sector compression mask,
/// and the flags newly added files receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameProfile {
    /// No specific title; conservative modern defaults.
    Generic,
    /// Diablo (1996).
    Diablo1,
    /// Lords of Magic: Special Edition.
    LordsOfMagic,
    /// StarCraft (1998) / Brood War.
    StarCraft1,
    /// Warcraft II: Battle.net Edition.
    Warcraft2,
    /// Diablo II (and Lord of Destruction).
    Diablo2,
    /// Warcraft III: Reign of Chaos / The Frozen Throne.
    Warcraft3,
    /// A Warcraft III custom map archive (`.w3m`/`.w3x`), distinct defaults
    /// from a stock Warcraft III install archive.
    Warcraft3Map,
    /// World of Warcraft, Classic through original.
    Wow1,
    /// World of Warcraft: The Burning Crusade.
    Wow2,
    /// World of Warcraft: Wrath of the Lich King.
    Wow3,
    /// World of Warcraft: Cataclysm.
    Wow4,
    /// World of Warcraft: Mists of Pandaria and later.
    Wow5,
    /// StarCraft II.
    StarCraft2,
    /// Diablo III.
    Diablo3,
}

impl GameProfile {
    /// Parses a `--game` CLI value. Accepts the exact closed-set spellings.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "generic" => Ok(Self::Generic),
            "diablo1" => Ok(Self::Diablo1),
            "lordsofmagic" => Ok(Self::LordsOfMagic),
            "starcraft1" => Ok(Self::StarCraft1),
            "warcraft2" => Ok(Self::Warcraft2),
            "diablo2" => Ok(Self::Diablo2),
            "warcraft3" => Ok(Self::Warcraft3),
            "warcraft3-map" => Ok(Self::Warcraft3Map),
            "wow1" => Ok(Self::Wow1),
            "wow2" => Ok(Self::Wow2),
            "wow3" => Ok(Self::Wow3),
            "wow4" => Ok(Self::Wow4),
            "wow5" => Ok(Self::Wow5),
            "starcraft2" => Ok(Self::StarCraft2),
            "diablo3" => Ok(Self::Diablo3),
            other => Err(Error::UnknownGameProfile(other.to_string())),
        }
    }

    /// The archive format version this title's engine expects.
    pub fn format_version(self) -> FormatVersion {
        match self {
            Self::Generic
            | Self::Diablo1
            | Self::LordsOfMagic
            | Self::StarCraft1
            | Self::Warcraft2
            | Self::Diablo2
            | Self::Warcraft3
            | Self::Warcraft3Map
            | Self::Wow1
            | Self::Wow2 => FormatVersion::V1,
            Self::Wow3 => FormatVersion::V2,
            Self::Wow4 | Self::Wow5 | Self::StarCraft2 | Self::Diablo3 => FormatVersion::V4,
        }
    }

    /// The sector compression mask applied by default to added files.
    pub fn default_compression_mask(self) -> u8 {
        match self {
            Self::Diablo1 | Self::LordsOfMagic => compression_flags::PKWARE,
            _ => compression_flags::ZLIB,
        }
    }

    /// Flags newly added files receive under this profile (before any
    /// per-call `--flags` override).
    pub fn default_file_flags(self) -> BlockFlags {
        match self {
            Self::Warcraft3Map => BlockFlags::COMPRESS | BlockFlags::ENCRYPTED | BlockFlags::FIX_KEY,
            _ => BlockFlags::COMPRESS,
        }
    }

    /// The default sector size exponent (`512 << shift`) for this profile.
    pub fn default_sector_size_shift(self) -> u16 {
        3 // 4096-byte sectors, the overwhelming majority of real archives.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_closed_name() {
        let names = [
            "generic",
            "diablo1",
            "lordsofmagic",
            "starcraft1",
            "warcraft2",
            "diablo2",
            "warcraft3",
            "warcraft3-map",
            "wow1",
            "wow2",
            "wow3",
            "wow4",
            "wow5",
            "starcraft2",
            "diablo3",
        ];
        for name in names {
            assert!(GameProfile::parse(name).is_ok(), "failed to parse {name}");
        }
    }

    #[test]
    fn unknown_profile_errors() {
        assert!(matches!(
            GameProfile::parse("diablo4"),
            Err(Error::UnknownGameProfile(_))
        ));
    }

    #[test]
    fn version_mapping_spans_all_formats() {
        assert_eq!(GameProfile::Diablo1.format_version(), FormatVersion::V1);
        assert_eq!(GameProfile::Wow3.format_version(), FormatVersion::V2);
        assert_eq!(GameProfile::Diablo3.format_version(), FormatVersion::V4);
    }

    #[test]
    fn warcraft3_map_gets_protective_flags() {
        let flags = GameProfile::Warcraft3Map.default_file_flags();
        assert!(flags.contains(BlockFlags::ENCRYPTED));
        assert!(flags.contains(BlockFlags::FIX_KEY));
    }
}
