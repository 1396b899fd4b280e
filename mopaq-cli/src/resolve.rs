//! Shared option-resolution logic between `create` and `add`: translating
//! `--game`, `--compression`, `--compression-next`, `--flags` and the raw
//! `--file-flags*` command-line strings into the engine's [`mopaq::AddOptions`].

use mopaq::config::GameProfile;
use mopaq::AddOptions;

use crate::flags;

/// Everything `create`/`add` share for building one file's [`AddOptions`].
#[derive(Debug, Clone, Default)]
pub struct AddOverrides<'a> {
    pub game: Option<&'a str>,
    pub compression: Option<&'a str>,
    pub compression_next: Option<&'a str>,
    pub flags: Option<&'a str>,
    pub encrypt: bool,
    pub fix_key: bool,
    pub single_unit: bool,
    pub sector_crc: bool,
    pub patch_file: bool,
    pub locale: u16,
    pub overwrite: bool,
}

pub fn resolve_game(name: &str) -> Result<GameProfile, String> {
    GameProfile::parse(name).map_err(|e| e.to_string())
}

/// Builds `AddOptions` from an overrides set. `--game` supplies the base
/// flags, then `--flags`/`--file-flags1`, `--compression`, and the boolean
/// switches apply on top, in that order, so the more specific option wins.
pub fn build_add_options(overrides: &AddOverrides) -> Result<AddOptions, String> {
    let mut opts = match overrides.game {
        Some(name) => AddOptions::for_profile(resolve_game(name)?),
        None => AddOptions::default(),
    };
    opts.locale = overrides.locale;
    opts.overwrite = overrides.overwrite;

    if let Some(raw) = overrides.flags {
        let parsed = flags::parse_raw_flags(raw)?;
        flags::apply_raw_flags(&mut opts, parsed);
    }
    if let Some(raw) = overrides.compression {
        opts.compression_mask = flags::parse_compression_mask(raw)?;
    }
    if let Some(raw) = overrides.compression_next {
        opts.next_sector_compression_mask = Some(flags::parse_compression_mask(raw)?);
    }

    if overrides.encrypt {
        opts.encrypt = true;
    }
    if overrides.fix_key {
        opts.fix_key = true;
    }
    if overrides.single_unit {
        opts.single_unit = true;
    }
    if overrides.sector_crc {
        opts.sector_crc = true;
    }
    if overrides.patch_file {
        opts.patch_file = true;
    }

    Ok(opts)
}
