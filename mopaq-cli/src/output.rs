//! Fixed message prefixes and phrasing the engine's testable properties pin
//! `[+]` success, `[*]` progress, `[!]` a recoverable per-item
//! problem, `[-]` a structural failure that aborts the whole command.

use colored::Colorize;

pub fn success(msg: impl AsRef<str>) {
    println!("{} {}", "[+]".green().bold(), msg.as_ref());
}

pub fn progress(msg: impl AsRef<str>) {
    println!("{} {}", "[*]".cyan().bold(), msg.as_ref());
}

pub fn warning(msg: impl AsRef<str>) {
    eprintln!("{} {}", "[!]".yellow().bold(), msg.as_ref());
}

pub fn failure(msg: impl AsRef<str>) {
    eprintln!("{} {}", "[-]".red().bold(), msg.as_ref());
}

/// Exit codes shared by every subcommand.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    pub const FAILED: i32 = 1;
    pub const INVALID_INPUT: i32 = 105;
}

/// Renders a block's flags as a fixed-width legend string, one character
/// per tracked bit, `-` where the bit is clear. Column order is pinned to
/// the legend `ceximnfr2d`: Compress, Encrypted, eXists, Implode, single-
/// unit ("M"onolithic), patch ("N"ew-content diff), Fix-key, sectoR-crc,
/// reserved (`2`, never set by this engine), Delete-marker.
pub fn flags_string(flags: mopaq::tables::BlockFlags) -> String {
    use mopaq::tables::BlockFlags as F;
    const COLUMNS: &[(char, F)] = &[
        ('c', F::COMPRESS),
        ('e', F::ENCRYPTED),
        ('x', F::EXISTS),
        ('i', F::IMPLODE),
        ('m', F::SINGLE_UNIT),
        ('n', F::PATCH_FILE),
        ('f', F::FIX_KEY),
        ('r', F::SECTOR_CRC),
    ];
    let mut out = String::with_capacity(COLUMNS.len() + 2);
    for &(ch, bit) in COLUMNS {
        out.push(if flags.contains(bit) { ch } else { '-' });
    }
    out.push('-'); // reserved `2` column: no tenth flag is defined.
    out.push(if flags.contains(F::DELETE_MARKER) { 'd' } else { '-' });
    out
}
