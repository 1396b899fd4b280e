//! Resolves human-readable locale codes to the 16-bit locale IDs stored in
//! [`crate::tables::HashEntry::locale`].

use crate::error::{Error, Result};

/// The closed set of locale codes the engine knows by name, paired with
/// their MPQ/Windows LCID.
const LOCALE_TABLE: &[(&str, u16)] = &[
    ("enUS", 0x0000),
    ("neutral", 0x0000),
    ("arSA", 0x0401),
    ("zhTW", 0x0404),
    ("zhCN", 0x0404),
    ("csCZ", 0x0405),
    ("deDE", 0x0407),
    ("enGB", 0x0809),
    ("esES", 0x040A),
    ("frFR", 0x040C),
    ("heIL", 0x040D),
    ("huHU", 0x040E),
    ("itIT", 0x0410),
    ("jaJP", 0x0411),
    ("koKR", 0x0412),
    ("nlNL", 0x0413),
    ("plPL", 0x0415),
    ("ptBR", 0x0416),
    ("ptPT", 0x0816),
    ("ruRU", 0x0419),
    ("svSE", 0x041D),
];

/// Resolves a human-readable locale string (e.g. `"enUS"`) or a raw 4-hex-digit
/// locale ID (e.g. `"041D"`) to its 16-bit MPQ locale ID.
///
/// Returns [`Error::UnknownLocale`] if `code` matches neither form.
pub fn resolve(code: &str) -> Result<u16> {
    if let Some(&(_, id)) = LOCALE_TABLE.iter().find(|(name, _)| name.eq_ignore_ascii_case(code)) {
        return Ok(id);
    }

    if code.len() == 4 && code.chars().all(|c| c.is_ascii_hexdigit()) {
        if let Ok(id) = u16::from_str_radix(code, 16) {
            return Ok(id);
        }
    }

    Err(Error::UnknownLocale(code.to_string()))
}

/// Resolves a locale code, falling back to the default locale (0) with a
/// warning message on failure — the policy `read`/`extract` use for
/// `--locale`.
pub fn resolve_or_default(code: &str) -> (u16, Option<String>) {
    match resolve(code) {
        Ok(id) => (id, None),
        Err(_) => (
            0,
            Some(format!(
                "The locale '{code}' is unknown. Will use default locale instead."
            )),
        ),
    }
}

/// Returns the human-readable name for a locale ID, or its 4-hex-digit raw
/// form if it is not in the closed table.
pub fn name_for(id: u16) -> String {
    LOCALE_TABLE
        .iter()
        .find(|(name, lid)| *lid == id && *name != "neutral")
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| format!("{id:04X}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(resolve("enUS").unwrap(), 0x0000);
        assert_eq!(resolve("koKR").unwrap(), 0x0412);
        assert_eq!(resolve("deDE").unwrap(), 0x0407);
        assert_eq!(resolve("esES").unwrap(), 0x040A);
    }

    #[test]
    fn raw_hex_resolves() {
        assert_eq!(resolve("041D").unwrap(), 0x041D);
    }

    #[test]
    fn unknown_code_errors() {
        assert!(resolve("xxYY").is_err());
        assert!(matches!(resolve("xxYY"), Err(Error::UnknownLocale(_))));
    }

    #[test]
    fn fallback_carries_warning() {
        let (id, warning) = resolve_or_default("bogus");
        assert_eq!(id, 0);
        assert!(warning.unwrap().contains("bogus"));

        let (id, warning) = resolve_or_default("frFR");
        assert_eq!(id, 0x040C);
        assert!(warning.is_none());
    }

    #[test]
    fn name_round_trips() {
        assert_eq!(name_for(0x0412), "koKR");
        assert_eq!(name_for(0x9999), "9999");
    }
}
