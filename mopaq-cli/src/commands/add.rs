use mopaq::Archive;

use crate::config::Config;
use crate::output::{self, exit};
use crate::resolve::{self, AddOverrides};
use crate::AddArgs;

pub fn run(args: &AddArgs, _config: &Config) -> i32 {
    if !args.file.exists() {
        output::failure(format!("Input file not found: {}", args.file.display()));
        return exit::INVALID_INPUT;
    }
    if !args.archive.exists() {
        output::failure(format!("Archive not found: {}", args.archive.display()));
        return exit::INVALID_INPUT;
    }

    let locale = match mopaq::locale::resolve(&args.locale) {
        Ok(id) => id,
        Err(_) => {
            output::failure(format!("The locale '{}' is unknown.", args.locale));
            return exit::INVALID_INPUT;
        }
    };

    let name = match &args.name_in_archive {
        Some(name) => name.clone(),
        None => {
            let basename = args
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| args.file.display().to_string());
            match &args.dir_in_archive {
                Some(prefix) => format!("{}\\{}", prefix.trim_end_matches('\\'), basename),
                None => basename,
            }
        }
    };

    let overrides = AddOverrides {
        game: args.game.as_deref(),
        compression: args.compression.as_deref(),
        compression_next: args.compression_next.as_deref(),
        flags: args.flags.as_deref(),
        encrypt: args.encrypt,
        fix_key: args.fix_key,
        single_unit: args.single_unit,
        sector_crc: args.sector_crc,
        patch_file: args.patch_file,
        locale,
        overwrite: args.overwrite,
    };
    let opts = match resolve::build_add_options(&overrides) {
        Ok(opts) => opts,
        Err(e) => {
            output::failure(e);
            return exit::INVALID_INPUT;
        }
    };

    let data = match std::fs::read(&args.file) {
        Ok(d) => d,
        Err(e) => {
            output::failure(format!("Failed to read {}: {e}", args.file.display()));
            return exit::FAILED;
        }
    };

    let mut archive = match Archive::open_read_write(&args.archive) {
        Ok(a) => a,
        Err(e) => {
            output::failure(format!("Failed to open archive: {e}"));
            return exit::FAILED;
        }
    };

    output::progress(format!("Adding file for locale {locale}: {name}"));
    if let Err(e) = archive.add(&name, &data, opts) {
        return match e {
            mopaq::Error::FileExists(name) => {
                output::warning(format!("File already exists in MPQ archive: {name} - Skipping..."));
                exit::SUCCESS
            }
            other => {
                output::failure(format!("Failed to add {name}: {other}"));
                exit::FAILED
            }
        };
    }

    if let Err(e) = archive.close() {
        output::failure(format!("Failed to finalize archive: {e}"));
        return exit::FAILED;
    }

    output::success(format!("Added: {name}"));
    exit::SUCCESS
}
