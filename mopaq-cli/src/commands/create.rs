use mopaq::{Archive, CreateOptions, FormatVersion};

use crate::config::Config;
use crate::output::{self, exit};
use crate::resolve::{self, AddOverrides};
use crate::walker;
use crate::CreateArgs;

pub fn run(args: &CreateArgs, config: &Config) -> i32 {
    let game = match args.game.as_deref().map(resolve::resolve_game) {
        Some(Ok(g)) => Some(g),
        Some(Err(e)) => {
            output::failure(format!("Unknown game profile: {e}"));
            return exit::INVALID_INPUT;
        }
        None => None,
    };

    let version = match resolve_version(args.version, game) {
        Ok(v) => v,
        Err(e) => {
            output::failure(e);
            return exit::INVALID_INPUT;
        }
    };

    let sector_size_shift = args
        .sector_size_shift
        .or(game.map(|g| g.default_sector_size_shift()))
        .or(config.default_sector_size_shift)
        .unwrap_or(3);

    let locale = match mopaq::locale::resolve(&args.locale) {
        Ok(id) => id,
        Err(_) => {
            output::failure(format!("The locale '{}' is unknown.", args.locale));
            return exit::INVALID_INPUT;
        }
    };

    // (listfile)/(attributes) flag overrides are accepted for compatibility
    // but validated-only: this engine's internal-metadata storage policy is
    // pinned and not reachable through the public `add` surface.
    for raw in [&args.file_flags2, &args.file_flags3, &args.attr_flags].into_iter().flatten() {
        if crate::flags::parse_raw_flags(raw).is_err() {
            output::failure(format!("Invalid flags value: {raw}"));
            return exit::INVALID_INPUT;
        }
    }

    if !args.source.exists() {
        output::failure(format!("Input path not found: {}", args.source.display()));
        return exit::INVALID_INPUT;
    }

    let files = if args.source.is_dir() {
        if args.name_in_archive.is_some() {
            output::warning("--name-in-archive is ignored for a directory source");
        }
        match walker::collect_files(&args.source, args.dir_in_archive.as_deref()) {
            Ok(files) => files,
            Err(e) => {
                output::failure(format!("Failed to walk {}: {e}", args.source.display()));
                return exit::FAILED;
            }
        }
    } else {
        if args.dir_in_archive.is_some() {
            output::warning("--dir-in-archive is ignored for a single-file source");
        }
        let name = args.name_in_archive.clone().unwrap_or_else(|| {
            args.source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| args.source.display().to_string())
        });
        vec![(args.source.clone(), name)]
    };

    let compression = args.compression.as_deref().or(config.default_compression.as_deref());
    let overrides = AddOverrides {
        game: args.game.as_deref(),
        compression,
        compression_next: args.compression_next.as_deref(),
        flags: args.file_flags1.as_deref(),
        locale,
        ..AddOverrides::default()
    };
    let add_opts = match resolve::build_add_options(&overrides) {
        Ok(opts) => opts,
        Err(e) => {
            output::failure(e);
            return exit::INVALID_INPUT;
        }
    };

    let mut archive = match Archive::create(
        &args.output,
        CreateOptions {
            version,
            expected_file_count: files.len().max(1) as u32,
            sector_size_shift,
            sign: args.sign,
        },
    ) {
        Ok(a) => a,
        Err(e) => {
            output::failure(format!("Failed to create archive: {e}"));
            return exit::FAILED;
        }
    };

    for (disk_path, archive_name) in &files {
        let data = match std::fs::read(disk_path) {
            Ok(d) => d,
            Err(e) => {
                output::failure(format!("Failed to read {}: {e}", disk_path.display()));
                return exit::FAILED;
            }
        };
        output::progress(format!("Adding file for locale {locale}: {archive_name}"));
        if let Err(e) = archive.add(archive_name, &data, add_opts.clone()) {
            match e {
                mopaq::Error::FileExists(name) => {
                    output::warning(format!("File already exists in MPQ archive: {name} - Skipping..."));
                }
                other => {
                    output::failure(format!("Failed to add {archive_name}: {other}"));
                    return exit::FAILED;
                }
            }
        }
    }

    if let Err(e) = archive.close() {
        output::failure(format!("Failed to finalize archive: {e}"));
        return exit::FAILED;
    }

    output::success(format!("Created archive: {}", args.output.display()));
    exit::SUCCESS
}

fn resolve_version(raw: Option<u16>, game: Option<mopaq::config::GameProfile>) -> Result<FormatVersion, String> {
    if let Some(v) = raw {
        return match v {
            1 => Ok(FormatVersion::V1),
            2 => Ok(FormatVersion::V2),
            4 => Ok(FormatVersion::V4),
            other => Err(format!("unsupported --version {other}: only 1, 2, and 4 can be created")),
        };
    }
    Ok(game.map(|g| g.format_version()).unwrap_or(FormatVersion::V1))
}
