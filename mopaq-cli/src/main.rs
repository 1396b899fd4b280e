//! `mpq`: a command-line tool for reading, creating, and inspecting MPQ
//! archives, built on the `mopaq` engine crate.

mod commands;
mod config;
mod flags;
mod output;
mod resolve;
mod walker;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A command-line tool for reading, creating, and inspecting MPQ archives.
#[derive(Parser)]
#[command(name = "mpq", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new archive from a file or directory.
    Create(CreateArgs),
    /// Add a file to an existing archive.
    Add(AddArgs),
    /// Remove a file from an existing archive.
    Remove(RemoveArgs),
    /// List the files an archive contains.
    List(ListArgs),
    /// Print one file's content to stdout (or a given path).
    Read(ReadArgs),
    /// Extract every (or selected) file from an archive to a directory.
    Extract(ExtractArgs),
    /// Print archive-level metadata.
    Info(InfoArgs),
    /// Verify an archive's signature.
    Verify(VerifyArgs),
}

#[derive(clap::Args)]
pub struct CreateArgs {
    /// File or directory to archive.
    pub source: PathBuf,
    /// Path of the archive to create.
    #[arg(short, long)]
    pub output: PathBuf,
    /// On-disk format version: 1, 2, or 4.
    #[arg(short = 'v', long)]
    pub version: Option<u16>,
    /// Game profile selecting default version, compression, and flags.
    #[arg(short = 'g', long)]
    pub game: Option<String>,
    /// Write a weak `(signature)` entry on close.
    #[arg(short = 's', long)]
    pub sign: bool,
    /// Locale every added file is filed under.
    #[arg(long, default_value = "neutral")]
    pub locale: String,
    /// Archive-internal name for a single-file source (default: basename).
    #[arg(long = "name-in-archive")]
    pub name_in_archive: Option<String>,
    /// Archive-internal directory prefix for a directory source.
    #[arg(long = "dir-in-archive")]
    pub dir_in_archive: Option<String>,
    /// Raw hex block-flags override for regular files.
    #[arg(long = "file-flags1")]
    pub file_flags1: Option<String>,
    /// Raw hex block-flags override for the `(listfile)` entry. Accepted
    /// for compatibility; this engine always compresses and encrypts
    /// `(listfile)` per its pinned internal-metadata policy.
    #[arg(long = "file-flags2")]
    pub file_flags2: Option<String>,
    /// Raw hex block-flags override for the `(attributes)` entry. Same
    /// caveat as `--file-flags2`.
    #[arg(long = "file-flags3")]
    pub file_flags3: Option<String>,
    /// Raw hex attributes-array mask. Accepted for compatibility; this
    /// engine always writes CRC32, FILETIME, and MD5, fully sized.
    #[arg(long = "attr-flags")]
    pub attr_flags: Option<String>,
    /// Sector compression for the first sector of every added file.
    #[arg(long)]
    pub compression: Option<String>,
    /// Sector compression for sectors after the first, if different.
    #[arg(long = "compression-next")]
    pub compression_next: Option<String>,
    /// `sector_bytes = 512 << shift`.
    #[arg(long = "sector-size-shift")]
    pub sector_size_shift: Option<u16>,
    /// Expected file count, used only to size the initial hash table.
    #[arg(long = "expected-files", default_value_t = 16)]
    pub expected_files: u32,
}

#[derive(clap::Args)]
pub struct AddArgs {
    /// File to add.
    pub file: PathBuf,
    /// Archive to modify.
    pub archive: PathBuf,
    /// Archive-internal name (default: basename of `file`).
    #[arg(long = "name-in-archive")]
    pub name_in_archive: Option<String>,
    /// Archive-internal directory prefix.
    #[arg(long = "dir-in-archive")]
    pub dir_in_archive: Option<String>,
    /// Locale this entry is filed under.
    #[arg(long, default_value = "neutral")]
    pub locale: String,
    /// Replace an existing entry instead of failing.
    #[arg(long)]
    pub overwrite: bool,
    /// Game profile supplying default compression and flags.
    #[arg(short = 'g', long)]
    pub game: Option<String>,
    /// Raw hex block-flags override.
    #[arg(long)]
    pub flags: Option<String>,
    /// Sector compression for the first sector.
    #[arg(long)]
    pub compression: Option<String>,
    /// Sector compression for sectors after the first, if different.
    #[arg(long = "compression-next")]
    pub compression_next: Option<String>,
    /// Encrypt sector contents and the sector offset table.
    #[arg(long)]
    pub encrypt: bool,
    /// Adjust the per-file key by file position and size (needs `--encrypt`).
    #[arg(long = "fix-key")]
    pub fix_key: bool,
    /// Store the file as a single sector.
    #[arg(long = "single-unit")]
    pub single_unit: bool,
    /// Append a parallel ADLER32 array after the sector offset table.
    #[arg(long = "sector-crc")]
    pub sector_crc: bool,
    /// Mark the entry as a patch file.
    #[arg(long = "patch-file")]
    pub patch_file: bool,
}

#[derive(clap::Args)]
pub struct RemoveArgs {
    /// Archive-internal name to remove.
    pub name: String,
    /// Archive to modify.
    pub archive: PathBuf,
    /// Locale the entry is filed under.
    #[arg(long, default_value = "neutral")]
    pub locale: String,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Archive to inspect.
    pub archive: PathBuf,
    /// Include the internal `(listfile)`, `(attributes)`, and `(signature)`
    /// bookkeeping entries, normally hidden.
    #[arg(short, long)]
    pub all: bool,
    /// Show hash indices, name hashes, sizes, flags, locale, key, and filetime.
    #[arg(short, long)]
    pub detailed: bool,
    /// Print only these properties, one per entry (repeatable). Overrides
    /// `--detailed`. Recognized names: name, hash-index, name-hash-a,
    /// name-hash-b, size, compressed-size, flags, locale, key, filetime.
    #[arg(short = 'p', long = "property")]
    pub properties: Vec<String>,
    /// An external listfile to merge in before resolving names.
    #[arg(short = 'l', long)]
    pub listfile: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ReadArgs {
    /// Archive-internal name to read.
    pub name: String,
    /// Archive to read from.
    pub archive: PathBuf,
    /// Locale to prefer; unknown locales fall back to the default with a warning.
    #[arg(long, default_value = "neutral")]
    pub locale: String,
    /// Write to this path instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Archive to extract.
    pub archive: PathBuf,
    /// Destination directory.
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
    /// Extract only these names (repeatable); default is every entry.
    #[arg(short = 'f', long = "file")]
    pub files: Vec<String>,
    /// An external listfile to merge in before resolving names.
    #[arg(short = 'l', long)]
    pub listfile: Option<PathBuf>,
    /// Locale to prefer; unknown locales fall back to the default with a warning.
    #[arg(long, default_value = "neutral")]
    pub locale: String,
}

#[derive(clap::Args)]
pub struct InfoArgs {
    /// Archive to inspect.
    pub archive: PathBuf,
    /// Print only this property's value instead of the full summary.
    #[arg(short, long)]
    pub property: Option<String>,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Archive to verify.
    pub archive: PathBuf,
    /// Print the raw signature bytes, regardless of verification outcome.
    #[arg(short = 'p', long)]
    pub print: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = config::load_config();

    let code = match &cli.command {
        Commands::Create(args) => commands::create::run(args, &config),
        Commands::Add(args) => commands::add::run(args, &config),
        Commands::Remove(args) => commands::remove::run(args),
        Commands::List(args) => commands::list::run(args),
        Commands::Read(args) => commands::read::run(args),
        Commands::Extract(args) => commands::extract::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Verify(args) => commands::verify::run(args),
    };

    std::process::exit(code);
}
