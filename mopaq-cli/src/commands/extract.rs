use std::collections::HashSet;
use std::path::PathBuf;

use mopaq::{special_files, Archive};

use crate::output::{self, exit};
use crate::ExtractArgs;

pub fn run(args: &ExtractArgs) -> i32 {
    let mut archive = match Archive::open(&args.archive) {
        Ok(a) => a,
        Err(e) => {
            output::failure(format!("Failed to open archive: {e}"));
            return exit::FAILED;
        }
    };

    if let Some(listfile) = &args.listfile {
        match std::fs::read(listfile) {
            Ok(data) => {
                for name in special_files::parse_listfile(&data) {
                    archive.learn_name(&name);
                }
            }
            Err(e) => {
                output::failure(format!("Failed to read {}: {e}", listfile.display()));
                return exit::FAILED;
            }
        }
    }

    let (_, warning) = mopaq::locale::resolve_or_default(&args.locale);
    if let Some(message) = warning {
        output::warning(message);
    }

    if let Err(e) = std::fs::create_dir_all(&args.output) {
        output::failure(format!("Failed to create {}: {e}", args.output.display()));
        return exit::FAILED;
    }

    let wanted: HashSet<&str> = args.files.iter().map(String::as_str).collect();

    let mut entries = archive.list();
    entries.sort_by(|a, b| a.block_index.cmp(&b.block_index));
    let entries: Vec<_> = entries
        .into_iter()
        .filter(|e| !archive.is_reserved_block(e.block_index))
        .filter(|e| wanted.is_empty() || e.name.as_deref().is_some_and(|n| wanted.contains(n)))
        .collect();

    if !wanted.is_empty() {
        let found: HashSet<&str> = entries.iter().filter_map(|e| e.name.as_deref()).collect();
        for name in &wanted {
            if !found.contains(name) {
                output::failure(format!("File doesn't exist: {name}"));
            }
        }
    }

    for entry in &entries {
        let name = entry
            .name
            .clone()
            .unwrap_or_else(|| special_files::synthesize_name(entry.block_index));
        let dest = join_archive_path(&args.output, &name);

        let data = match archive.read_by_block(entry.block_index) {
            Ok(d) => d,
            Err(e) => {
                output::failure(format!("Failed to extract {name}: {e}"));
                continue;
            }
        };

        if let Some(parent) = dest.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                output::failure(format!("Failed to create {}: {e}", parent.display()));
                continue;
            }
        }
        if let Err(e) = std::fs::write(&dest, &data) {
            output::failure(format!("Failed to write {}: {e}", dest.display()));
            continue;
        }
        output::success(format!("Extracted: {name}"));
    }

    exit::SUCCESS
}

fn join_archive_path(root: &std::path::Path, archive_name: &str) -> PathBuf {
    let mut dest = root.to_path_buf();
    for component in archive_name.split('\\') {
        dest.push(component);
    }
    dest
}
