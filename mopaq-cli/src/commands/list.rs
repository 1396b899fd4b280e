use mopaq::{special_files, Archive};

use crate::output::{self, exit};
use crate::ListArgs;

pub fn run(args: &ListArgs) -> i32 {
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

    let mut entries = archive.list();
    entries.sort_by(|a, b| a.block_index.cmp(&b.block_index));
    if !args.all {
        entries.retain(|e| !archive.is_reserved_block(e.block_index));
    }

    if !args.properties.is_empty() {
        for entry in &entries {
            let mut fields = Vec::with_capacity(args.properties.len());
            for property in &args.properties {
                let value = match property.as_str() {
                    "name" => entry
                        .name
                        .clone()
                        .unwrap_or_else(|| special_files::synthesize_name(entry.block_index)),
                    "hash-index" => entry.hash_index.to_string(),
                    "block-index" => entry.block_index.to_string(),
                    "name-hash-a" => format!("{:08X}", archive.name_hashes(entry).0),
                    "name-hash-b" => format!("{:08X}", archive.name_hashes(entry).1),
                    "size" => entry.file_size.to_string(),
                    "compressed-size" => entry.compressed_size.to_string(),
                    "flags" => output::flags_string(entry.flags),
                    "locale" => mopaq::locale::name_for(entry.locale).to_string(),
                    "key" => archive
                        .encryption_key(entry)
                        .map(|k| format!("{k:08X}"))
                        .unwrap_or_else(|| "-".to_string()),
                    "filetime" => archive
                        .filetime(entry)
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    other => {
                        output::failure(format!("Unknown property: {other}"));
                        return exit::INVALID_INPUT;
                    }
                };
                fields.push(value);
            }
            println!("{}", fields.join(" "));
        }
        return exit::SUCCESS;
    }

    if args.detailed {
        println!(
            "{:>5} {:>10} {:>10} {:>10} {:>10} {:<10} {:<6} {:>10} {:<20}",
            "hash", "nameA", "nameB", "size", "csize", "flags", "locale", "key", "name"
        );
        for entry in &entries {
            let (name_a, name_b) = archive.name_hashes(entry);
            let key = archive
                .encryption_key(entry)
                .map(|k| format!("{k:08X}"))
                .unwrap_or_else(|| "-".to_string());
            let filetime = archive
                .filetime(entry)
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string());
            let name = entry
                .name
                .clone()
                .unwrap_or_else(|| special_files::synthesize_name(entry.block_index));
            println!(
                "{:>5} {:>10X} {:>10X} {:>10} {:>10} {:<10} {:<6} {:>10} {:<20} filetime={filetime}",
                entry.hash_index,
                name_a,
                name_b,
                entry.file_size,
                entry.compressed_size,
                output::flags_string(entry.flags),
                mopaq::locale::name_for(entry.locale),
                key,
                name,
            );
        }
    } else {
        for entry in &entries {
            let name = entry
                .name
                .clone()
                .unwrap_or_else(|| special_files::synthesize_name(entry.block_index));
            println!("{name}");
        }
    }

    exit::SUCCESS
}
