//! Recursive directory walking for `create`/`add` when the source is a
//! directory: every regular file becomes one archive entry, named after its
//! path relative to the root with `\` separators, the convention MPQ
//! internal paths use.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Returns `(disk_path, archive_name)` pairs for every regular file under
/// `root`, sorted by archive name for deterministic ordering.
pub fn collect_files(root: &Path, dir_prefix: Option<&str>) -> std::io::Result<Vec<(PathBuf, String)>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| std::io::Error::other(e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("\\");
        let archive_name = match dir_prefix {
            Some(prefix) => format!("{}\\{}", prefix.trim_end_matches('\\'), joined),
            None => joined,
        };
        out.push((entry.path().to_path_buf(), archive_name));
    }
    out.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(out)
}
