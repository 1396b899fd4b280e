use std::io::Write;

use mopaq::Archive;

use crate::output::{self, exit};
use crate::ReadArgs;

pub fn run(args: &ReadArgs) -> i32 {
    let mut archive = match Archive::open(&args.archive) {
        Ok(a) => a,
        Err(e) => {
            output::failure(format!("Failed to open archive: {e}"));
            return exit::FAILED;
        }
    };

    let (locale, warning) = mopaq::locale::resolve_or_default(&args.locale);
    if let Some(message) = warning {
        output::warning(message);
    }

    let data = match archive.read(&args.name, locale) {
        Ok(d) => d,
        Err(mopaq::Error::FileNotFound(name)) => {
            output::failure(format!("File doesn't exist: {name}"));
            return exit::FAILED;
        }
        Err(e) => {
            output::failure(format!("Failed to read {}: {e}", args.name));
            return exit::FAILED;
        }
    };

    match &args.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &data) {
                output::failure(format!("Failed to write {}: {e}", path.display()));
                return exit::FAILED;
            }
        }
        None => {
            if let Err(e) = std::io::stdout().write_all(&data) {
                output::failure(format!("Failed to write to stdout: {e}"));
                return exit::FAILED;
            }
        }
    }

    exit::SUCCESS
}
