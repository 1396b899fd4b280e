use mopaq::Archive;

use crate::output::{self, exit};
use crate::RemoveArgs;

pub fn run(args: &RemoveArgs) -> i32 {
    let locale = match mopaq::locale::resolve(&args.locale) {
        Ok(id) => id,
        Err(_) => {
            output::failure(format!("The locale '{}' is unknown.", args.locale));
            return exit::INVALID_INPUT;
        }
    };

    let mut archive = match Archive::open_read_write(&args.archive) {
        Ok(a) => a,
        Err(e) => {
            output::failure(format!("Failed to open archive: {e}"));
            return exit::FAILED;
        }
    };

    output::progress(format!("Removing file: {}", args.name));
    if let Err(e) = archive.remove(&args.name, locale) {
        return match e {
            mopaq::Error::FileNotFound(name) => {
                output::failure(format!("File doesn't exist: {name}"));
                exit::FAILED
            }
            other => {
                output::failure(format!("Failed to remove {}: {other}", args.name));
                exit::FAILED
            }
        };
    }

    if let Err(e) = archive.close() {
        output::failure(format!("Failed to finalize archive: {e}"));
        return exit::FAILED;
    }

    output::success(format!("Removed: {}", args.name));
    exit::SUCCESS
}
