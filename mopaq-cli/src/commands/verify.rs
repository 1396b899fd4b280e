use mopaq::{Archive, VerifyResult};

use crate::output::{self, exit};
use crate::VerifyArgs;

pub fn run(args: &VerifyArgs) -> i32 {
    let archive = match Archive::open(&args.archive) {
        Ok(a) => a,
        Err(e) => {
            output::failure(format!("Failed to open archive: {e}"));
            return exit::FAILED;
        }
    };

    if args.print {
        match archive.raw_signature() {
            Ok(Some(bytes)) => {
                println!("{}", bytes.iter().map(|b| format!("{b:02x}")).collect::<String>());
            }
            Ok(None) => output::warning("No signature present"),
            Err(e) => output::failure(format!("Failed to read signature: {e}")),
        }
    }

    match archive.verify() {
        Ok(VerifyResult::Valid) => {
            output::success("Verify success");
            exit::SUCCESS
        }
        Ok(VerifyResult::Invalid) | Ok(VerifyResult::NoSignature) => {
            output::warning("Verify failed");
            exit::FAILED
        }
        Err(e) => {
            output::failure(format!("Failed to verify archive: {e}"));
            exit::FAILED
        }
    }
}
