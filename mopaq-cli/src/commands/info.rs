use mopaq::Archive;

use crate::output::{self, exit};
use crate::InfoArgs;

pub fn run(args: &InfoArgs) -> i32 {
    let archive = match Archive::open(&args.archive) {
        Ok(a) => a,
        Err(e) => {
            output::failure(format!("Failed to open archive: {e}"));
            return exit::FAILED;
        }
    };
    let info = archive.info();

    if let Some(property) = &args.property {
        let value = match property.as_str() {
            "format-version" => format!("{:?}", info.format_version),
            "header-offset" => info.header_offset.to_string(),
            "header-size" => info.header_size.to_string(),
            "archive-size" => info.archive_size.to_string(),
            "sector-size" => info.sector_size.to_string(),
            "file-count" => info.file_count.to_string(),
            "hash-table-size" => info.hash_table_size.to_string(),
            "block-table-size" => info.block_table_size.to_string(),
            "signature-type" => format!("{:?}", info.signature_type),
            other => {
                output::failure(format!("Unknown property: {other}"));
                return exit::INVALID_INPUT;
            }
        };
        println!("{value}");
        return exit::SUCCESS;
    }

    println!("Format version:     {:?}", info.format_version);
    println!("Header offset:      {}", info.header_offset);
    println!("Header size:        {}", info.header_size);
    println!("Archive size:       {}", info.archive_size);
    println!("Sector size:        {}", info.sector_size);
    println!("File count:         {}", info.file_count);
    println!("Hash table size:    {}", info.hash_table_size);
    println!("Block table size:   {}", info.block_table_size);
    println!("Signature:          {:?}", info.signature_type);

    exit::SUCCESS
}
