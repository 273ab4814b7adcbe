use std::io::BufRead;
use std::path::Path;

use crate::input::InputError;
use crate::input::gz::open_maybe_gz;

pub fn parse_barcodes(path: &Path) -> Result<Vec<String>, InputError> {
    let reader = open_maybe_gz(path)?;
    let mut barcodes = Vec::new();
    for line in reader.lines() {
        let line = line?;
        // barcodes.tsv may carry extra columns in some exports; the first one is the barcode
        let barcode = line.split('\t').next().unwrap_or("").trim();
        if barcode.is_empty() {
            continue;
        }
        barcodes.push(barcode.to_string());
    }

    if barcodes.is_empty() {
        return Err(InputError::Parse("barcodes file is empty".to_string()));
    }
    Ok(barcodes)
}
