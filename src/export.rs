//! CSV export of the session ledger.
//!
//! The original tool exported an Excel workbook; spreadsheet formatting is
//! out of scope here, so the export is plain CSV with the same Hungarian
//! column headers (driven by the serde renames on
//! [`InvoiceRecord`]). Every spreadsheet tool the bookkeepers
//! use opens it directly, and unlike a binary workbook the format
//! round-trips losslessly through [`read_csv`], which the tests rely on.
//!
//! File writes are atomic (temp file + rename) so a crash mid-export never
//! leaves a half-written file where yesterday's export used to be.

use crate::error::PipelineError;
use crate::record::InvoiceRecord;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Serialize records as CSV (with header row) into any writer.
pub fn write_csv<W: Write>(records: &[InvoiceRecord], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Deserialize records from CSV produced by [`write_csv`].
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<InvoiceRecord>, csv::Error> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize().collect()
}

/// Write the ledger to a CSV file atomically.
pub fn export_csv(records: &[InvoiceRecord], path: impl AsRef<Path>) -> Result<(), PipelineError> {
    let path = path.as_ref();
    let tmp_path = path.with_extension("csv.tmp");

    let file = std::fs::File::create(&tmp_path).map_err(|e| PipelineError::ExportFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    write_csv(records, file).map_err(|e| PipelineError::ExportFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    std::fs::rename(&tmp_path, path).map_err(|e| PipelineError::ExportFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    info!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read a previously exported CSV file back into records.
pub fn import_csv(path: impl AsRef<Path>) -> Result<Vec<InvoiceRecord>, PipelineError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| PipelineError::ImportFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    read_csv(file).map_err(|e| PipelineError::ImportFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}
