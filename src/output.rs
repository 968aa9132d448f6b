use crate::config::OutputPaths;
use crate::error::Result;
use crate::rows::Tabular;
use crate::table::Table;
use crate::ReportOutput;
use log::info;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Writes a table as CSV: one header row, then one record per row.
pub fn write_table<R: Tabular, W: Write>(writer: W, table: &Table<R>) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.columns())?;
    for record in table.records() {
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes a table to `path`, creating missing parent directories.
pub fn write_table_to_path<R: Tabular>(path: &Path, table: &Table<R>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    write_table(file, table)?;
    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Writes all four extracted tables and the final report.
pub fn write_report_tables(output: &ReportOutput, paths: &OutputPaths) -> Result<()> {
    write_table_to_path(
        &paths.beneficial_owner_securities,
        &output.beneficial_owner_securities,
    )?;
    write_table_to_path(&paths.realized_pl, &output.realized_pl)?;
    write_table_to_path(&paths.realized_amortization, &output.realized_amortization)?;
    write_table_to_path(&paths.ca_income, &output.ca_income)?;
    write_table_to_path(&paths.historical_pl, &output.historical_pl)?;
    Ok(())
}
