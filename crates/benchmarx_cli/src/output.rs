//! Terminal rendering.
//!
//! Tables go through `comfy-table`; JSON and CSV come from the core report
//! module so every front end exports the same shape.

use crate::cli::OutputFormat;
use anyhow::{bail, Result};
use benchmarx_core::report::{to_csv, to_json, CsvRecord};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

pub fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

pub fn number(value: f64) -> Cell {
    Cell::new(format!("{value:.2}")).set_alignment(CellAlignment::Right)
}

pub fn count(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

pub fn optional(value: Option<&str>) -> Cell {
    Cell::new(value.unwrap_or("-"))
}

/// Prints tabular rows in the requested format.
pub fn emit_rows<T, F>(format: OutputFormat, rows: &[T], render: F) -> Result<()>
where
    T: CsvRecord + Serialize,
    F: FnOnce(&[T]) -> Table,
{
    match format {
        OutputFormat::Table => println!("{}", render(rows)),
        OutputFormat::Json => println!("{}", to_json(rows)?),
        OutputFormat::Csv => print!("{}", to_csv(rows)),
    }
    Ok(())
}

/// Prints a single record; CSV is not offered for nested shapes.
pub fn emit_record<T, F>(format: OutputFormat, record: &T, render: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> Table,
{
    match format {
        OutputFormat::Table => println!("{}", render(record)),
        OutputFormat::Json => println!("{}", to_json(record)?),
        OutputFormat::Csv => bail!("csv output is not available for this command; use table or json"),
    }
    Ok(())
}
