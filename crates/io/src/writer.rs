// Sheet-plan export (xlsx only)
//
// Materializes a SheetPlan: aggregate tables are stacked on their sheet with
// a bold title and header row; raw slices are written as-is with an optional
// footer row.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use salesdash_core::{datetime_to_serial, AggregateTable, CellValue, RawSlice, SheetContent, SheetPlan};

/// Excel's hard limit on sheet-name length.
const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSummary {
    pub sheets_written: usize,
    pub cells_written: usize,
}

struct Formats {
    bold: Format,
    datetime: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            bold: Format::new().set_bold(),
            datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        }
    }
}

/// Serialize the plan to xlsx bytes.
pub fn write_plan(plan: &SheetPlan) -> Result<(Vec<u8>, WriteSummary), String> {
    let (mut workbook, summary) = build_workbook(plan).map_err(|e| format!("Failed to build workbook: {e}"))?;
    let bytes = workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to serialize workbook: {e}"))?;
    Ok((bytes, summary))
}

/// Serialize the plan to an xlsx file.
pub fn save_plan(plan: &SheetPlan, path: &Path) -> Result<WriteSummary, String> {
    let (mut workbook, summary) = build_workbook(plan).map_err(|e| format!("Failed to build workbook: {e}"))?;
    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {e}"))?;
    log::info!(
        "wrote {} sheets ({} cells) to {}",
        summary.sheets_written,
        summary.cells_written,
        path.display()
    );
    Ok(summary)
}

fn build_workbook(plan: &SheetPlan) -> Result<(Workbook, WriteSummary), XlsxError> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let mut summary = WriteSummary::default();

    for planned in &plan.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&planned.name))?;

        summary.cells_written += match &planned.content {
            SheetContent::Tables { tables } => write_tables(worksheet, tables, &formats)?,
            SheetContent::Raw(slice) => write_raw(worksheet, slice, &formats)?,
        };
        summary.sheets_written += 1;
    }

    Ok((workbook, summary))
}

fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .collect();
    cleaned.chars().take(MAX_SHEET_NAME).collect()
}

fn write_tables(ws: &mut Worksheet, tables: &[AggregateTable], formats: &Formats) -> Result<usize, XlsxError> {
    let mut row: u32 = 0;
    let mut cells = 0;

    for table in tables {
        ws.write_string_with_format(row, 0, &table.title, &formats.bold)?;
        row += 1;
        for (col, name) in table.columns.iter().enumerate() {
            ws.write_string_with_format(row, col as u16, name, &formats.bold)?;
        }
        row += 1;
        for values in &table.rows {
            for (col, value) in values.iter().enumerate() {
                if write_cell(ws, row, col as u16, value, formats)? {
                    cells += 1;
                }
            }
            row += 1;
        }
        row += 1;
    }

    if row > 0 {
        ws.set_freeze_panes(0, 1)?;
    }
    Ok(cells)
}

fn write_raw(ws: &mut Worksheet, slice: &RawSlice, formats: &Formats) -> Result<usize, XlsxError> {
    let mut cells = 0;
    for (col, name) in slice.columns.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, name, &formats.bold)?;
    }
    for (r, values) in slice.rows.iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            if write_cell(ws, r as u32 + 1, col as u16, value, formats)? {
                cells += 1;
            }
        }
    }
    if let Some(footer) = &slice.footer {
        ws.write_string_with_format(slice.rows.len() as u32 + 1, 0, footer, &formats.bold)?;
    }
    ws.set_freeze_panes(1, 0)?;
    Ok(cells)
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, value: &CellValue, formats: &Formats) -> Result<bool, XlsxError> {
    match value {
        CellValue::Null => return Ok(false),
        CellValue::Text(s) => {
            ws.write_string(row, col, s)?;
        }
        CellValue::Number(n) if n.is_finite() => {
            ws.write_number(row, col, *n)?;
        }
        CellValue::Number(_) => return Ok(false),
        CellValue::Bool(b) => {
            ws.write_boolean(row, col, *b)?;
        }
        CellValue::DateTime(dt) => {
            ws.write_number_with_format(row, col, datetime_to_serial(dt), &formats.datetime)?;
        }
    }
    Ok(true)
}
