// Workbook reader: bytes in, RawSheet out
//
// Spreadsheet backends are tried in a fixed order (sniffed, legacy binary,
// modern zip), then HTML tables and delimited text. The first backend that
// yields a non-empty cell matrix wins.

use std::fmt::Display;
use std::io::{Cursor, Read, Seek};

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Xls, Xlsx};
use salesdash_core::{serial_to_datetime, CellValue, RawSheet};

use crate::error::{Backend, BackendFailure, ReadError};
use crate::{csv, html};

/// Maximum dimensions read from a single sheet
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 512;

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Zero-based index of the header row.
    pub header_row: usize,
    /// Worksheet to read; the first sheet when `None`.
    pub sheet: Option<String>,
}

impl ReadOptions {
    pub fn with_header_row(header_row: usize) -> Self {
        Self { header_row, sheet: None }
    }
}

#[derive(Debug, Clone)]
pub struct ReadOutput {
    pub sheet: RawSheet,
    pub backend: Backend,
    /// Backends that were tried and failed before `backend` succeeded.
    pub failures: Vec<BackendFailure>,
}

/// Read a spreadsheet blob into a [`RawSheet`] with unique column labels.
pub fn read(bytes: &[u8], options: &ReadOptions) -> Result<ReadOutput, ReadError> {
    let mut failures = Vec::new();

    let backends = [Backend::Auto, Backend::Xls, Backend::Xlsx, Backend::Html, Backend::Csv];
    for backend in backends {
        match read_matrix(bytes, backend, options.sheet.as_deref()) {
            Ok((name, matrix)) if !matrix.is_empty() => {
                log::debug!(
                    "read {} rows via {} backend ({} earlier failures)",
                    matrix.len(),
                    backend,
                    failures.len()
                );
                let sheet = RawSheet::from_matrix(name, matrix, options.header_row);
                return Ok(ReadOutput { sheet, backend, failures });
            }
            Ok(_) => failures.push(BackendFailure {
                backend,
                message: "no cells".to_string(),
            }),
            Err(message) => {
                log::debug!("{backend} backend failed: {message}");
                failures.push(BackendFailure { backend, message });
            }
        }
    }

    Err(ReadError { attempts: failures })
}

fn read_matrix(
    bytes: &[u8],
    backend: Backend,
    sheet: Option<&str>,
) -> Result<(String, Vec<Vec<CellValue>>), String> {
    match backend {
        Backend::Auto => {
            let mut wb = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| e.to_string())?;
            first_range(&mut wb, sheet)
        }
        Backend::Xls => {
            let mut wb: Xls<_> = Xls::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
            first_range(&mut wb, sheet)
        }
        Backend::Xlsx => {
            let mut wb: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
            first_range(&mut wb, sheet)
        }
        Backend::Html => html::parse_matrix(bytes).map(|m| ("html".to_string(), m)),
        Backend::Csv => csv::parse_matrix(bytes).map(|m| ("csv".to_string(), m)),
    }
}

fn first_range<RS, R>(workbook: &mut R, sheet: Option<&str>) -> Result<(String, Vec<Vec<CellValue>>), String>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: Display,
{
    let names = workbook.sheet_names();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| format!("sheet '{wanted}' not found"))?,
        None => names.first().cloned().ok_or_else(|| "workbook contains no sheets".to_string())?,
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| format!("failed to read sheet '{name}': {e}"))?;
    Ok((name, range_to_matrix(&range)))
}

/// Convert a calamine range into a dense matrix anchored at A1.
fn range_to_matrix(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let (height, width) = range.get_size();
    if height == 0 || width == 0 {
        return Vec::new();
    }
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let start_row = start_row as usize;
    let start_col = start_col as usize;

    let mut matrix: Vec<Vec<CellValue>> = vec![Vec::new(); start_row.min(MAX_ROWS)];
    for row in range.rows().take(MAX_ROWS.saturating_sub(start_row)) {
        let mut out = vec![CellValue::Null; start_col.min(MAX_COLS)];
        out.extend(
            row.iter()
                .take(MAX_COLS.saturating_sub(start_col))
                .map(data_to_cell),
        );
        matrix.push(out);
    }
    matrix
}

fn data_to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64())
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(CellValue::DateTime)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_reports_every_backend() {
        let err = read(b"\x00\x01\x02garbage", &ReadOptions::default()).unwrap_err();
        assert_eq!(
            err.tried(),
            vec![Backend::Auto, Backend::Xls, Backend::Xlsx, Backend::Html, Backend::Csv]
        );
    }

    #[test]
    fn html_table_is_read_after_spreadsheet_backends_fail() {
        let html = "<html><table><tr><td>No</td><td>상담원</td></tr><tr><td>1</td><td>김부자</td></tr></table></html>";
        let out = read(html.as_bytes(), &ReadOptions::default()).unwrap();
        assert_eq!(out.backend, Backend::Html);
        assert_eq!(out.failures.len(), 3);
        assert_eq!(out.sheet.columns, vec!["No", "상담원"]);
        assert_eq!(out.sheet.cell(0, 1).as_text(), "김부자");
    }

    #[test]
    fn csv_fallback_applies_header_row() {
        let text = "보고서\n기간: 2024-01\n상담사,대분류,대분류\n김부자,안마의자,x\n";
        let out = read(text.as_bytes(), &ReadOptions::with_header_row(2)).unwrap();
        assert_eq!(out.backend, Backend::Csv);
        assert_eq!(out.sheet.columns, vec!["상담사", "대분류", "대분류.0"]);
    }

    #[test]
    fn data_conversion() {
        assert_eq!(data_to_cell(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(data_to_cell(&Data::String("  ".into())), CellValue::Null);
        assert_eq!(
            data_to_cell(&Data::DateTimeIso("2024-01-15T09:30:00".into())),
            CellValue::DateTime(
                chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
                    .unwrap()
                    .and_hms_opt(9, 30, 0)
                    .unwrap()
            )
        );
    }
}
