// Integration tests for the workbook reader against real xlsx bytes.
// Run with: cargo test -p salesdash-io --test reader

use rust_xlsxwriter::Workbook;
use salesdash_core::CellValue;
use salesdash_io::{read, Backend, ReadOptions};

fn contract_export() -> Vec<u8> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("계약").unwrap();
    ws.write_string(0, 0, "계약 현황").unwrap();
    ws.write_string(1, 0, "조회기간: 2024-01-01 ~ 2024-01-31").unwrap();
    let header = ["상담사", "대분류", "일반회차 캠페인", "대분류", "매출 금액"];
    for (c, h) in header.iter().enumerate() {
        ws.write_string(2, c as u16, *h).unwrap();
    }
    ws.write_string(3, 0, "김부자").unwrap();
    ws.write_string(3, 1, "안마의자").unwrap();
    ws.write_string(3, 2, "V-1월").unwrap();
    ws.write_string(3, 3, "렌탈").unwrap();
    ws.write_number(3, 4, 1_011_000.0).unwrap();
    wb.save_to_buffer().unwrap()
}

#[test]
fn xlsx_with_header_offset_and_duplicate_columns() {
    let bytes = contract_export();
    let out = read(&bytes, &ReadOptions::with_header_row(2)).unwrap();

    assert_eq!(out.backend, Backend::Auto);
    assert!(out.failures.is_empty());
    assert_eq!(
        out.sheet.columns,
        vec!["상담사", "대분류", "일반회차 캠페인", "대분류.0", "매출 금액"]
    );
    assert_eq!(out.sheet.height(), 1);
    assert_eq!(out.sheet.cell(0, 4), &CellValue::Number(1_011_000.0));
}

#[test]
fn named_sheet_selection() {
    let bytes = contract_export();
    let options = ReadOptions { header_row: 2, sheet: Some("없는시트".into()) };
    let err = read(&bytes, &options).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn column_count_is_preserved() {
    let bytes = contract_export();
    let out = read(&bytes, &ReadOptions::with_header_row(2)).unwrap();
    assert_eq!(out.sheet.width(), 5);
    assert!(out.sheet.rows.iter().all(|r| r.len() == 5));
}
