// Terminal and JSON rendering of analysis reports

use salesdash_analytics::{AnalysisReport, Warning};
use salesdash_core::AggregateTable;
use serde_json::{json, Value};
use unicode_width::UnicodeWidthStr;

/// Column-aligned plain text. Hangul and other wide glyphs count as two
/// columns so headers line up with their values.
pub fn table_text(table: &AggregateTable) -> String {
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| r.iter().map(|c| c.as_text().into_owned()).collect())
        .collect();

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.width()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }

    let mut out = format!("[{}]\n", table.title);
    out.push_str(&line(table.columns.iter().map(String::as_str), &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line(rule.iter().map(String::as_str), &widths));
    for row in &cells {
        out.push_str(&line(row.iter().map(String::as_str), &widths));
    }
    if cells.is_empty() {
        out.push_str("(no rows)\n");
    }
    out
}

fn line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(c, w)| format!("{c}{}", " ".repeat(w.saturating_sub(c.width()))))
        .collect();
    let mut s = padded.join("  ").trim_end().to_string();
    s.push('\n');
    s
}

pub fn warning_json(w: &Warning) -> Value {
    json!({ "stage": w.stage().to_string(), "message": w.to_string() })
}

/// The `--json` document for one report.
pub fn report_json(report: &AnalysisReport, workbook: Option<&str>) -> Value {
    json!({
        "variant": report.variant,
        "date": report.date.map(|d| d.to_string()),
        "tables": report.tables,
        "sheets": report.plan.sheet_names(),
        "warnings": report.warnings.iter().map(warning_json).collect::<Vec<_>>(),
        "workbook": workbook,
    })
}
