// HTML table extraction
//
// Some call-recording systems export "xls" files that are really an HTML
// document with a single <table>. Cells are pulled out with regexes; column
// positions are preserved across colspan so positional column contracts
// still hold.

use std::sync::OnceLock;

use regex::Regex;
use salesdash_core::CellValue;

use crate::csv::decode_text;

/// Upper bound on the number of bytes scanned for the `<table` marker.
const SNIFF_BYTES: usize = 64 * 1024;

fn row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").expect("valid regex"))
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<t([dh])\b([^>]*)>(.*?)</t[dh]\s*>").expect("valid regex"))
}

fn colspan_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)colspan\s*=\s*["']?(\d+)"#).expect("valid regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"))
}

/// True when the first bytes of the blob contain a `<table` marker.
pub fn looks_like_html_table(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SNIFF_BYTES)];
    head.windows(6).any(|w| w.eq_ignore_ascii_case(b"<table"))
}

/// Extract the rows of every `<tr>` in the document as a cell matrix.
pub fn parse_matrix(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>, String> {
    if !looks_like_html_table(bytes) {
        return Err("no <table> marker".to_string());
    }
    let (text, _) = decode_text(bytes);
    let matrix = extract_rows(&text);
    if matrix.is_empty() {
        return Err("<table> contains no rows".to_string());
    }
    Ok(matrix)
}

pub fn extract_rows(html: &str) -> Vec<Vec<CellValue>> {
    let mut matrix = Vec::new();
    for row_cap in row_re().captures_iter(html) {
        let inner = &row_cap[1];
        let mut row = Vec::new();
        for cell_cap in cell_re().captures_iter(inner) {
            let attrs = &cell_cap[2];
            let text = clean_cell(&cell_cap[3]);
            row.push(if text.is_empty() { CellValue::Null } else { CellValue::Text(text) });

            let span = colspan_re()
                .captures(attrs)
                .and_then(|c| c[1].parse::<usize>().ok())
                .unwrap_or(1);
            for _ in 1..span.min(256) {
                row.push(CellValue::Null);
            }
        }
        if !row.is_empty() {
            matrix.push(row);
        }
    }
    matrix
}

fn clean_cell(raw: &str) -> String {
    let without_tags = tag_re().replace_all(raw, " ");
    let unescaped = unescape_entities(&without_tags);
    unescaped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unescape_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let Some(end) = tail.find(';').filter(|&e| e <= 10) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "nbsp" => Some(' '),
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
            }
            _ if entity.starts_with('#') => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
            _ => None,
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
