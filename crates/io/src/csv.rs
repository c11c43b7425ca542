// Delimited-text fallback reader and byte decoding

use std::collections::BTreeMap;

use salesdash_core::CellValue;

/// Decode bytes to a `String`.
///
/// UTF-8 (with or without BOM) is tried first; exports from Korean desktop
/// tools are usually EUC-KR (CP949), so that is the fallback. The flag is
/// true when the fallback decoder had to substitute replacement characters.
pub fn decode_text(bytes: &[u8]) -> (String, bool) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), false),
        Err(_) => {
            let (decoded, _, had_errors) = encoding_rs::EUC_KR.decode(bytes);
            (decoded.into_owned(), had_errors)
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// whose most common multi-field count covers the most lines wins; title lines above a
/// header therefore do not disqualify a delimiter. `None` when no candidate splits any line.
pub fn sniff_delimiter(content: &str) -> Option<u8> {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let mut best = None;
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Most common field count above one; higher counts break ties
        let mut tally: BTreeMap<usize, u64> = BTreeMap::new();
        for &c in counts.iter().filter(|&&c| c > 1) {
            *tally.entry(c).or_insert(0) += 1;
        }
        let Some((&target, &lines)) = tally.iter().max_by_key(|&(&count, &lines)| (lines, count)) else {
            continue;
        };
        let score = lines * target as u64;

        if score > best_score {
            best_score = score;
            best = Some(delim);
        }
    }

    best
}

/// Parse delimited text into a cell matrix. Numeric-looking fields are kept
/// as text; value coercion happens downstream.
pub fn parse_matrix(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>, String> {
    if bytes.contains(&0) {
        return Err("binary content".to_string());
    }
    let (content, lossy) = decode_text(bytes);
    if lossy {
        return Err("not valid UTF-8 or EUC-KR text".to_string());
    }
    let delimiter = sniff_delimiter(&content).ok_or_else(|| "no field delimiter found".to_string())?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut matrix = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        matrix.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        CellValue::Null
                    } else {
                        CellValue::text(field)
                    }
                })
                .collect(),
        );
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_prefers_consistent_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), Some(b';'));
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), Some(b'\t'));
        assert_eq!(sniff_delimiter("justoneword\n"), None);
        assert_eq!(sniff_delimiter("title\na,b,c\n1,2,3\n"), Some(b','));
    }

    #[test]
    fn decodes_euc_kr() {
        let (encoded, _, _) = encoding_rs::EUC_KR.encode("상담사,건수\n김부자,3\n");
        let (text, lossy) = decode_text(&encoded);
        assert!(!lossy);
        assert!(text.starts_with("상담사"));
    }

    #[test]
    fn parse_matrix_reads_rows() {
        let matrix = parse_matrix("상담사,건수\n김부자,3\n".as_bytes()).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[1][0], CellValue::text("김부자"));
    }

    #[test]
    fn parse_matrix_rejects_binary() {
        assert!(parse_matrix(&[0x50, 0x4b, 0x03, 0x04, 0x00, 0x00]).is_err());
    }
}
