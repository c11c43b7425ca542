// Raw cell matrix with a resolved header row

use std::collections::HashSet;

use serde::Serialize;

use crate::value::CellValue;

/// Output of the workbook reader: unique column labels plus data rows.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    /// Build a sheet from a dense cell matrix, taking row `header_row` as the
    /// header. Rows above the header are discarded, fully blank data rows are
    /// skipped, and trailing columns with a blank header and no values are
    /// dropped.
    pub fn from_matrix(name: impl Into<String>, matrix: Vec<Vec<CellValue>>, header_row: usize) -> Self {
        let mut iter = matrix.into_iter().skip(header_row);
        let header = iter.next().unwrap_or_default();
        let data: Vec<Vec<CellValue>> = iter
            .filter(|row| row.iter().any(|c| !c.is_null()))
            .collect();

        let width = data
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(header.len()))
            .max()
            .unwrap_or(0);

        let raw_labels: Vec<String> = (0..width)
            .map(|i| header.get(i).map(|c| c.trimmed()).unwrap_or_default())
            .collect();

        // Trailing blank-header columns that carry no data
        let mut keep = width;
        while keep > 0 {
            let idx = keep - 1;
            let blank_header = raw_labels[idx].is_empty();
            let blank_values = data.iter().all(|r| r.get(idx).map_or(true, |c| c.is_null()));
            if blank_header && blank_values {
                keep -= 1;
            } else {
                break;
            }
        }

        let labels: Vec<String> = raw_labels
            .into_iter()
            .take(keep)
            .enumerate()
            .map(|(i, l)| if l.is_empty() { format!("Unnamed: {i}") } else { l })
            .collect();

        let rows = data
            .into_iter()
            .map(|mut r| {
                r.resize(keep, CellValue::Null);
                r
            })
            .collect();

        RawSheet {
            name: name.into(),
            columns: disambiguate_labels(labels),
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Cell at (row, col); out-of-range positions read as null.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::NULL)
    }

    /// Copy of this sheet without columns whose every value is null.
    pub fn without_empty_columns(&self) -> RawSheet {
        let keep: Vec<usize> = (0..self.width())
            .filter(|&c| self.rows.iter().any(|r| !r[c].is_null()))
            .collect();
        RawSheet {
            name: self.name.clone(),
            columns: keep.iter().map(|&c| self.columns[c].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| keep.iter().map(|&c| r[c].clone()).collect())
                .collect(),
        }
    }

    /// Keep only the listed rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> RawSheet {
        RawSheet {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Append the rows of `other`, aligning by column label. Labels unknown
    /// to `self` are appended as new columns.
    pub fn append(&mut self, other: &RawSheet) {
        let mut mapping = Vec::with_capacity(other.width());
        for label in &other.columns {
            let idx = match self.column_index(label) {
                Some(i) => i,
                None => {
                    self.columns.push(label.clone());
                    for row in &mut self.rows {
                        row.push(CellValue::Null);
                    }
                    self.columns.len() - 1
                }
            };
            mapping.push(idx);
        }
        for row in &other.rows {
            let mut out = vec![CellValue::Null; self.width()];
            for (src, &dst) in mapping.iter().enumerate() {
                out[dst] = row[src].clone();
            }
            self.rows.push(out);
        }
    }
}

/// Make column labels unique.
///
/// The first occurrence of a label keeps its name; later occurrences are
/// suffixed `.0`, `.1`, … in source order. A suffix that would collide with
/// another label is skipped, so the output always has the same length as the
/// input and no repeats.
pub fn disambiguate_labels(labels: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = labels.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut next_suffix: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut out = Vec::with_capacity(labels.len());

    for label in labels {
        if seen.insert(label.clone()) {
            out.push(label);
            continue;
        }
        let counter = next_suffix.entry(label.clone()).or_insert(0);
        let renamed = loop {
            let candidate = format!("{label}.{counter}");
            *counter += 1;
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(renamed.clone());
        seen.insert(renamed.clone());
        out.push(renamed);
    }

    out
}
