// Sheet plan: what a workbook writer should materialize, in order

use serde::Serialize;

use crate::sheet::RawSheet;
use crate::table::AggregateTable;
use crate::value::CellValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetPlan {
    pub sheets: Vec<PlannedSheet>,
}

impl SheetPlan {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&PlannedSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedSheet {
    pub name: String,
    pub content: SheetContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SheetContent {
    /// One or more tables stacked vertically with a blank row between them.
    Tables { tables: Vec<AggregateTable> },
    /// Passthrough of source rows.
    Raw(RawSlice),
}

/// A capped copy of source rows for passthrough sheets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSlice {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Row count before capping.
    pub source_rows: usize,
    /// Present when rows were dropped by the cap.
    pub footer: Option<String>,
}

impl RawSlice {
    pub fn from_sheet(sheet: &RawSheet) -> Self {
        Self {
            columns: sheet.columns.clone(),
            rows: sheet.rows.clone(),
            source_rows: sheet.height(),
            footer: None,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.footer.is_some()
    }
}
