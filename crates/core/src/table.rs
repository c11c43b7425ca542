// Labeled result tables produced by the aggregator

use serde::Serialize;

use crate::value::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    PerAgentPerformance,
    CampaignByStatus,
    DailyProductRollup,
    TargetAchievement,
    PromotionRanking,
    NewDbCounts,
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerAgentPerformance => write!(f, "per_agent_performance"),
            Self::CampaignByStatus => write!(f, "campaign_by_status"),
            Self::DailyProductRollup => write!(f, "daily_product_rollup"),
            Self::TargetAchievement => write!(f, "target_achievement"),
            Self::PromotionRanking => write!(f, "promotion_ranking"),
            Self::NewDbCounts => write!(f, "new_db_counts"),
        }
    }
}

/// An ordered table with a fixed column schema.
///
/// The schema depends only on `kind` (and, for daily rollups, the title), so
/// an empty input still yields a well-formed table with zero rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub kind: TableKind,
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl AggregateTable {
    pub fn new<S: Into<String>>(kind: TableKind, title: impl Into<String>, columns: Vec<S>) -> Self {
        Self {
            kind,
            title: title.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the schema width.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Null);
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// First row whose column `key_col` renders as `key`.
    pub fn find_row(&self, key_col: usize, key: &str) -> Option<&Vec<CellValue>> {
        self.rows.iter().find(|r| r.get(key_col).is_some_and(|c| c.as_text() == key))
    }

    /// Cell lookup by row key (first column) and column name.
    pub fn value(&self, row_key: &str, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.find_row(0, row_key).and_then(|r| r.get(col))
    }
}
