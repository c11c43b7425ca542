// Sheet planner: which sheets a workbook gets, and what fills each one

use rand::rngs::StdRng;
use rand::SeedableRng;

use salesdash_core::{AggregateTable, PlannedSheet, RawSheet, RawSlice, SheetContent, SheetPlan, TableKind};

use crate::pipeline::Variant;

pub const FILTERED_RAW_SHEET: &str = "필터링된 원본 데이터";
pub const SALES_SUMMARY_SHEET: &str = "매출현황";
pub const APPROVED_RAW_SHEET: &str = "승인매출";
pub const INSTALLED_RAW_SHEET: &str = "설치매출";

/// Source rows destined for a passthrough sheet.
#[derive(Debug, Clone)]
pub struct RawSource {
    pub sheet_name: &'static str,
    pub sheet: RawSheet,
    /// Drop columns whose every value is null before export.
    pub drop_empty_columns: bool,
}

/// Copy `sheet` into a slice of at most `cap` rows.
///
/// Over the cap, a uniform sample of `cap` rows is taken with an RNG seeded
/// from `seed`, kept in source order, and a footer records the source row
/// count.
pub fn cap_rows(sheet: &RawSheet, cap: usize, seed: u64) -> RawSlice {
    let total = sheet.height();
    if total <= cap {
        return RawSlice::from_sheet(sheet);
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, total, cap).into_vec();
    picked.sort_unstable();
    log::info!("'{}': sampled {cap} of {total} rows for export", sheet.name);

    let sampled = sheet.select_rows(&picked);
    RawSlice {
        columns: sampled.columns,
        rows: sampled.rows,
        source_rows: total,
        footer: Some(format!("※ 원본 {total}행 중 {cap}행을 무작위 추출했습니다")),
    }
}

/// Seed for raw-sheet sampling: the leading eight bytes of the input digest.
pub fn sample_seed(digest: &blake3::Hash) -> u64 {
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(seed)
}

/// Ordered sheet list for one analysis.
///
/// The daily-sales summary stacks every rollup and target block on one
/// sheet; other variants give each table its own sheet named by its title.
/// Raw sources follow in the order given.
pub fn plan_sheets(variant: Variant, tables: &[AggregateTable], raw: &[RawSource], cap: usize, seed: u64) -> SheetPlan {
    let mut sheets = Vec::new();

    match variant {
        Variant::DailySales => {
            let summary: Vec<AggregateTable> = tables
                .iter()
                .filter(|t| matches!(t.kind, TableKind::DailyProductRollup | TableKind::TargetAchievement))
                .cloned()
                .collect();
            sheets.push(PlannedSheet {
                name: SALES_SUMMARY_SHEET.to_string(),
                content: SheetContent::Tables { tables: summary },
            });
        }
        _ => {
            for table in tables {
                sheets.push(PlannedSheet {
                    name: table.title.clone(),
                    content: SheetContent::Tables {
                        tables: vec![table.clone()],
                    },
                });
            }
        }
    }

    for source in raw {
        let sheet = if source.drop_empty_columns {
            source.sheet.without_empty_columns()
        } else {
            source.sheet.clone()
        };
        sheets.push(PlannedSheet {
            name: source.sheet_name.to_string(),
            content: SheetContent::Raw(cap_rows(&sheet, cap, seed)),
        });
    }

    log::debug!("{variant}: planned {} sheet(s)", sheets.len());
    SheetPlan { sheets }
}
