//! Result tables built from classified, matched rows.
//!
//! Every builder is a pure function of its inputs and returns a table whose
//! column schema is fixed for its kind, so empty inputs still produce a
//! well-formed (row-less or zero-filled) table. Sorts always end in a name
//! key, which leaves no tie order undefined.

mod campaign;
mod daily;
mod new_db;
mod performance;
mod promotion;

pub use campaign::{campaign_by_status, CAMPAIGN_STATUSES};
pub use daily::{daily_product_rollup, product_display_order, target_achievement, ChannelTotals};
pub use new_db::{new_db_counts, NEW_DB_STATUS};
pub use performance::per_agent_performance;
pub use promotion::{promotion_ranking, PromotionRow};

use salesdash_core::CellValue;

use crate::classify::ProductClass;

/// Product classes in per-agent column order.
pub(crate) const PRODUCT_COLUMNS: [ProductClass; 6] = ProductClass::ALL;

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Won to display millions, rounded to whole millions.
pub(crate) fn millions(won: f64) -> f64 {
    (won / 1_000_000.0).round()
}

/// `part / whole × 100` to one decimal; zero when `whole` is zero.
pub(crate) fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        round_to(part / whole * 100.0, 1)
    }
}

pub(crate) fn count_cell(n: u64) -> CellValue {
    CellValue::number(n as f64)
}
