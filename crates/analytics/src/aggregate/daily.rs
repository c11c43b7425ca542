use salesdash_config::MonthTarget;
use salesdash_core::{AggregateTable, CellValue, TableKind};

use super::{count_cell, millions, percent, round_to};
use crate::classify::{Channel, ClassMasks, ProductClass};
use crate::records::SalesRecord;

const COLUMNS: [&str; 9] = [
    "제품",
    "총건수",
    "총매출",
    "본사건수",
    "본사매출",
    "연계건수",
    "연계매출",
    "온라인건수",
    "온라인매출",
];

const CHANNEL_COLUMNS: [Channel; 3] = [Channel::Direct, Channel::Affiliate, Channel::Online];

/// VAT-excluded revenue by channel over the rolled-up products, in won.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelTotals {
    pub direct: f64,
    pub affiliate: f64,
    pub online: f64,
}

/// Goods in configured order; goods the configuration omits follow in
/// their natural order, unknown keys are ignored.
pub fn product_display_order(product_order: &[String]) -> Vec<ProductClass> {
    let configured = product_order
        .iter()
        .filter_map(|k| ProductClass::from_key(k.trim()))
        .filter(|p| ProductClass::GOODS.contains(p));
    let mut order: Vec<ProductClass> = Vec::new();
    for p in configured.chain(ProductClass::GOODS) {
        if !order.contains(&p) {
            order.push(p);
        }
    }
    order
}

#[derive(Default, Clone, Copy)]
struct Cell {
    count: u64,
    revenue: f64,
}

/// Product × channel rollup of already date-filtered rows.
///
/// One row per good plus a 합계 row. 총건수/총매출 cover every channel,
/// including rows whose channel is unknown. Revenue is VAT-excluded and
/// shown in whole millions.
pub fn daily_product_rollup(
    title: &str,
    records: &[&SalesRecord],
    order: &[ProductClass],
) -> (AggregateTable, ChannelTotals) {
    let mut table = AggregateTable::new(TableKind::DailyProductRollup, title, COLUMNS.to_vec());
    let masks = ClassMasks::build(records);

    // [product][0 = all, 1.. = CHANNEL_COLUMNS]
    let mut cells = vec![[Cell::default(); 4]; order.len()];
    for (i, record) in records.iter().enumerate() {
        let Some(p) = order.iter().position(|p| *p == masks.product(i)) else {
            continue;
        };
        let revenue = record.contract.revenue_ex_vat;
        cells[p][0].count += 1;
        cells[p][0].revenue += revenue;
        if let Some(c) = CHANNEL_COLUMNS.iter().position(|c| *c == masks.channel(i)) {
            cells[p][c + 1].count += 1;
            cells[p][c + 1].revenue += revenue;
        }
    }

    let mut total = [Cell::default(); 4];
    for (product, row) in order.iter().zip(&cells) {
        for (t, c) in total.iter_mut().zip(row.iter()) {
            t.count += c.count;
            t.revenue += c.revenue;
        }
        table.push_row(rollup_row(product.label(), row));
    }
    table.push_row(rollup_row("합계", &total));

    let totals = ChannelTotals {
        direct: total[1].revenue,
        affiliate: total[2].revenue,
        online: total[3].revenue,
    };
    (table, totals)
}

fn rollup_row(label: &str, cells: &[Cell; 4]) -> Vec<CellValue> {
    let mut row = vec![CellValue::text(label)];
    for c in cells {
        row.push(count_cell(c.count));
        row.push(CellValue::number(millions(c.revenue)));
    }
    row
}

/// Monthly target achievement. Targets are configured in millions of won;
/// actuals are month-to-date VAT-excluded revenue.
pub fn target_achievement(title: &str, target: &MonthTarget, actual: &ChannelTotals) -> AggregateTable {
    let mut table = AggregateTable::new(
        TableKind::TargetAchievement,
        title,
        vec!["구분", "목표(백만원)", "누적실적(백만원)", "달성률(%)"],
    );
    let rows = [
        (Channel::Direct.label(), target.direct_target, actual.direct),
        (Channel::Affiliate.label(), target.affiliate_target, actual.affiliate),
        ("합계", target.total(), actual.direct + actual.affiliate),
    ];
    for (label, goal, won) in rows {
        let actual_millions = won / 1_000_000.0;
        table.push_row(vec![
            CellValue::text(label),
            CellValue::number(goal),
            CellValue::number(round_to(actual_millions, 1)),
            CellValue::number(percent(actual_millions, goal)),
        ]);
    }
    table
}
