use std::collections::{BTreeMap, HashSet};

use salesdash_core::{AggregateTable, CellValue, TableKind};

use super::{count_cell, percent};
use crate::classify::{classify_campaign, CampaignKind};
use crate::records::ContractRecord;

pub const TITLE: &str = "캠페인별 상담현황";

/// Pivot columns, in display order. Statuses outside this list go to 기타.
pub const CAMPAIGN_STATUSES: [&str; 12] = [
    "주문승인",
    "승인취소",
    "체험신청",
    "예약",
    "진행중",
    "상담취소",
    "자격미달",
    "재접수",
    "중복",
    "결번",
    "해피콜거부",
    "신규",
];

const APPROVED: usize = 0;
const OTHER_STATUS: usize = CAMPAIGN_STATUSES.len();
const WIDTH: usize = CAMPAIGN_STATUSES.len() + 1;

fn columns() -> Vec<String> {
    let mut cols = vec!["캠페인".to_string()];
    cols.extend(CAMPAIGN_STATUSES.iter().map(|s| s.to_string()));
    cols.extend(["기타", "총합계", "전환율"].iter().map(|s| s.to_string()));
    cols
}

fn is_pivot_round(round: &str) -> bool {
    ["캠", "정규", "재분배"].iter().any(|k| round.contains(k))
}

/// Campaign round × consultation status counts with row totals and a
/// conversion rate (`주문승인 / 총합계 × 100`).
///
/// Rows are deduplicated by order number (first occurrence kept; rows
/// without one are all kept) and restricted to campaign, regular and
/// redistribution rounds. Rows are ordered by campaign kind, then name.
pub fn campaign_by_status(records: &[ContractRecord]) -> AggregateTable {
    let mut table = AggregateTable::new(TableKind::CampaignByStatus, TITLE, columns());

    let mut seen_orders: HashSet<&str> = HashSet::new();
    let mut pivot: BTreeMap<(u8, &str), [u64; WIDTH]> = BTreeMap::new();

    for record in records {
        let order = record.order_number.trim();
        if !order.is_empty() && !seen_orders.insert(order) {
            continue;
        }
        let round = record.campaign_round.trim();
        if !is_pivot_round(round) {
            continue;
        }
        let kind: CampaignKind = classify_campaign(round);
        let status = record.db_status.trim();
        let col = CAMPAIGN_STATUSES
            .iter()
            .position(|s| *s == status)
            .unwrap_or(OTHER_STATUS);
        pivot.entry((kind.sort_rank(), round)).or_insert([0; WIDTH])[col] += 1;
    }

    let mut grand = [0u64; WIDTH];
    for ((_, round), counts) in &pivot {
        for (g, c) in grand.iter_mut().zip(counts.iter()) {
            *g += c;
        }
        table.push_row(pivot_row(round, counts));
    }
    if !pivot.is_empty() {
        table.push_row(pivot_row("총합계", &grand));
    }
    table
}

fn pivot_row(label: &str, counts: &[u64; WIDTH]) -> Vec<CellValue> {
    let total: u64 = counts.iter().sum();
    let mut row = vec![CellValue::text(label)];
    row.extend(counts.iter().map(|c| count_cell(*c)));
    row.push(count_cell(total));
    row.push(CellValue::number(percent(counts[APPROVED] as f64, total as f64)));
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(round: &str, status: &str, order: &str) -> ContractRecord {
        ContractRecord {
            campaign_round: round.into(),
            db_status: status.into(),
            order_number: order.into(),
            ..Default::default()
        }
    }

    #[test]
    fn two_statuses_half_converted() {
        let t = campaign_by_status(&[rec("캠A", "주문승인", ""), rec("캠A", "신규", "")]);
        assert_eq!(t.value("캠A", "주문승인"), Some(&CellValue::number(1.0)));
        assert_eq!(t.value("캠A", "신규"), Some(&CellValue::number(1.0)));
        assert_eq!(t.value("캠A", "총합계"), Some(&CellValue::number(2.0)));
        assert_eq!(t.value("캠A", "전환율"), Some(&CellValue::number(50.0)));
    }

    #[test]
    fn ordering_dedup_and_other_status() {
        let t = campaign_by_status(&[
            rec("재분배1", "예약", "o1"),
            rec("정규B", "주문승인", "o2"),
            rec("정규A", "보류", "o3"),
            rec("캠Z", "주문승인", "o4"),
            rec("캠Z", "주문승인", "o4"),
            rec("V-1", "주문승인", "o5"),
        ]);
        let labels: Vec<String> = t.rows.iter().map(|r| r[0].as_text().into_owned()).collect();
        assert_eq!(labels, vec!["캠Z", "정규A", "정규B", "재분배1", "총합계"]);
        assert_eq!(t.value("캠Z", "총합계"), Some(&CellValue::number(1.0)));
        assert_eq!(t.value("정규A", "기타"), Some(&CellValue::number(1.0)));
        assert_eq!(t.value("총합계", "총합계"), Some(&CellValue::number(4.0)));
        assert_eq!(t.value("총합계", "전환율"), Some(&CellValue::number(50.0)));
    }

    #[test]
    fn empty_pivot() {
        let t = campaign_by_status(&[rec("V-1", "주문승인", "")]);
        assert!(t.is_empty());
        assert_eq!(t.columns.len(), 16);
    }
}
