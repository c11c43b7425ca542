// Typed records built from normalized sheets

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use salesdash_core::RawSheet;

use crate::coerce::{self, Pricing};
use crate::error::Warning;
use crate::schema::{col, normalize, InputKind, NormalizedSheet};

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractRecord {
    /// Index of the source row in the normalized sheet.
    pub row: usize,
    pub agent: String,
    pub agent_org: String,
    pub product_category: String,
    pub campaign_round: String,
    pub sale_type: String,
    pub sale_inbound_channel: String,
    pub sale_channel: String,
    pub db_status: String,
    pub order_number: String,
    pub order_date: Option<NaiveDateTime>,
    pub revenue_gross: f64,
    pub revenue_ex_vat: f64,
}

impl ContractRecord {
    pub fn order_day(&self) -> Option<NaiveDate> {
        self.order_date.map(|dt| dt.date())
    }
}

/// Sales and installation rows: contract fields plus pricing inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesRecord {
    pub contract: ContractRecord,
    pub pricing: Pricing,
    pub installation_date: Option<NaiveDateTime>,
}

impl SalesRecord {
    pub fn installation_day(&self) -> Option<NaiveDate> {
        self.installation_date.map(|dt| dt.date())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallTimeRecord {
    pub agent: String,
    pub call_count: u64,
    pub call_time_display: String,
    pub call_time_seconds: u64,
}

/// Fields the classifier and matcher read, shared by every row type.
pub trait RowFields {
    fn agent(&self) -> &str;
    fn product_category(&self) -> &str;
    fn campaign_round(&self) -> &str;
    fn sale_type(&self) -> &str;
    fn sale_inbound_channel(&self) -> &str;
}

impl RowFields for ContractRecord {
    fn agent(&self) -> &str {
        &self.agent
    }
    fn product_category(&self) -> &str {
        &self.product_category
    }
    fn campaign_round(&self) -> &str {
        &self.campaign_round
    }
    fn sale_type(&self) -> &str {
        &self.sale_type
    }
    fn sale_inbound_channel(&self) -> &str {
        &self.sale_inbound_channel
    }
}

impl RowFields for SalesRecord {
    fn agent(&self) -> &str {
        &self.contract.agent
    }
    fn product_category(&self) -> &str {
        &self.contract.product_category
    }
    fn campaign_round(&self) -> &str {
        &self.contract.campaign_round
    }
    fn sale_type(&self) -> &str {
        &self.contract.sale_type
    }
    fn sale_inbound_channel(&self) -> &str {
        &self.contract.sale_inbound_channel
    }
}

impl<T: RowFields> RowFields for &T {
    fn agent(&self) -> &str {
        (*self).agent()
    }
    fn product_category(&self) -> &str {
        (*self).product_category()
    }
    fn campaign_round(&self) -> &str {
        (*self).campaign_round()
    }
    fn sale_type(&self) -> &str {
        (*self).sale_type()
    }
    fn sale_inbound_channel(&self) -> &str {
        (*self).sale_inbound_channel()
    }
}

// ---------------------------------------------------------------------------
// Malformed-value tally
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Malformed(BTreeMap<&'static str, usize>);

impl Malformed {
    fn note(&mut self, column: &'static str, bad: bool) {
        if bad {
            *self.0.entry(column).or_insert(0) += 1;
        }
    }

    fn into_warnings(self, kind: InputKind) -> Vec<Warning> {
        self.0
            .into_iter()
            .map(|(column, count)| {
                log::warn!("{kind}: {count} malformed value(s) in '{column}'");
                Warning::MalformedValue {
                    kind,
                    column: column.to_string(),
                    count,
                }
            })
            .collect()
    }
}

fn number(sheet: &NormalizedSheet, row: usize, column: &'static str, malformed: &mut Malformed) -> f64 {
    let (n, bad) = coerce::number_or_zero(sheet.get(row, column));
    malformed.note(column, bad);
    n
}

fn datetime(sheet: &NormalizedSheet, row: usize, column: &'static str, malformed: &mut Malformed) -> Option<NaiveDateTime> {
    let cell = sheet.get(row, column);
    let parsed = coerce::parse_datetime(cell);
    malformed.note(column, parsed.is_none() && !cell.is_null());
    parsed
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn contract_fields(
    sheet: &NormalizedSheet,
    row: usize,
    revenue_gross: f64,
    vat_rate: f64,
    malformed: &mut Malformed,
) -> ContractRecord {
    ContractRecord {
        row,
        agent: sheet.text(row, col::AGENT),
        agent_org: sheet.text(row, col::AGENT_ORG),
        product_category: sheet.text(row, col::PRODUCT_CATEGORY),
        campaign_round: sheet.text(row, col::CAMPAIGN_ROUND),
        sale_type: sheet.text(row, col::SALE_TYPE),
        sale_inbound_channel: sheet.text(row, col::SALE_INBOUND_CHANNEL),
        sale_channel: sheet.text(row, col::SALE_CHANNEL),
        db_status: sheet.text(row, col::DB_STATUS),
        order_number: sheet.text(row, col::ORDER_NUMBER),
        order_date: datetime(sheet, row, col::ORDER_DATE, malformed),
        revenue_gross,
        revenue_ex_vat: coerce::ex_vat(revenue_gross, vat_rate),
    }
}

/// Contract rows. Gross revenue comes straight from the revenue column.
pub fn contract_records(sheet: &NormalizedSheet, vat_rate: f64) -> (Vec<ContractRecord>, Vec<Warning>) {
    let mut malformed = Malformed::default();
    let records = (0..sheet.height())
        .map(|row| {
            let gross = number(sheet, row, col::REVENUE_GROSS, &mut malformed);
            contract_fields(sheet, row, gross, vat_rate, &mut malformed)
        })
        .collect();
    (records, malformed.into_warnings(sheet.kind))
}

/// Sales or installation rows. Gross revenue is derived from the pricing
/// columns; a sheet with none of them falls back to its revenue column.
pub fn sales_records(sheet: &NormalizedSheet, vat_rate: f64) -> (Vec<SalesRecord>, Vec<Warning>) {
    let mut malformed = Malformed::default();
    let has_pricing = [col::MONTHLY_RENTAL, col::TERM_MONTHS, col::SALE_AMOUNT, col::PREPAID_RENTAL]
        .iter()
        .any(|c| sheet.has(c));

    let records = (0..sheet.height())
        .map(|row| {
            let pricing = Pricing::new(
                number(sheet, row, col::MONTHLY_RENTAL, &mut malformed),
                number(sheet, row, col::TERM_MONTHS, &mut malformed),
                number(sheet, row, col::PACKAGE_DISCOUNT_ROUNDS, &mut malformed),
                number(sheet, row, col::SALE_AMOUNT, &mut malformed),
                number(sheet, row, col::PREPAID_RENTAL, &mut malformed),
                number(sheet, row, col::LUMP_SUM_EXTRA_DISCOUNT, &mut malformed),
            );
            let gross = if has_pricing {
                pricing.revenue_gross()
            } else {
                number(sheet, row, col::REVENUE_GROSS, &mut malformed)
            };
            SalesRecord {
                contract: contract_fields(sheet, row, gross, vat_rate, &mut malformed),
                pricing,
                installation_date: datetime(sheet, row, col::INSTALLATION_DATE, &mut malformed),
            }
        })
        .collect();
    (records, malformed.into_warnings(sheet.kind))
}

// ---------------------------------------------------------------------------
// Call-time rows
// ---------------------------------------------------------------------------

/// Fixed column positions of the call-recording export.
const CALL_AGENT_COL: usize = 1;
const CALL_COUNT_COL: usize = 26;
const CALL_TIME_COL: usize = 27;

/// Outcome of reading a call-time sheet.
#[derive(Debug, Clone, Default)]
pub struct CallTimeRows {
    pub records: Vec<CallTimeRecord>,
    /// Rows dropped as non-agent lines (breaks, totals, IDs).
    pub skipped_invalid: usize,
    /// Rows dropped for a zero or unparseable duration.
    pub skipped_zero: usize,
}

/// Read call-time rows. The export's fixed positions (agent in column 2,
/// count in 27, time in 28) are used when the sheet is wide enough;
/// narrower sheets are resolved by header name.
pub fn call_time_records(raw: RawSheet, invalid_patterns: &[String]) -> CallTimeRows {
    let positions = if raw.width() > CALL_TIME_COL {
        Some((CALL_AGENT_COL, CALL_COUNT_COL, CALL_TIME_COL))
    } else {
        let (norm, _) = normalize(raw.clone(), InputKind::CallTime);
        match (norm.index(col::AGENT), norm.index(col::CALL_COUNT), norm.index(col::CALL_TIME_DISPLAY)) {
            (Some(a), Some(c), Some(t)) => Some((a, c, t)),
            _ => None,
        }
    };

    let mut out = CallTimeRows::default();
    let Some((agent_col, count_col, time_col)) = positions else {
        log::warn!("call-time sheet has neither the fixed layout nor recognizable headers");
        return out;
    };

    for row in 0..raw.height() {
        let agent = raw.cell(row, agent_col).trimmed();
        if agent.is_empty() || invalid_patterns.iter().any(|p| agent.contains(p.as_str())) {
            out.skipped_invalid += 1;
            continue;
        }
        let time_cell = raw.cell(row, time_col);
        let seconds = match coerce::duration_seconds(time_cell) {
            Some(s) if s > 0 => s,
            _ => {
                out.skipped_zero += 1;
                continue;
            }
        };
        let call_count = coerce::parse_number(raw.cell(row, count_col))
            .filter(|n| *n >= 0.0)
            .map_or(0, |n| n.round() as u64);
        out.records.push(CallTimeRecord {
            agent,
            call_count,
            call_time_display: coerce::format_duration(seconds),
            call_time_seconds: seconds,
        });
    }

    log::debug!(
        "call-time: {} rows kept, {} non-agent, {} zero-time",
        out.records.len(),
        out.skipped_invalid,
        out.skipped_zero
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesdash_core::CellValue;

    fn raw(columns: &[&str], rows: Vec<Vec<CellValue>>) -> RawSheet {
        RawSheet {
            name: "t".into(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn sales_revenue_uses_sanitized_discount() {
        let sheet = raw(
            &["상담사", "월 렌탈 금액", "약정 기간 값", "총 패키지 할인 회차", "판매 금액", "선납 렌탈 금액"],
            vec![vec![
                CellValue::text("김부자"),
                CellValue::number(30_000.0),
                CellValue::number(60.0),
                CellValue::number(60.0),
                CellValue::number(100_000.0),
                CellValue::number(0.0),
            ]],
        );
        let (norm, _) = normalize(sheet, InputKind::Sales);
        let (records, warnings) = sales_records(&norm, 0.011);
        assert!(warnings.is_empty());
        assert_eq!(records[0].contract.revenue_gross, 1_900_000.0);
        assert!((records[0].contract.revenue_ex_vat - 1_879_327.4).abs() < 0.1);
        assert_eq!(records[0].pricing.package_discount_rounds, 0.0);
    }

    #[test]
    fn malformed_cells_become_zero_and_are_counted() {
        let sheet = raw(
            &["상담사", "매출 금액", "주문 일자"],
            vec![
                vec![CellValue::text("a"), CellValue::text("n/a"), CellValue::text("someday")],
                vec![CellValue::text("b"), CellValue::text("1,000"), CellValue::text("2024-03-05")],
            ],
        );
        let (norm, _) = normalize(sheet, InputKind::Contract);
        let (records, warnings) = contract_records(&norm, 0.011);
        assert_eq!(records[0].revenue_gross, 0.0);
        assert!(records[0].order_date.is_none());
        assert_eq!(records[1].revenue_gross, 1000.0);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn call_rows_by_header_drop_breaks_and_zero_time() {
        let sheet = raw(
            &["상담원명", "총 건수", "총 시간"],
            vec![
                vec![CellValue::text("김부자"), CellValue::number(40.0), CellValue::text("2:34:18")],
                vec![CellValue::text("휴식"), CellValue::number(1.0), CellValue::text("0:10:00")],
                vec![CellValue::text("이영희"), CellValue::number(0.0), CellValue::text("0:00:00")],
                vec![CellValue::text("합계"), CellValue::number(41.0), CellValue::text("2:44:18")],
            ],
        );
        let patterns: Vec<String> = ["휴식", "합계"].iter().map(|s| s.to_string()).collect();
        let rows = call_time_records(sheet, &patterns);
        assert_eq!(rows.records.len(), 1);
        assert_eq!(rows.records[0].call_time_seconds, 9258);
        assert_eq!(rows.records[0].call_count, 40);
        assert_eq!(rows.skipped_invalid, 2);
        assert_eq!(rows.skipped_zero, 1);
    }

    #[test]
    fn call_row_with_overflowing_time_is_skipped() {
        let sheet = raw(
            &["상담원명", "총 건수", "총 시간"],
            vec![
                vec![CellValue::text("김부자"), CellValue::number(3.0), CellValue::text("9999999999999999:00:00")],
                vec![CellValue::text("이영희"), CellValue::number(2.0), CellValue::text("1:00:00")],
            ],
        );
        let rows = call_time_records(sheet, &[]);
        assert_eq!(rows.records.len(), 1);
        assert_eq!(rows.records[0].agent, "이영희");
        assert_eq!(rows.skipped_zero, 1);
    }

    #[test]
    fn call_rows_by_fixed_position() {
        let columns: Vec<String> = (0..28).map(|i| format!("c{i}")).collect();
        let mut row = vec![CellValue::Null; 28];
        row[1] = CellValue::text("김부자 ");
        row[26] = CellValue::number(12.0);
        row[27] = CellValue::text("45:07");
        let sheet = RawSheet {
            name: "calls".into(),
            columns,
            rows: vec![row],
        };
        let rows = call_time_records(sheet, &[]);
        assert_eq!(rows.records[0].agent, "김부자");
        assert_eq!(rows.records[0].call_time_seconds, 2707);
        assert_eq!(rows.records[0].call_time_display, "0:45:07");
    }
}
