// Schema normalization: map export headers onto canonical column names
//
// Each input kind has a closed vocabulary of canonical columns. A canonical
// column is resolved against the sheet's labels in three passes:
//   1. exact: the canonical name or its primary export label
//   2. duplicate-suffix retry: `<primary>.0`, then `<primary>.1`
//   3. containment: first unclaimed label containing any synonym
// Comparisons ignore case and whitespace. A source label is claimed by at
// most one canonical column, and canonicals are resolved in vocabulary
// order (specific names such as `agent_org` before `agent`).

use std::collections::BTreeMap;
use std::fmt;

use salesdash_core::{CellValue, RawSheet};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Canonical names
// ---------------------------------------------------------------------------

pub mod col {
    pub const AGENT: &str = "agent";
    pub const AGENT_ORG: &str = "agent_org";
    pub const PRODUCT_CATEGORY: &str = "product_category";
    pub const CAMPAIGN_ROUND: &str = "campaign_round";
    pub const SALE_TYPE: &str = "sale_type";
    pub const SALE_INBOUND_CHANNEL: &str = "sale_inbound_channel";
    pub const SALE_CHANNEL: &str = "sale_channel";
    pub const ORDER_DATE: &str = "order_date";
    pub const REVENUE_GROSS: &str = "revenue_gross";
    pub const DB_STATUS: &str = "db_status";
    pub const ORDER_NUMBER: &str = "order_number";
    pub const MONTHLY_RENTAL: &str = "monthly_rental";
    pub const TERM_MONTHS: &str = "term_months";
    pub const PACKAGE_DISCOUNT_ROUNDS: &str = "package_discount_rounds";
    pub const SALE_AMOUNT: &str = "sale_amount";
    pub const PREPAID_RENTAL: &str = "prepaid_rental";
    pub const LUMP_SUM_EXTRA_DISCOUNT: &str = "lump_sum_extra_discount";
    pub const INSTALLATION_DATE: &str = "installation_date";
    pub const CALL_COUNT: &str = "call_count";
    pub const CALL_TIME_DISPLAY: &str = "call_time_display";
}

/// One canonical column: its name, the header the exports normally use,
/// and the fragments accepted by the containment pass.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub synonyms: &'static [&'static str],
}

const fn spec(name: &'static str, label: &'static str, synonyms: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec { name, label, synonyms }
}

const AGENT_ORG: ColumnSpec = spec(col::AGENT_ORG, "상담사 조직", &["상담사조직", "소속조직", "소속"]);
const AGENT: ColumnSpec = spec(col::AGENT, "상담사", &["상담사", "상담원", "담당자", "사원명"]);
const PRODUCT_CATEGORY: ColumnSpec = spec(col::PRODUCT_CATEGORY, "대분류", &["대분류", "제품군", "품목군"]);
const CAMPAIGN_ROUND: ColumnSpec =
    spec(col::CAMPAIGN_ROUND, "일반회차 캠페인", &["일반회차캠페인", "일반회차", "캠페인회차", "캠페인"]);
const SALE_TYPE: ColumnSpec = spec(col::SALE_TYPE, "판매 유형", &["판매유형", "매출유형", "상품유형"]);
const SALE_INBOUND_CHANNEL: ColumnSpec =
    spec(col::SALE_INBOUND_CHANNEL, "판매인입경로", &["판매인입경로", "인입경로", "인입채널"]);
const SALE_CHANNEL: ColumnSpec = spec(col::SALE_CHANNEL, "판매채널", &["판매채널", "매출채널", "판매처"]);
const ORDER_DATE: ColumnSpec = spec(col::ORDER_DATE, "주문 일자", &["주문일자", "주문일", "승인일자", "계약일자"]);
const REVENUE_GROSS: ColumnSpec = spec(col::REVENUE_GROSS, "매출 금액", &["매출금액", "매출액", "총매출"]);
const DB_STATUS: ColumnSpec = spec(col::DB_STATUS, "상담DB상태", &["상담db상태", "db상태", "상담상태"]);
const ORDER_NUMBER: ColumnSpec = spec(col::ORDER_NUMBER, "주문번호", &["주문번호", "계약번호"]);
const MONTHLY_RENTAL: ColumnSpec =
    spec(col::MONTHLY_RENTAL, "월 렌탈 금액", &["월렌탈금액", "월렌탈료", "렌탈료", "월납입금"]);
const TERM_MONTHS: ColumnSpec = spec(col::TERM_MONTHS, "약정 기간 값", &["약정기간", "의무사용기간", "약정개월"]);
const PACKAGE_DISCOUNT_ROUNDS: ColumnSpec =
    spec(col::PACKAGE_DISCOUNT_ROUNDS, "총 패키지 할인 회차", &["총패키지할인회차", "패키지할인회차"]);
const LUMP_SUM_EXTRA_DISCOUNT: ColumnSpec =
    spec(col::LUMP_SUM_EXTRA_DISCOUNT, "일시불 추가 할인 금액", &["일시불추가할인금액", "일시불추가할인"]);
const SALE_AMOUNT: ColumnSpec = spec(col::SALE_AMOUNT, "판매 금액", &["판매금액"]);
const PREPAID_RENTAL: ColumnSpec = spec(col::PREPAID_RENTAL, "선납 렌탈 금액", &["선납렌탈금액", "선납금액", "선납금"]);
const INSTALLATION_DATE: ColumnSpec =
    spec(col::INSTALLATION_DATE, "설치 일자", &["설치일자", "설치완료일", "설치일"]);
const CALL_AGENT: ColumnSpec = spec(col::AGENT, "상담원명", &["상담원명", "상담사", "상담원", "이름"]);
const CALL_COUNT: ColumnSpec = spec(col::CALL_COUNT, "총 건수", &["총건수", "통화건수", "건수"]);
const CALL_TIME_DISPLAY: ColumnSpec = spec(col::CALL_TIME_DISPLAY, "총 시간", &["총시간", "통화시간", "콜타임"]);

const CONTRACT_COLUMNS: &[ColumnSpec] = &[
    AGENT_ORG,
    AGENT,
    PRODUCT_CATEGORY,
    CAMPAIGN_ROUND,
    SALE_TYPE,
    SALE_INBOUND_CHANNEL,
    SALE_CHANNEL,
    ORDER_DATE,
    REVENUE_GROSS,
    DB_STATUS,
    ORDER_NUMBER,
];

const SALES_COLUMNS: &[ColumnSpec] = &[
    AGENT_ORG,
    AGENT,
    PRODUCT_CATEGORY,
    CAMPAIGN_ROUND,
    SALE_TYPE,
    SALE_INBOUND_CHANNEL,
    SALE_CHANNEL,
    ORDER_DATE,
    REVENUE_GROSS,
    ORDER_NUMBER,
    MONTHLY_RENTAL,
    TERM_MONTHS,
    PACKAGE_DISCOUNT_ROUNDS,
    LUMP_SUM_EXTRA_DISCOUNT,
    SALE_AMOUNT,
    PREPAID_RENTAL,
];

const INSTALLATION_COLUMNS: &[ColumnSpec] = &[
    AGENT_ORG,
    AGENT,
    PRODUCT_CATEGORY,
    CAMPAIGN_ROUND,
    SALE_TYPE,
    SALE_INBOUND_CHANNEL,
    SALE_CHANNEL,
    INSTALLATION_DATE,
    ORDER_DATE,
    REVENUE_GROSS,
    ORDER_NUMBER,
    MONTHLY_RENTAL,
    TERM_MONTHS,
    PACKAGE_DISCOUNT_ROUNDS,
    LUMP_SUM_EXTRA_DISCOUNT,
    SALE_AMOUNT,
    PREPAID_RENTAL,
];

const CALL_TIME_COLUMNS: &[ColumnSpec] = &[CALL_AGENT, CALL_COUNT, CALL_TIME_DISPLAY];

// ---------------------------------------------------------------------------
// Input kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Approval/sales export.
    Sales,
    /// Contract/consultation export.
    Contract,
    /// Call-recording system export.
    CallTime,
    /// Installation export.
    Installation,
}

impl InputKind {
    pub fn columns(&self) -> &'static [ColumnSpec] {
        match self {
            Self::Sales => SALES_COLUMNS,
            Self::Contract => CONTRACT_COLUMNS,
            Self::CallTime => CALL_TIME_COLUMNS,
            Self::Installation => INSTALLATION_COLUMNS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Contract => "contract",
            Self::CallTime => "call_time",
            Self::Installation => "installation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sales" | "approval" => Some(Self::Sales),
            "contract" | "consultation" => Some(Self::Contract),
            "call_time" | "call-time" | "calls" => Some(Self::CallTime),
            "installation" | "install" => Some(Self::Installation),
            _ => None,
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Normalized sheet
// ---------------------------------------------------------------------------

/// A raw sheet plus the resolved canonical-to-source column mapping.
#[derive(Debug, Clone)]
pub struct NormalizedSheet {
    pub kind: InputKind,
    pub sheet: RawSheet,
    mapping: BTreeMap<&'static str, usize>,
}

impl NormalizedSheet {
    pub fn height(&self) -> usize {
        self.sheet.height()
    }

    pub fn has(&self, column: &str) -> bool {
        self.mapping.contains_key(column)
    }

    pub fn index(&self, column: &str) -> Option<usize> {
        self.mapping.get(column).copied()
    }

    /// Source header a canonical column was resolved to.
    pub fn source_label(&self, column: &str) -> Option<&str> {
        self.index(column).map(|i| self.sheet.columns[i].as_str())
    }

    /// Cell for a canonical column; null when the column is unmapped.
    pub fn get(&self, row: usize, column: &str) -> &CellValue {
        match self.index(column) {
            Some(c) => self.sheet.cell(row, c),
            None => &CellValue::NULL,
        }
    }

    /// Trimmed text of a canonical column.
    pub fn text(&self, row: usize, column: &str) -> String {
        self.get(row, column).trimmed()
    }

    pub fn mapping(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.mapping
            .iter()
            .map(|(name, &i)| (*name, self.sheet.columns[i].as_str()))
    }
}

/// Canonical columns that could not be resolved, in vocabulary order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingRequired(pub Vec<&'static str>);

impl MissingRequired {
    pub fn contains(&self, column: &str) -> bool {
        self.0.iter().any(|c| *c == column)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Resolve the sheet's labels against the vocabulary for `kind`.
pub fn normalize(raw: RawSheet, kind: InputKind) -> (NormalizedSheet, MissingRequired) {
    let folded: Vec<String> = raw.columns.iter().map(|c| fold(c)).collect();
    let mut claimed = vec![false; folded.len()];
    let mut mapping = BTreeMap::new();
    let mut missing = Vec::new();

    for spec in kind.columns() {
        match resolve(spec, &folded, &claimed) {
            Some(idx) => {
                claimed[idx] = true;
                log::debug!("{kind}: '{}' -> {}", raw.columns[idx], spec.name);
                mapping.insert(spec.name, idx);
            }
            None => missing.push(spec.name),
        }
    }

    if !missing.is_empty() {
        log::debug!("{kind}: unresolved columns {missing:?}");
    }

    (NormalizedSheet { kind, sheet: raw, mapping }, MissingRequired(missing))
}

fn resolve(spec: &ColumnSpec, folded: &[String], claimed: &[bool]) -> Option<usize> {
    let free = |i: &usize| !claimed[*i];
    let name = fold(spec.name);
    let label = fold(spec.label);

    // 1. exact
    if let Some(i) = (0..folded.len())
        .filter(free)
        .find(|&i| folded[i] == name || folded[i] == label)
    {
        return Some(i);
    }

    // 2. duplicate-suffix retry
    for suffix in [".0", ".1"] {
        let wanted = format!("{label}{suffix}");
        if let Some(i) = (0..folded.len()).filter(free).find(|&i| folded[i] == wanted) {
            return Some(i);
        }
    }

    // 3. containment
    let synonyms: Vec<String> = spec.synonyms.iter().map(|s| fold(s)).collect();
    (0..folded.len())
        .filter(free)
        .find(|&i| synonyms.iter().any(|s| folded[i].contains(s.as_str())))
}
