// Value coercion: numbers, dates, call durations and derived revenue

use chrono::{NaiveDate, NaiveDateTime};
use salesdash_core::{serial_to_datetime, CellValue};

/// Raw package-discount values that mean "no package discount".
pub const DISCOUNT_SENTINELS: [f64; 3] = [39.0, 59.0, 60.0];

/// Parse a numeric cell. Text may carry thousands separators, a currency
/// sign or a trailing `원`. `None` for blanks and unparseable text.
pub fn parse_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        CellValue::Text(s) => {
            let cleaned: String = s
                .trim()
                .trim_end_matches('원')
                .chars()
                .filter(|c| !matches!(c, ',' | '₩' | ' '))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

/// Numeric value, with blank and malformed cells read as zero. The flag is
/// true when a non-blank cell failed to parse.
pub fn number_or_zero(value: &CellValue) -> (f64, bool) {
    match parse_number(value) {
        Some(n) => (n, false),
        None => (0.0, !value.is_null()),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%Y%m%d", "%Y. %m. %d"];

/// Parse a date-time cell: native date-times, spreadsheet serials and the
/// common text layouts. `None` for blanks and unparseable values.
pub fn parse_datetime(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Number(n) if *n > 0.0 => serial_to_datetime(*n),
        CellValue::Text(s) => parse_datetime_text(s.trim()),
        _ => None,
    }
}

fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    let s = s.trim_end_matches('.');
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    // Date followed by anything else ("2024-03-05 오후 2:10:00")
    let head = s.split_whitespace().next()?;
    if head.len() < s.len() {
        for fmt in DATE_FORMATS {
            if let Ok(d) = NaiveDate::parse_from_str(head, fmt) {
                return d.and_hms_opt(0, 0, 0);
            }
        }
    }
    None
}

/// Calendar date of a date-time cell.
pub fn parse_date(value: &CellValue) -> Option<NaiveDate> {
    parse_datetime(value).map(|dt| dt.date())
}

/// Parse a call duration into seconds.
///
/// All runs of digits are extracted: three runs are `H:MM:SS`, two are
/// `MM:SS`, one is plain seconds. Anything else, including a total that
/// overflows `u64`, is `None`.
pub fn parse_duration(s: &str) -> Option<u64> {
    let parts: Vec<u64> = s
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [h, m, sec] => h.checked_mul(3600)?.checked_add(m.checked_mul(60)?)?.checked_add(*sec),
        [m, sec] => m.checked_mul(60)?.checked_add(*sec),
        [sec] => Some(*sec),
        _ => None,
    }
}

/// Duration cell in seconds. Fractional numbers are spreadsheet time values
/// (days, so `1.5` is 36 hours); whole numbers are seconds, matching a text
/// cell such as `"300"`. Text goes through [`parse_duration`].
pub fn duration_seconds(value: &CellValue) -> Option<u64> {
    match value {
        CellValue::Number(n) if !n.is_finite() || *n < 0.0 => None,
        CellValue::Number(n) if n.fract() == 0.0 => Some(*n as u64),
        CellValue::Number(n) => Some((n * 86_400.0).round() as u64),
        CellValue::DateTime(dt) => {
            let t = dt.time();
            Some(chrono::Timelike::num_seconds_from_midnight(&t) as u64)
        }
        CellValue::Null => None,
        other => parse_duration(&other.as_text()),
    }
}

/// `H:MM:SS`, hours unpadded and unbounded.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}:{:02}", seconds / 3600, (seconds / 60) % 60, seconds % 60)
}

pub fn sanitize_package_discount(raw: f64) -> f64 {
    if DISCOUNT_SENTINELS.contains(&raw) {
        0.0
    } else {
        raw
    }
}

/// Pricing inputs of a sales row. `package_discount_rounds` is already
/// sanitized.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pricing {
    pub monthly_rental: f64,
    pub term_months: f64,
    pub package_discount_rounds: f64,
    pub sale_amount: f64,
    pub prepaid_rental: f64,
    pub lump_sum_extra_discount: f64,
}

impl Pricing {
    pub fn new(
        monthly_rental: f64,
        term_months: f64,
        raw_package_discount_rounds: f64,
        sale_amount: f64,
        prepaid_rental: f64,
        lump_sum_extra_discount: f64,
    ) -> Self {
        Self {
            monthly_rental,
            term_months,
            package_discount_rounds: sanitize_package_discount(raw_package_discount_rounds),
            sale_amount,
            prepaid_rental,
            lump_sum_extra_discount,
        }
    }

    /// `monthly × (term − discount) + sale − lump_sum_discount + prepaid`
    pub fn revenue_gross(&self) -> f64 {
        self.monthly_rental * (self.term_months - self.package_discount_rounds) + self.sale_amount
            - self.lump_sum_extra_discount
            + self.prepaid_rental
    }
}

pub fn ex_vat(gross: f64, vat_rate: f64) -> f64 {
    gross / (1.0 + vat_rate)
}
