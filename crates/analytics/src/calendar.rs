// Business days and the injectable clock used to pick the default daily date

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};

/// Decides which dates count as business days.
pub trait BusinessCalendar: Send + Sync {
    fn is_business_day(&self, date: NaiveDate) -> bool;

    /// `date` itself if it is a business day, otherwise the closest earlier
    /// one. Gives up after a year and returns `date` unchanged.
    fn latest_business_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        for _ in 0..366 {
            if self.is_business_day(day) {
                return day;
            }
            match day.checked_sub_signed(Duration::days(1)) {
                Some(prev) => day = prev,
                None => break,
            }
        }
        date
    }
}

/// Monday to Friday, minus configured holidays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekdayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendar {
    pub fn new<I: IntoIterator<Item = NaiveDate>>(holidays: I) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn holidays(&self) -> impl Iterator<Item = &NaiveDate> {
        self.holidays.iter()
    }
}

impl BusinessCalendar for WeekdayCalendar {
    fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}

/// Source of "today".
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always returns the same date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Date for a daily report.
///
/// A pinned date wins. Otherwise the latest date present in the data that
/// is a business day, then the latest date present at all, and with no
/// dated rows the latest business day on or before today.
pub fn choose_report_date<I>(
    pinned: Option<NaiveDate>,
    present: I,
    calendar: &dyn BusinessCalendar,
    clock: &dyn Clock,
) -> NaiveDate
where
    I: IntoIterator<Item = NaiveDate>,
{
    if let Some(date) = pinned {
        return date;
    }
    let dates: BTreeSet<NaiveDate> = present.into_iter().collect();
    dates
        .iter()
        .rev()
        .find(|d| calendar.is_business_day(**d))
        .or_else(|| dates.iter().next_back())
        .copied()
        .unwrap_or_else(|| calendar.latest_business_day(clock.today()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekends_and_holidays_are_closed() {
        let cal = WeekdayCalendar::new([d(2024, 3, 1)]);
        assert!(!cal.is_business_day(d(2024, 3, 1))); // holiday, Friday
        assert!(!cal.is_business_day(d(2024, 3, 2))); // Saturday
        assert!(cal.is_business_day(d(2024, 3, 4)));
        assert_eq!(cal.latest_business_day(d(2024, 3, 3)), d(2024, 2, 29));
    }

    #[test]
    fn report_date_preference() {
        let cal = WeekdayCalendar::default();
        let clock = FixedClock(d(2024, 3, 10)); // Sunday
        let pinned = Some(d(2024, 1, 2));
        assert_eq!(choose_report_date(pinned, [d(2024, 3, 4)], &cal, &clock), d(2024, 1, 2));

        // Saturday data falls back to the latest weekday present
        let present = [d(2024, 3, 4), d(2024, 3, 9), d(2024, 3, 5)];
        assert_eq!(choose_report_date(None, present, &cal, &clock), d(2024, 3, 5));

        assert_eq!(choose_report_date(None, [d(2024, 3, 9)], &cal, &clock), d(2024, 3, 9));
        assert_eq!(choose_report_date(None, [], &cal, &clock), d(2024, 3, 8));
    }
}
