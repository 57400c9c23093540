//! Month arithmetic in UTC calendar dates

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Whole months later. A day missing from the target month clamps to its
/// last day, so `2023-01-31` becomes `2023-02-28`.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Anchor one month after `last`, or `None` once `last` is already in
/// `today`'s month
pub fn next_month_window(last: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    if month_start(last) < month_start(today) {
        add_months(last, 1)
    } else {
        None
    }
}

/// Clamped like [`add_months`]
pub fn years_before(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

pub fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
