//! Deterministic staggering of cache refreshes across the month.

use chrono::{Datelike, NaiveDate};

/// Whether the cached data for `id` should be refetched today.
///
/// Each id lands on one day of the month, spread by `expected_count`. The
/// comparison is against `day + 1`, so an id's refresh falls on the day before
/// the residue would suggest.
pub fn refresh_due(id: u64, expected_count: u64, days_in_month: u32, day: u32) -> bool {
    if days_in_month == 0 {
        return false;
    }
    let slot = id.wrapping_mul(expected_count) % u64::from(days_in_month);
    slot == u64::from(day) + 1
}

/// Number of days in the month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// [`refresh_due`] evaluated for `today`.
pub fn refresh_due_on(id: u64, expected_count: u64, today: NaiveDate) -> bool {
    refresh_due(id, expected_count, days_in_month(today), today.day())
}
