//! Edit window policy.
//!
//! # Responsibility
//! - Decide whether an entry date may still be modified.
//!
//! # Invariants
//! - Differences are computed on local calendar dates, never instants.
//! - Future dates and dates older than the window are locked.
//! - There is no override path.

use crate::model::entry::EntryDate;

/// Trailing days (besides today) during which an entry stays editable.
pub const EDIT_WINDOW_DAYS: i64 = 7;

/// Returns whether `date` is editable when the local date is `today`.
pub fn is_editable(date: &EntryDate, today: &EntryDate) -> bool {
    if date == today {
        return true;
    }
    let elapsed = days_between(date, today);
    (0..=EDIT_WINDOW_DAYS).contains(&elapsed)
}

/// Whole calendar days from `date` to `today`; negative for future dates.
pub fn days_between(date: &EntryDate, today: &EntryDate) -> i64 {
    today
        .to_naive()
        .signed_duration_since(date.to_naive())
        .num_days()
}
