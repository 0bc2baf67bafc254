//! Derived totals and crore milestone math.
//!
//! # Responsibility
//! - Compute cumulative, yearly and milestone values from a ledger.
//!
//! # Invariants
//! - Functions are pure and never mutate the ledger.
//! - Absent counts contribute zero.
//! - "Previous entry" means previous in date order, not insertion order.

use crate::model::entry::{EntryDate, Ledger};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Milestone granularity: one crore.
pub const CRORE: u64 = 10_000_000;

/// Progress toward the next crore milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MilestoneProgress {
    /// Fully completed milestones.
    pub completed: u64,
    /// Cumulative total at which the next milestone completes.
    pub next_target: u64,
    /// Amount accumulated inside the current, partial milestone.
    pub progress: u64,
    /// `floor(progress / CRORE * 100)`, always in `0..=99`.
    pub percent: u8,
}

/// Sum of counts for every entry dated on or before `date`.
pub fn cumulative_up_to(ledger: &Ledger, date: &EntryDate) -> u64 {
    ledger
        .entries()
        .iter()
        .filter(|entry| &entry.date <= date)
        .fold(0u64, |sum, entry| sum.saturating_add(entry.count_or_zero()))
}

/// Returns the milestone index completed exactly on `date`.
///
/// `None` when the cumulative total stays inside the same crore as the
/// previous dated entry, or when the ledger has no entry for `date`.
pub fn crossed_milestone(ledger: &Ledger, date: &EntryDate) -> Option<u64> {
    let dates = ledger
        .sorted_dates()
        .into_iter()
        .filter(|candidate| *candidate <= date)
        .collect::<Vec<_>>();
    let index = dates.iter().position(|candidate| *candidate == date)?;

    let previous_total = match index.checked_sub(1) {
        Some(previous) => cumulative_up_to(ledger, dates[previous]),
        None => 0,
    };
    let current_total = cumulative_up_to(ledger, date);

    let previous_crore = previous_total / CRORE;
    let current_crore = current_total / CRORE;
    (current_crore > previous_crore).then_some(current_crore)
}

/// Milestone index completed on each date, for every crossing date.
///
/// Single pass over the date-sorted ledger; agrees with
/// `crossed_milestone` for every entry date.
pub fn milestones_by_date(ledger: &Ledger) -> HashMap<&EntryDate, u64> {
    let mut entries = ledger.entries().iter().collect::<Vec<_>>();
    entries.sort_by(|left, right| left.date.cmp(&right.date));

    let mut crossings = HashMap::new();
    let mut running = 0u64;
    for entry in entries {
        let previous_crore = running / CRORE;
        running = running.saturating_add(entry.count_or_zero());
        let current_crore = running / CRORE;
        if current_crore > previous_crore {
            crossings.insert(&entry.date, current_crore);
        }
    }
    crossings
}

/// Per-year totals keyed by the four-character year prefix.
///
/// Entries without a recorded (non-zero) count are skipped, so a year made
/// only of empty entries is omitted rather than reported as zero.
pub fn yearly_totals(ledger: &Ledger) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for entry in ledger.entries() {
        let count = match entry.count {
            Some(count) if count > 0 => count,
            _ => continue,
        };
        let slot = totals.entry(entry.date.year().to_string()).or_insert(0u64);
        *slot = slot.saturating_add(count);
    }
    totals
}

/// Sum of all counts in the ledger.
pub fn cumulative_total(ledger: &Ledger) -> u64 {
    ledger
        .entries()
        .iter()
        .fold(0u64, |sum, entry| sum.saturating_add(entry.count_or_zero()))
}

pub fn next_milestone_progress(ledger: &Ledger) -> MilestoneProgress {
    progress_for_total(cumulative_total(ledger))
}

/// Milestone progress for an already-computed grand total.
pub fn progress_for_total(total: u64) -> MilestoneProgress {
    let completed = total / CRORE;
    let progress = total % CRORE;
    // progress < CRORE, so the product fits and the quotient is at most 99.
    let percent = (progress * 100 / CRORE) as u8;
    MilestoneProgress {
        completed,
        next_target: completed.saturating_add(1).saturating_mul(CRORE),
        progress,
        percent,
    }
}
