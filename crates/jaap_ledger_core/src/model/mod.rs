//! Ledger domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own date normalization and the static full-moon calendar.
//!
//! # Invariants
//! - Every entry is keyed by a validated `EntryDate`.
//! - Ledger collections never contain duplicate dates.

pub mod calendar;
pub mod entry;
