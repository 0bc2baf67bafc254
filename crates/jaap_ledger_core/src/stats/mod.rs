//! Derived-value calculations over the in-memory ledger.
//!
//! # Responsibility
//! - Provide side-effect free summaries used by snapshots.
//!
//! # Invariants
//! - All functions are total over any well-formed ledger, including empty.

pub mod totals;
