//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the two-record storage contract (primary + backup).
//! - Isolate SQLite query details from gateway/session orchestration.
//!
//! # Invariants
//! - Repository APIs move whole payloads; there are no per-entry rows.

pub mod ledger_repo;
