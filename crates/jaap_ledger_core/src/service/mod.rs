//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store access into the ledger use-cases.
//! - Keep presentation layers decoupled from storage details.

pub mod persistence;
pub mod session;
