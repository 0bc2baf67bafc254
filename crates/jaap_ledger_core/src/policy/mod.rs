//! Business policies guarding ledger mutation.

pub mod editability;
