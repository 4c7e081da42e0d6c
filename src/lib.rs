//! Tally - Poll Lifecycle Manager
//!
//! Owns poll records and enforces their lifecycle: creation, one vote per
//! identity while a poll is open, closing, and reveal of the final tallies.
//!
//! Key principles:
//! - Validation before mutation (a failed call changes nothing)
//! - Expiry is checked lazily against the clock, no timers
//! - Individual choices are never exposed, only aggregates
//! - Durable storage sits behind the `PollLedger` trait

pub mod ledger;
pub mod poll;
