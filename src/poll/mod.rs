//! Poll lifecycle: creation, voting, closing and reveal.
//!
//! - Options: 2 to 10 distinct labels, fixed for the poll's lifetime
//! - One vote per identity per poll
//! - Votes only while open and before the deadline
//! - Closing is terminal and reveals the tallies
//! - Per-voter choices are never exposed, only aggregates

pub mod clock;
pub mod error;
pub mod events;
pub mod manager;
pub mod policy;
pub mod types;
pub mod validation;

#[cfg(test)]
mod proptests;

/// Fewest options a poll may have.
pub const MIN_OPTIONS: usize = 2;
/// Most options a poll may have.
pub const MAX_OPTIONS: usize = 10;
/// Latest deadline a poll may carry: 9999-12-31T23:59:59Z in unix seconds.
pub const MAX_END_TIME: u64 = 253_402_300_799;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PollError, PollResult};
pub use events::{EventStream, PollEvent};
pub use manager::{PollListing, PollManager};
pub use policy::AccessPolicy;
pub use types::{FinalResults, Poll, PollId, PollState, PollView, VoterId};
