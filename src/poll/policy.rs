//! Who may create and close polls.
//!
//! Administrators play the role of the contract owner: they create polls
//! and may close any poll at any time. Once a poll's deadline has passed
//! anyone may close it.

use super::types::{Poll, VoterId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    administrators: BTreeSet<VoterId>,
    /// Let any identity create polls, not only administrators.
    open_creation: bool,
}

impl AccessPolicy {
    pub fn new<I>(administrators: I) -> Self
    where
        I: IntoIterator<Item = VoterId>,
    {
        Self {
            administrators: administrators.into_iter().collect(),
            open_creation: false,
        }
    }

    /// Policy with a single administrator.
    pub fn owner(owner: VoterId) -> Self {
        Self::new([owner])
    }

    pub fn with_open_creation(mut self, open: bool) -> Self {
        self.open_creation = open;
        self
    }

    pub fn is_administrator(&self, identity: &VoterId) -> bool {
        self.administrators.contains(identity)
    }

    pub fn administrators(&self) -> impl Iterator<Item = &VoterId> {
        self.administrators.iter()
    }

    pub fn can_create(&self, identity: &VoterId) -> bool {
        self.open_creation || self.is_administrator(identity)
    }

    /// Administrators and the poll's creator may close early; anyone may
    /// close after the deadline.
    pub fn can_close(&self, poll: &Poll, identity: &VoterId, now: u64) -> bool {
        self.is_administrator(identity) || poll.creator() == identity || poll.is_expired(now)
    }
}
