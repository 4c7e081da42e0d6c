//! Poll records and their read-only projections.
//!
//! A `Poll` is the only mutable entity. It is created open, accepts votes
//! until it is closed or its deadline passes, and is kept forever after
//! closing for historical reads.

use super::validation::{normalize_options, normalize_title};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Sequential poll identifier, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PollId(pub u64);

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An already-authenticated principal (wallet address, account name).
///
/// Authentication happens outside the manager; this is an opaque label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoterId(pub String);

impl VoterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VoterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollState {
    Open,
    Closed,
}

/// A single voting question with fixed options and a deadline.
///
/// Fields are private: every mutation goes through `PollManager`, which
/// validates before it touches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    id: PollId,
    title: String,
    options: Vec<String>,
    creator: VoterId,
    created_at: u64,
    end_time: u64,
    state: PollState,
    /// Tally per option; index matches `options`.
    vote_counts: Vec<u64>,
    voters: BTreeSet<VoterId>,
}

impl Poll {
    pub(crate) fn new(
        id: PollId,
        title: String,
        options: Vec<String>,
        creator: VoterId,
        created_at: u64,
        end_time: u64,
    ) -> Self {
        let vote_counts = vec![0; options.len()];
        Self {
            id,
            title,
            options,
            creator,
            created_at,
            end_time,
            state: PollState::Open,
            vote_counts,
            voters: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> PollId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn creator(&self) -> &VoterId {
        &self.creator
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn end_time(&self) -> u64 {
        self.end_time
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// True until the close transition runs, regardless of the deadline.
    pub fn is_active(&self) -> bool {
        self.state == PollState::Open
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.end_time
    }

    /// Votes are taken only while open and before the deadline.
    pub fn accepts_votes(&self, now: u64) -> bool {
        self.is_active() && !self.is_expired(now)
    }

    pub fn vote_counts(&self) -> &[u64] {
        &self.vote_counts
    }

    pub fn total_votes(&self) -> u64 {
        self.voters.len() as u64
    }

    pub fn has_voted(&self, voter: &VoterId) -> bool {
        self.voters.contains(voter)
    }

    /// Record a ballot. Caller has already checked state, range and
    /// duplicates; both mutations happen under the same write lock.
    pub(crate) fn record_vote(&mut self, option_index: usize, voter: VoterId) {
        self.voters.insert(voter);
        self.vote_counts[option_index] += 1;
    }

    pub(crate) fn close(&mut self) {
        self.state = PollState::Closed;
    }

    /// Check the record invariants. Used when rebuilding from a ledger.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        if normalize_title(&self.title).as_deref() != Ok(self.title.as_str()) {
            return Err(format!("poll {} has a blank or untrimmed title", self.id));
        }
        match normalize_options(self.options.as_slice()) {
            Ok(options) if options == self.options => {}
            Ok(_) => {
                return Err(format!(
                    "poll {} has blank, untrimmed or repeated options",
                    self.id
                ))
            }
            Err(e) => return Err(format!("poll {}: {}", self.id, e)),
        }
        if self.vote_counts.len() != self.options.len() {
            return Err(format!(
                "poll {} has {} tallies for {} options",
                self.id,
                self.vote_counts.len(),
                self.options.len()
            ));
        }
        if self.end_time <= self.created_at {
            return Err(format!("poll {} ends before it starts", self.id));
        }
        if self.end_time > super::MAX_END_TIME {
            return Err(format!("poll {} ends after {}", self.id, super::MAX_END_TIME));
        }
        let counted: u64 = self.vote_counts.iter().sum();
        if counted != self.voters.len() as u64 {
            return Err(format!(
                "poll {} counts {} votes from {} voters",
                self.id,
                counted,
                self.voters.len()
            ));
        }
        Ok(())
    }

    pub(crate) fn final_results(&self) -> FinalResults {
        FinalResults::from_counts(self.id, self.vote_counts.clone())
    }

    /// Project the poll for a reader. Per-voter choices are never part of
    /// the projection; tallies appear only once the poll is closed.
    pub fn view(&self, requester: Option<&VoterId>, now: u64) -> PollView {
        PollView {
            id: self.id,
            title: self.title.clone(),
            options: self.options.clone(),
            created_at: self.created_at,
            end_time: self.end_time,
            is_active: self.is_active(),
            accepting_votes: self.accepts_votes(now),
            total_votes: self.total_votes(),
            has_voted: requester.is_some_and(|r| self.has_voted(r)),
            results: (!self.is_active()).then(|| self.vote_counts.clone()),
        }
    }
}

/// Read-only projection of a poll for one reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollView {
    pub id: PollId,
    pub title: String,
    pub options: Vec<String>,
    pub created_at: u64,
    pub end_time: u64,
    pub is_active: bool,
    /// Open and before the deadline.
    pub accepting_votes: bool,
    pub total_votes: u64,
    pub has_voted: bool,
    /// Revealed tallies; `None` while the poll is open.
    pub results: Option<Vec<u64>>,
}

/// Immutable snapshot of a closed poll's tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResults {
    pub poll_id: PollId,
    pub vote_counts: Vec<u64>,
    pub total_votes: u64,
    /// Option with the most votes; ties go to the lowest index.
    pub winner: usize,
}

impl FinalResults {
    pub fn from_counts(poll_id: PollId, vote_counts: Vec<u64>) -> Self {
        let total_votes = vote_counts.iter().sum();
        let mut winner = 0;
        for (index, count) in vote_counts.iter().enumerate() {
            if *count > vote_counts[winner] {
                winner = index;
            }
        }
        Self {
            poll_id,
            vote_counts,
            total_votes,
            winner,
        }
    }

    /// True when another option has as many votes as the winner.
    pub fn is_tie(&self) -> bool {
        let top = self.vote_counts.get(self.winner).copied().unwrap_or(0);
        self.vote_counts.iter().filter(|c| **c == top).count() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_poll() -> Poll {
        Poll::new(
            PollId(0),
            "Pick a color".to_string(),
            vec!["Red".to_string(), "Blue".to_string()],
            VoterId::from("admin"),
            1_000,
            4_600,
        )
    }

    #[test]
    fn test_new_poll_is_open_with_zero_tallies() {
        let poll = sample_poll();
        assert!(poll.is_active());
        assert_eq!(poll.end_time(), 4_600);
        assert_eq!(poll.vote_counts(), &[0, 0]);
        assert_eq!(poll.total_votes(), 0);
        assert!(poll.check_invariants().is_ok());
    }

    #[test]
    fn test_accepts_votes_until_deadline() {
        let poll = sample_poll();
        assert!(poll.accepts_votes(4_599));
        assert!(!poll.accepts_votes(4_600));
        assert!(poll.is_active()); // expiry does not flip the flag
    }

    #[test]
    fn test_view_hides_tallies_while_open() {
        let mut poll = sample_poll();
        poll.record_vote(1, VoterId::from("A"));

        let view = poll.view(Some(&VoterId::from("A")), 2_000);
        assert!(view.has_voted);
        assert_eq!(view.total_votes, 1);
        assert!(view.results.is_none());

        poll.close();
        let view = poll.view(None, 2_000);
        assert!(!view.has_voted);
        assert_eq!(view.results, Some(vec![0, 1]));
    }

    #[test]
    fn test_winner_breaks_ties_by_lowest_index() {
        let results = FinalResults::from_counts(PollId(3), vec![2, 5, 5]);
        assert_eq!(results.winner, 1);
        assert!(results.is_tie());
        assert_eq!(results.total_votes, 12);

        let results = FinalResults::from_counts(PollId(3), vec![0, 0]);
        assert_eq!(results.winner, 0);
        assert!(results.is_tie());

        let results = FinalResults::from_counts(PollId(3), vec![0, 1]);
        assert_eq!(results.winner, 1);
        assert!(!results.is_tie());
    }

    #[test]
    fn test_invariant_check_catches_tally_drift() {
        let mut poll = sample_poll();
        poll.vote_counts[0] = 4;
        assert!(poll.check_invariants().is_err());
    }

    #[test]
    fn test_invariant_check_catches_unnormalized_labels() {
        let mut poll = sample_poll();
        poll.options[1] = "Red".to_string();
        assert!(poll.check_invariants().is_err());

        let mut poll = sample_poll();
        poll.options[0] = " Red".to_string();
        assert!(poll.check_invariants().is_err());

        let mut poll = sample_poll();
        poll.title = "Pick a color ".to_string();
        assert!(poll.check_invariants().is_err());
    }

    #[test]
    fn test_invariant_check_caps_deadline() {
        let mut poll = sample_poll();
        poll.end_time = u64::MAX;
        assert!(poll.check_invariants().is_err());
    }
}
