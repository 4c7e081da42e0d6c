//! Property-based tests for the poll lifecycle
//!
//! Tests for:
//! - Creation: fresh polls have zero tallies and no voters
//! - Voting: tallies always sum to the voter count, no identity counted twice
//! - Closing: closed or expired polls reject every vote; failed closes change nothing

use super::clock::ManualClock;
use super::error::PollError;
use super::manager::PollManager;
use super::policy::AccessPolicy;
use super::types::{PollId, VoterId};
use proptest::prelude::*;
use std::collections::HashSet;

const START: u64 = 1_700_000_000;

fn owner() -> VoterId {
    VoterId::from("owner")
}

fn fresh_manager() -> (PollManager<ManualClock>, ManualClock) {
    let clock = ManualClock::new(START);
    let manager = PollManager::with_clock(AccessPolicy::owner(owner()), clock.clone());
    (manager, clock)
}

fn option_labels() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{1,8}", 2..=10).prop_map(|set| set.into_iter().collect())
}

proptest! {
    /// Property: creation yields an empty, open poll
    #[test]
    fn created_poll_is_empty(
        title in "[A-Za-z ]{0,20}[A-Za-z]",
        options in option_labels(),
        duration in 1u64..1_000_000,
    ) {
        let (manager, _) = fresh_manager();
        let poll = manager.create_poll(&title, &options, duration, &owner()).unwrap();

        prop_assert!(poll.is_active());
        prop_assert_eq!(poll.vote_counts().len(), options.len());
        prop_assert_eq!(poll.vote_counts().iter().sum::<u64>(), 0);
        prop_assert_eq!(poll.total_votes(), 0);
        prop_assert_eq!(poll.end_time(), START + duration);
    }

    /// Property: tallies sum to the voter count after any vote sequence
    #[test]
    fn tallies_match_voters(
        options in option_labels(),
        votes in prop::collection::vec((0usize..12, 0u8..20), 0..100),
    ) {
        let (manager, _) = fresh_manager();
        let id = manager.create_poll("q", &options, 3600, &owner()).unwrap().id();

        let mut accepted: HashSet<u8> = HashSet::new();
        for (option, voter) in votes {
            let result = manager.cast_vote(id, option, &VoterId::new(format!("v{}", voter)));
            match result {
                Ok(()) => {
                    prop_assert!(option < options.len());
                    prop_assert!(accepted.insert(voter), "voter counted twice");
                }
                Err(PollError::InvalidOption { .. }) => prop_assert!(option >= options.len()),
                Err(PollError::AlreadyVoted(_)) => prop_assert!(accepted.contains(&voter)),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }

            let snapshot = manager.snapshot();
            let poll = &snapshot.polls[0];
            prop_assert_eq!(poll.vote_counts().iter().sum::<u64>(), poll.total_votes());
            prop_assert_eq!(poll.total_votes(), accepted.len() as u64);
        }
    }

    /// Property: no vote lands after close, whoever casts it
    #[test]
    fn closed_poll_rejects_votes(
        option in 0usize..2,
        voter in "[a-z]{1,6}",
    ) {
        let (manager, _) = fresh_manager();
        let id = manager.create_poll("q", &["a", "b"], 3600, &owner()).unwrap().id();
        manager.close_poll(id, &owner()).unwrap();

        prop_assert_eq!(
            manager.cast_vote(id, option, &VoterId::new(voter)),
            Err(PollError::PollClosed(id))
        );
    }

    /// Property: any vote at or past the deadline is rejected without a close
    #[test]
    fn expired_poll_rejects_votes(
        duration in 1u64..10_000,
        late_by in 0u64..10_000,
    ) {
        let (manager, clock) = fresh_manager();
        let id = manager.create_poll("q", &["a", "b"], duration, &owner()).unwrap().id();
        clock.advance(duration + late_by);

        prop_assert_eq!(
            manager.cast_vote(id, 0, &VoterId::from("late")),
            Err(PollError::PollClosed(id))
        );
        prop_assert!(manager.get_poll(id, None).unwrap().is_active);
    }

    /// Property: a second close fails and leaves the ledger untouched
    #[test]
    fn second_close_changes_nothing(
        voters in prop::collection::hash_set("[a-z]{1,6}", 0..20),
    ) {
        let (manager, _) = fresh_manager();
        let id = manager.create_poll("q", &["a", "b", "c"], 3600, &owner()).unwrap().id();
        for (i, voter) in voters.iter().enumerate() {
            manager.cast_vote(id, i % 3, &VoterId::new(voter.clone())).unwrap();
        }

        let first = manager.close_poll(id, &owner()).unwrap();
        let before = manager.snapshot();
        prop_assert_eq!(
            manager.close_poll(id, &owner()),
            Err(PollError::PollAlreadyClosed(id))
        );
        prop_assert_eq!(manager.snapshot(), before);
        prop_assert_eq!(first.total_votes, voters.len() as u64);
    }

    /// Property: lookups of unknown ids always fail with PollNotFound
    #[test]
    fn unknown_ids_not_found(raw in 1u64..u64::MAX) {
        let (manager, _) = fresh_manager();
        manager.create_poll("q", &["a", "b"], 3600, &owner()).unwrap();
        let id = PollId(raw);

        prop_assert_eq!(manager.get_poll(id, None), Err(PollError::PollNotFound(id)));
        prop_assert_eq!(
            manager.cast_vote(id, 0, &VoterId::from("a")),
            Err(PollError::PollNotFound(id))
        );
    }
}
