//! Poll Lifecycle Manager.
//!
//! Owns every poll record and enforces the lifecycle:
//!
//! ```text
//! create ──> Open ──close──> Closed (terminal, results revealed)
//!             │
//!             └─ votes accepted while Open and now < end_time
//! ```
//!
//! ## Concurrency
//!
//! The registry (id allocation, poll lookup) sits behind one `RwLock`; each
//! poll sits behind its own `RwLock`. Mutations of a poll take its write
//! lock, so at most one mutation per poll is in flight while reads and
//! mutations of other polls proceed. All checks run before any field is
//! touched, so a rejected call leaves the poll unchanged. Events are sent
//! while the lock that guarded the mutation is still held, so subscribers
//! see them in commit order.

use super::clock::{Clock, SystemClock};
use super::error::{PollError, PollResult};
use super::events::{EventStream, PollEvent, EVENT_BUFFER};
use super::policy::AccessPolicy;
use super::types::{FinalResults, Poll, PollId, PollView, VoterId};
use super::validation::{deadline, normalize_options, normalize_title};
use crate::ledger::{LedgerError, LedgerResult, LedgerSnapshot};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

type PollCell = Arc<RwLock<Poll>>;

struct Registry {
    polls: BTreeMap<PollId, PollCell>,
    next_id: u64,
}

/// Authoritative in-process store of polls.
///
/// Construct one per hosting process and pass it where needed; there is
/// no global instance.
pub struct PollManager<C: Clock = SystemClock> {
    registry: RwLock<Registry>,
    policy: AccessPolicy,
    clock: C,
    events: broadcast::Sender<PollEvent>,
}

// Every mutation validates before writing, so a panicking holder cannot
// leave a half-applied change behind. Recover the guard instead of
// propagating poison.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl PollManager<SystemClock> {
    pub fn new(policy: AccessPolicy) -> Self {
        Self::with_clock(policy, SystemClock)
    }
}

impl<C: Clock> PollManager<C> {
    pub fn with_clock(policy: AccessPolicy, clock: C) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            registry: RwLock::new(Registry {
                polls: BTreeMap::new(),
                next_id: 0,
            }),
            policy,
            clock,
            events,
        }
    }

    /// Rebuild a manager from a ledger snapshot.
    ///
    /// Every record is re-checked; a snapshot that breaks an invariant is
    /// rejected as corrupt rather than partially loaded.
    pub fn from_snapshot(
        snapshot: LedgerSnapshot,
        policy: AccessPolicy,
        clock: C,
    ) -> LedgerResult<Self> {
        let mut polls = BTreeMap::new();
        for poll in snapshot.polls {
            poll.check_invariants().map_err(LedgerError::Corrupt)?;
            if poll.id().0 >= snapshot.next_poll_id {
                return Err(LedgerError::Corrupt(format!(
                    "poll {} is not below next id {}",
                    poll.id(),
                    snapshot.next_poll_id
                )));
            }
            let id = poll.id();
            if polls.insert(id, Arc::new(RwLock::new(poll))).is_some() {
                return Err(LedgerError::Corrupt(format!("duplicate poll id {}", id)));
            }
        }

        let manager = Self::with_clock(policy, clock);
        *write(&manager.registry) = Registry {
            polls,
            next_id: snapshot.next_poll_id,
        };
        Ok(manager)
    }

    /// Copy every poll record for the ledger. The revision is left at 0;
    /// the caller stamps the revision it loaded before storing.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let registry = read(&self.registry);
        LedgerSnapshot {
            next_poll_id: registry.next_id,
            polls: registry.polls.values().map(|cell| read(cell).clone()).collect(),
            ..LedgerSnapshot::default()
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Subscribe to lifecycle events emitted from now on.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Create an open poll.
    ///
    /// Title and options are trimmed; empty and repeated options are
    /// dropped before the 2..=10 bound is checked. A deadline past
    /// `MAX_END_TIME` is an `InvalidDuration`.
    pub fn create_poll<S: AsRef<str>>(
        &self,
        title: &str,
        options: &[S],
        duration_secs: u64,
        creator: &VoterId,
    ) -> PollResult<Poll> {
        if !self.policy.can_create(creator) {
            warn!(creator = %creator, "poll creation rejected: not an administrator");
            return Err(PollError::Unauthorized);
        }
        let title = normalize_title(title)?;
        let options = normalize_options(options)?;
        let now = self.clock.now();
        let end_time = deadline(now, duration_secs)?;

        let mut registry = write(&self.registry);
        let id = PollId(registry.next_id);
        let poll = Poll::new(id, title, options, creator.clone(), now, end_time);
        registry
            .polls
            .insert(id, Arc::new(RwLock::new(poll.clone())));
        registry.next_id += 1;

        info!(
            poll_id = %id,
            options = poll.options().len(),
            end_time,
            "poll created"
        );
        let _ = self.events.send(PollEvent::PollCreated {
            poll_id: id,
            title: poll.title().to_string(),
            options: poll.options().to_vec(),
            end_time,
        });

        Ok(poll)
    }

    /// Cast one vote. Voter registration and the tally increment happen
    /// together under the poll's write lock, or not at all.
    pub fn cast_vote(
        &self,
        poll_id: PollId,
        option_index: usize,
        voter: &VoterId,
    ) -> PollResult<()> {
        let cell = self.cell(poll_id)?;
        let now = self.clock.now();
        let mut poll = write(&cell);
        if !poll.accepts_votes(now) {
            return Err(PollError::PollClosed(poll_id));
        }
        let count = poll.options().len();
        if option_index >= count {
            return Err(PollError::InvalidOption {
                index: option_index,
                count,
            });
        }
        if poll.has_voted(voter) {
            return Err(PollError::AlreadyVoted(poll_id));
        }
        poll.record_vote(option_index, voter.clone());
        debug!(poll_id = %poll_id, total_votes = poll.total_votes(), "vote recorded");

        let _ = self.events.send(PollEvent::VoteCast {
            poll_id,
            voter: voter.clone(),
        });
        Ok(())
    }

    /// Close a poll and reveal its tallies. Irreversible.
    pub fn close_poll(&self, poll_id: PollId, caller: &VoterId) -> PollResult<FinalResults> {
        let cell = self.cell(poll_id)?;
        let now = self.clock.now();
        let mut poll = write(&cell);
        if !poll.is_active() {
            return Err(PollError::PollAlreadyClosed(poll_id));
        }
        if !self.policy.can_close(&poll, caller, now) {
            warn!(poll_id = %poll_id, caller = %caller, "early close rejected");
            return Err(PollError::Unauthorized);
        }
        poll.close();
        let results = poll.final_results();

        info!(
            poll_id = %poll_id,
            total_votes = results.total_votes,
            winner = results.winner,
            "poll closed"
        );
        let _ = self.events.send(PollEvent::PollEnded {
            poll_id,
            results: results.vote_counts.clone(),
        });
        Ok(results)
    }

    /// Reader's view of one poll.
    pub fn get_poll(&self, poll_id: PollId, requester: Option<&VoterId>) -> PollResult<PollView> {
        let cell = self.cell(poll_id)?;
        let now = self.clock.now();
        let view = read(&cell).view(requester, now);
        Ok(view)
    }

    /// Snapshot of every poll at call time, oldest first.
    pub fn list_polls(&self, requester: Option<&VoterId>) -> PollListing {
        let cells: Vec<PollCell> = read(&self.registry).polls.values().cloned().collect();
        let now = self.clock.now();
        let views = cells
            .iter()
            .map(|cell| read(cell).view(requester, now))
            .collect();
        PollListing {
            views: Arc::new(views),
        }
    }

    pub fn has_voted(&self, poll_id: PollId, voter: &VoterId) -> PollResult<bool> {
        let cell = self.cell(poll_id)?;
        let voted = read(&cell).has_voted(voter);
        Ok(voted)
    }

    /// Final tallies of a closed poll.
    pub fn results(&self, poll_id: PollId) -> PollResult<FinalResults> {
        let cell = self.cell(poll_id)?;
        let poll = read(&cell);
        if poll.is_active() {
            return Err(PollError::ResultsHidden(poll_id));
        }
        Ok(poll.final_results())
    }

    /// Id the next created poll will receive.
    pub fn next_poll_id(&self) -> PollId {
        PollId(read(&self.registry).next_id)
    }

    pub fn len(&self) -> usize {
        read(&self.registry).polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, poll_id: PollId) -> PollResult<PollCell> {
        read(&self.registry)
            .polls
            .get(&poll_id)
            .cloned()
            .ok_or(PollError::PollNotFound(poll_id))
    }
}

/// Point-in-time list of poll views.
///
/// Cheap to clone; iterate as many times as needed. Later changes to the
/// manager are not reflected; call `list_polls` again for fresh data.
#[derive(Debug, Clone)]
pub struct PollListing {
    views: Arc<Vec<PollView>>,
}

impl PollListing {
    pub fn iter(&self) -> std::slice::Iter<'_, PollView> {
        self.views.iter()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

impl<'a> IntoIterator for &'a PollListing {
    type Item = &'a PollView;
    type IntoIter = std::slice::Iter<'a, PollView>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
