//! Poll commands: create, vote, close, show, list.
//!
//! Each command opens a session (ledger snapshot → manager), applies one
//! operation, and stores the ledger back only if the operation changed it.
//! The store is checked against the revision the session loaded, so a
//! command racing another writer fails instead of dropping its votes.

use super::config::TallyConfig;
use super::duration::parse_duration_to_secs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, UNIX_EPOCH};
use tally::ledger::{FileLedger, PollLedger};
use tally::poll::{
    AccessPolicy, Clock, FinalResults, PollId, PollManager, PollView, SystemClock, VoterId,
    MAX_END_TIME,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// A manager loaded from a ledger, written back on `commit`.
pub struct Session<L: PollLedger, C: Clock = SystemClock> {
    ledger: L,
    manager: PollManager<C>,
    /// Ledger revision the manager state was built from.
    revision: AtomicU64,
}

impl Session<FileLedger, SystemClock> {
    pub async fn from_config(config: &TallyConfig) -> CliResult<Self> {
        let ledger = FileLedger::new(&config.ledger.path);
        Self::open(ledger, config.access.policy(), SystemClock).await
    }
}

impl<L: PollLedger, C: Clock> Session<L, C> {
    pub async fn open(ledger: L, policy: AccessPolicy, clock: C) -> CliResult<Self> {
        let (manager, revision) = match ledger.load().await? {
            Some(snapshot) => {
                let revision = snapshot.revision;
                (PollManager::from_snapshot(snapshot, policy, clock)?, revision)
            }
            None => (PollManager::with_clock(policy, clock), 0),
        };
        Ok(Self {
            ledger,
            manager,
            revision: AtomicU64::new(revision),
        })
    }

    pub async fn commit(&self) -> CliResult<()> {
        let mut snapshot = self.manager.snapshot();
        snapshot.revision = self.revision.load(Ordering::SeqCst);
        let revision = self.ledger.store(&snapshot).await?;
        self.revision.store(revision, Ordering::SeqCst);
        Ok(())
    }

    pub async fn create(
        &self,
        title: &str,
        options: &[String],
        duration: &str,
        identity: &VoterId,
    ) -> CliResult<String> {
        let duration_secs = parse_duration_to_secs(duration)?;
        let poll = self
            .manager
            .create_poll(title, options, duration_secs, identity)?;
        self.commit().await?;

        Ok(format!(
            "Created poll {} \"{}\" with {} options, voting ends {}",
            poll.id(),
            poll.title(),
            poll.options().len(),
            format_timestamp(poll.end_time())
        ))
    }

    pub async fn vote(&self, poll_id: u64, option: usize, identity: &VoterId) -> CliResult<String> {
        self.manager.cast_vote(PollId(poll_id), option, identity)?;
        self.commit().await?;
        Ok(format!("Vote recorded in poll {}", poll_id))
    }

    pub async fn close(&self, poll_id: u64, identity: &VoterId) -> CliResult<String> {
        let results = self.manager.close_poll(PollId(poll_id), identity)?;
        self.commit().await?;

        let view = self.manager.get_poll(PollId(poll_id), None)?;
        Ok(render_results(&view, &results))
    }

    pub fn show(&self, poll_id: u64, identity: Option<&VoterId>) -> CliResult<String> {
        let view = self.manager.get_poll(PollId(poll_id), identity)?;
        Ok(render_view(&view))
    }

    pub fn list(&self, identity: Option<&VoterId>) -> String {
        let listing = self.manager.list_polls(identity);
        if listing.is_empty() {
            return "No polls yet".to_string();
        }
        listing
            .iter()
            .map(render_summary)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// RFC 3339 for deadlines humantime can render, raw seconds otherwise.
fn format_timestamp(unix_secs: u64) -> String {
    match UNIX_EPOCH.checked_add(Duration::from_secs(unix_secs)) {
        Some(time) if unix_secs <= MAX_END_TIME => {
            humantime::format_rfc3339_seconds(time).to_string()
        }
        _ => format!("{} (unix seconds)", unix_secs),
    }
}

fn status(view: &PollView) -> &'static str {
    if !view.is_active {
        "closed"
    } else if view.accepting_votes {
        "open"
    } else {
        "expired"
    }
}

/// One line per poll for `tally list`.
pub fn render_summary(view: &PollView) -> String {
    format!(
        "[{}] {} ({}, {} votes{})",
        view.id,
        view.title,
        status(view),
        view.total_votes,
        if view.has_voted { ", voted" } else { "" }
    )
}

/// Full poll view for `tally show`.
pub fn render_view(view: &PollView) -> String {
    let mut out = format!(
        "Poll {}: {}\nStatus: {}\nEnds: {}\nVotes: {}\n",
        view.id,
        view.title,
        status(view),
        format_timestamp(view.end_time),
        view.total_votes
    );
    for (index, option) in view.options.iter().enumerate() {
        match &view.results {
            Some(counts) => out.push_str(&format!("  {}. {} - {}\n", index, option, counts[index])),
            None => out.push_str(&format!("  {}. {}\n", index, option)),
        }
    }
    if view.has_voted {
        out.push_str("You have voted in this poll\n");
    }
    out
}

/// Final tallies and winner for `tally close`.
pub fn render_results(view: &PollView, results: &FinalResults) -> String {
    let mut out = format!("Poll {} closed: {}\n", view.id, view.title);
    for (index, count) in results.vote_counts.iter().enumerate() {
        out.push_str(&format!("  {}. {} - {}\n", index, view.options[index], count));
    }
    let winner = &view.options[results.winner];
    if results.is_tie() {
        out.push_str(&format!(
            "Winner: {} (tie, first listed option wins)\n",
            winner
        ));
    } else {
        out.push_str(&format!("Winner: {}\n", winner));
    }
    out
}
