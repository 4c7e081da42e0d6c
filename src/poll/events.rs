//! Lifecycle event stream.
//!
//! Mirrors the ledger events a front end listens to: a poll was created, a
//! vote was cast, a poll ended with its tallies. `VoteCast` names the voter
//! but never the option chosen.

use super::types::{PollId, VoterId};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// Buffered events per subscriber before the slowest one starts lagging.
pub const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollEvent {
    PollCreated {
        poll_id: PollId,
        title: String,
        options: Vec<String>,
        end_time: u64,
    },
    VoteCast {
        poll_id: PollId,
        voter: VoterId,
    },
    PollEnded {
        poll_id: PollId,
        results: Vec<u64>,
    },
}

impl PollEvent {
    pub fn poll_id(&self) -> PollId {
        match self {
            PollEvent::PollCreated { poll_id, .. }
            | PollEvent::VoteCast { poll_id, .. }
            | PollEvent::PollEnded { poll_id, .. } => *poll_id,
        }
    }
}

/// Live stream of lifecycle events for one subscriber.
///
/// Events missed because the subscriber fell behind are skipped; the
/// stream ends when the manager is dropped.
pub struct EventStream {
    inner: BroadcastStream<PollEvent>,
}

impl EventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<PollEvent>) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
        }
    }
}

impl Stream for EventStream {
    type Item = PollEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    tracing::warn!(skipped, "event subscriber lagged");
                    continue;
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
