//! Polling cadence and outbound dispatch.
//!
//! [`SyncScheduler`] is a pure state machine over elapsed time: it says
//! which fetches are due, stamps each with a [`Ticket`], refuses responses
//! older than one already applied, and queues single-cell writes. The
//! native [`drive`] loop and the browser front end both feed it their own
//! clock.
//!
//! Consistency is eventual. Failed polls and writes are logged and dropped;
//! the next successful state poll overwrites whatever the optimistic local
//! update guessed.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::bail;
use taskboard_shared::{BoardDto, StateDto, StateWrite};
use tracing::{debug, trace, warn};

use crate::reconcile::Session;

pub const DEFAULT_BOARD_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_STATE_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncIntervals {
    board: Duration,
    state: Duration,
}

impl SyncIntervals {
    /// State must poll strictly faster than the board.
    pub fn new(board: Duration, state: Duration) -> anyhow::Result<Self> {
        if board.is_zero() || state.is_zero() {
            bail!("poll intervals must be non-zero");
        }
        if state >= board {
            bail!(
                "state poll interval ({state:?}) must be shorter than board poll interval ({board:?})"
            );
        }
        Ok(Self { board, state })
    }

    pub fn board(&self) -> Duration {
        self.board
    }

    pub fn state(&self) -> Duration {
        self.state
    }
}

impl Default for SyncIntervals {
    fn default() -> Self {
        Self {
            board: DEFAULT_BOARD_INTERVAL,
            state: DEFAULT_STATE_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Board,
    State,
}

impl Stream {
    fn index(self) -> usize {
        match self {
            Stream::Board => 0,
            Stream::State => 1,
        }
    }
}

/// Identifies one issued fetch. Sequence numbers grow per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub stream: Stream,
    pub seq: u64,
}

pub enum Snapshot {
    Board(BoardDto),
    State(StateDto),
}

#[derive(Debug, Clone)]
pub struct SyncScheduler {
    intervals: SyncIntervals,
    next_due: [Duration; 2],
    issued: [u64; 2],
    accepted: [Option<u64>; 2],
    failures: [u64; 2],
    failed_writes: u64,
    outbound: VecDeque<StateWrite>,
}

impl SyncScheduler {
    pub fn new(intervals: SyncIntervals) -> Self {
        Self {
            intervals,
            next_due: [Duration::ZERO; 2],
            issued: [0; 2],
            accepted: [None; 2],
            failures: [0; 2],
            failed_writes: 0,
            outbound: VecDeque::new(),
        }
    }

    pub fn intervals(&self) -> SyncIntervals {
        self.intervals
    }

    /// Fetches due at `now` (time since start). Both are due at zero.
    pub fn due(&mut self, now: Duration) -> Vec<Ticket> {
        let mut tickets = Vec::with_capacity(2);
        for stream in [Stream::Board, Stream::State] {
            let idx = stream.index();
            if now >= self.next_due[idx] {
                self.issued[idx] += 1;
                self.next_due[idx] = now + self.interval(stream);
                let ticket = Ticket {
                    stream,
                    seq: self.issued[idx],
                };
                trace!(?ticket, ?now, "fetch due");
                tickets.push(ticket);
            }
        }
        tickets
    }

    /// Earliest moment anything becomes due.
    pub fn next_deadline(&self) -> Duration {
        self.next_due[0].min(self.next_due[1])
    }

    /// Whether a response may be applied. Responses arriving after a newer
    /// one for the same stream are stale.
    pub fn accept(&mut self, ticket: Ticket) -> bool {
        let idx = ticket.stream.index();
        if self.accepted[idx].is_some_and(|last| last >= ticket.seq) {
            debug!(?ticket, last = ?self.accepted[idx], "discarding stale response");
            return false;
        }
        self.accepted[idx] = Some(ticket.seq);
        true
    }

    pub fn record_failure(&mut self, stream: Stream, error: &anyhow::Error) {
        let idx = stream.index();
        self.failures[idx] += 1;
        warn!(
            ?stream,
            failures = self.failures[idx],
            error = %error,
            "poll failed; waiting for next cycle"
        );
    }

    pub fn failures(&self, stream: Stream) -> u64 {
        self.failures[stream.index()]
    }

    /// Queues one write per changed cell.
    pub fn dispatch(&mut self, write: StateWrite) {
        trace!(tab = %write.tab_id, cell = %write.cell_id, "queued state write");
        self.outbound.push_back(write);
    }

    pub fn drain_outbound(&mut self) -> Vec<StateWrite> {
        self.outbound.drain(..).collect()
    }

    pub fn pending_writes(&self) -> usize {
        self.outbound.len()
    }

    pub fn record_write_failure(&mut self, write: &StateWrite, error: &anyhow::Error) {
        self.failed_writes += 1;
        warn!(
            tab = %write.tab_id,
            cell = %write.cell_id,
            failed_writes = self.failed_writes,
            error = %error,
            "state write dropped"
        );
    }

    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    fn interval(&self, stream: Stream) -> Duration {
        match stream {
            Stream::Board => self.intervals.board,
            Stream::State => self.intervals.state,
        }
    }
}

/// Applies a fetched snapshot unless its ticket is stale. Returns whether
/// the session changed.
pub fn apply_snapshot(
    session: &mut Session,
    scheduler: &mut SyncScheduler,
    ticket: Ticket,
    snapshot: Snapshot,
) -> bool {
    if !scheduler.accept(ticket) {
        return false;
    }
    match snapshot {
        Snapshot::Board(dto) => session.apply_board_dto(&dto),
        Snapshot::State(dto) => session.apply_state_dto(&dto),
    }
    true
}

#[cfg(feature = "native")]
pub use native::{Transport, drive};

#[cfg(feature = "native")]
mod native {
    use std::future::Future;

    use taskboard_shared::{BoardDto, StateDto, StateWrite};
    use tokio::time::{Instant, sleep_until};
    use tracing::{debug, info};

    use super::{Snapshot, Stream, SyncScheduler, apply_snapshot};
    use crate::reconcile::Session;

    /// The server boundary.
    #[allow(async_fn_in_trait)]
    pub trait Transport {
        async fn fetch_board(&self) -> anyhow::Result<BoardDto>;
        async fn fetch_state(&self) -> anyhow::Result<StateDto>;
        async fn send_state(&self, write: &StateWrite) -> anyhow::Result<()>;
    }

    /// Polls until `shutdown` resolves, calling `on_change` after every
    /// applied snapshot. Writes queued on the scheduler are flushed each
    /// cycle.
    #[tracing::instrument(skip_all)]
    pub async fn drive<T, F>(
        transport: &T,
        session: &mut Session,
        scheduler: &mut SyncScheduler,
        mut on_change: F,
        shutdown: impl Future<Output = ()>,
    ) where
        T: Transport,
        F: FnMut(&Session),
    {
        let started = Instant::now();
        tokio::pin!(shutdown);
        info!(
            board_every = ?scheduler.intervals().board(),
            state_every = ?scheduler.intervals().state(),
            "starting sync loop"
        );

        loop {
            let now = started.elapsed();
            for ticket in scheduler.due(now) {
                let fetched = match ticket.stream {
                    Stream::Board => transport.fetch_board().await.map(Snapshot::Board),
                    Stream::State => transport.fetch_state().await.map(Snapshot::State),
                };
                match fetched {
                    Ok(snapshot) => {
                        if apply_snapshot(session, scheduler, ticket, snapshot) {
                            on_change(&*session);
                        }
                    }
                    Err(err) => scheduler.record_failure(ticket.stream, &err),
                }
            }

            for write in scheduler.drain_outbound() {
                if let Err(err) = transport.send_state(&write).await {
                    scheduler.record_write_failure(&write, &err);
                }
            }

            tokio::select! {
                _ = sleep_until(started + scheduler.next_deadline()) => {}
                _ = &mut shutdown => {
                    debug!("sync loop shutting down");
                    break;
                }
            }
        }
    }
}
