//! Background polling of the peer-conversations endpoint.
//!
//! A `Poller` is a tokio task that exists only while the dashboard page is
//! shown. It fetches once immediately, then once per interval, and reports
//! each fetch to the UI loop as a pair of [`PollEvent`]s.
//!
//! Every poller has a generation number and tags its events with it. An
//! aborted task may still have an event in flight, so the receiver drops
//! events whose generation is not the current poller's.
//!
//! Scheduled fetches are skipped while the terminal window is unfocused
//! (the `visible` watch channel is `false`). A manual retry is always
//! performed. Fetches run one after another inside the task, so there is
//! never more than one poll request outstanding.
//!
//! Dropping the `Poller` aborts the task.

use neuromesh_core::api::{ApiError, MeshApi};
use neuromesh_core::dashboard::FetchKind;
use neuromesh_core::types::PeerSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Progress of one fetch, sent from the poller to the UI loop.
#[derive(Debug, Clone)]
pub enum PollEvent {
    Started(FetchKind),
    Completed(Result<PeerSnapshot, ApiError>),
}

/// A [`PollEvent`] tagged with the generation of the poller that sent it.
#[derive(Debug, Clone)]
pub struct PollUpdate {
    pub generation: u64,
    pub event: PollEvent,
}

/// Handle to a running poll task.
pub struct Poller {
    generation: u64,
    task: JoinHandle<()>,
    retry_tx: mpsc::Sender<()>,
}

impl Poller {
    /// Starts polling `api` every `period`.
    ///
    /// Events go to `events`; the task ends by itself if that receiver is
    /// dropped.
    pub fn spawn<A: MeshApi>(
        api: Arc<A>,
        period: Duration,
        generation: u64,
        visible: watch::Receiver<bool>,
        events: mpsc::Sender<PollUpdate>,
    ) -> Self {
        // Capacity 1: a retry requested while another is queued is redundant.
        let (retry_tx, retry_rx) = mpsc::channel(1);
        let task = tokio::spawn(poll_loop(
            api, period, generation, visible, retry_rx, events,
        ));
        debug!(generation, period_secs = period.as_secs(), "peer poller started");
        Self {
            generation,
            task,
            retry_tx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Asks for an immediate fetch, regardless of the schedule.
    pub fn retry(&self) {
        if self.retry_tx.try_send(()).is_err() {
            trace!("retry already queued");
        }
    }

    /// Stops polling. Equivalent to dropping the handle.
    pub fn stop(self) {}
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.task.abort();
        debug!(generation = self.generation, "peer poller stopped");
    }
}

async fn poll_loop<A: MeshApi>(
    api: Arc<A>,
    period: Duration,
    generation: u64,
    visible: watch::Receiver<bool>,
    mut retry_rx: mpsc::Receiver<()>,
    events: mpsc::Sender<PollUpdate>,
) {
    let mut ticker = tokio::time::interval(period);
    // A slow fetch pushes the schedule back instead of causing a burst.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut fetched_once = false;

    loop {
        let kind = tokio::select! {
            _ = ticker.tick() => {
                if fetched_once { FetchKind::Background } else { FetchKind::Initial }
            }
            Some(()) = retry_rx.recv() => FetchKind::Manual,
        };

        let hidden = !*visible.borrow();
        if hidden && kind != FetchKind::Manual {
            trace!(?kind, "terminal not focused, skipping poll");
            continue;
        }
        fetched_once = true;

        let started = PollUpdate {
            generation,
            event: PollEvent::Started(kind),
        };
        if events.send(started).await.is_err() {
            break;
        }
        let result = api.peer_conversations().await;
        let completed = PollUpdate {
            generation,
            event: PollEvent::Completed(result),
        };
        if events.send(completed).await.is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that counts peer fetches and always answers with no peers.
    #[derive(Default)]
    struct CountingApi {
        fetches: AtomicUsize,
    }

    impl CountingApi {
        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl MeshApi for CountingApi {
        async fn send_chat(&self, _message: &str) -> Result<String, ApiError> {
            Err(ApiError::Transport("not used".to_string()))
        }

        async fn peer_conversations(&self) -> Result<PeerSnapshot, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(PeerSnapshot::new())
        }
    }

    const PERIOD: Duration = Duration::from_secs(5);

    fn started_kinds(rx: &mut mpsc::Receiver<PollUpdate>) -> Vec<FetchKind> {
        let mut kinds = Vec::new();
        while let Ok(update) = rx.try_recv() {
            if let PollEvent::Started(kind) = update.event {
                kinds.push(kind);
            }
        }
        kinds
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_then_every_period() {
        let api = Arc::new(CountingApi::default());
        let (_visible_tx, visible_rx) = watch::channel(true);
        let (tx, mut rx) = mpsc::channel(64);

        let _poller = Poller::spawn(Arc::clone(&api), PERIOD, 1, visible_rx, tx);
        tokio::time::sleep(Duration::from_secs(12)).await;

        // t = 0, 5, 10
        assert_eq!(api.fetches(), 3);
        assert_eq!(
            started_kinds(&mut rx),
            [FetchKind::Initial, FetchKind::Background, FetchKind::Background]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_terminal_skips_scheduled_fetches() {
        let api = Arc::new(CountingApi::default());
        let (visible_tx, visible_rx) = watch::channel(false);
        let (tx, mut rx) = mpsc::channel(64);

        let _poller = Poller::spawn(Arc::clone(&api), PERIOD, 1, visible_rx, tx);
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(api.fetches(), 0);

        visible_tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(api.fetches(), 1);
        // The first fetch that actually happens is still the initial one.
        assert_eq!(started_kinds(&mut rx), [FetchKind::Initial]);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_retry_runs_even_when_hidden() {
        let api = Arc::new(CountingApi::default());
        let (_visible_tx, visible_rx) = watch::channel(false);
        let (tx, mut rx) = mpsc::channel(64);

        let poller = Poller::spawn(Arc::clone(&api), PERIOD, 1, visible_rx, tx);
        poller.retry();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(api.fetches(), 1);
        assert_eq!(started_kinds(&mut rx), [FetchKind::Manual]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_polling() {
        let api = Arc::new(CountingApi::default());
        let (_visible_tx, visible_rx) = watch::channel(true);
        let (tx, _rx) = mpsc::channel(64);

        let poller = Poller::spawn(Arc::clone(&api), PERIOD, 1, visible_rx, tx);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.fetches(), 1);

        poller.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn events_carry_the_poller_generation() {
        let api = Arc::new(CountingApi::default());
        let (_visible_tx, visible_rx) = watch::channel(true);
        let (tx, mut rx) = mpsc::channel(64);

        let poller = Poller::spawn(Arc::clone(&api), PERIOD, 7, visible_rx, tx);
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(poller.generation(), 7);
        let mut count = 0;
        while let Ok(update) = rx.try_recv() {
            assert_eq!(update.generation, 7);
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn every_start_is_followed_by_completion() {
        let api = Arc::new(CountingApi::default());
        let (_visible_tx, visible_rx) = watch::channel(true);
        let (tx, mut rx) = mpsc::channel(64);

        let _poller = Poller::spawn(Arc::clone(&api), PERIOD, 1, visible_rx, tx);
        tokio::time::sleep(Duration::from_secs(11)).await;

        let mut expect_start = true;
        while let Ok(update) = rx.try_recv() {
            match update.event {
                PollEvent::Started(_) => assert!(expect_start, "two starts in a row"),
                PollEvent::Completed(result) => {
                    assert!(!expect_start, "completion without start");
                    assert!(result.unwrap().is_empty());
                }
            }
            expect_start = !expect_start;
        }
        assert!(expect_start, "last fetch never completed");
    }
}
