//! Stale-result guard for repeated fetch-then-aggregate cycles.
//!
//! Each cycle takes a ticket before it starts fetching. When it finishes, its
//! result is kept only if no newer cycle has started in the meantime, so a slow
//! older response can never overwrite a newer one. [`RefreshCycle`] also aborts
//! the superseded fetch instead of letting it run to completion.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct RequestGeneration {
    latest: AtomicU64,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new cycle, superseding every earlier ticket.
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Returns `result` if `ticket` is still the latest, otherwise drops it.
    pub fn accept<T>(&self, ticket: RequestTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            tracing::debug!(
                request = ticket.0,
                latest = self.latest.load(Ordering::SeqCst),
                "discarding stale result"
            );
            None
        }
    }
}

/// Owns the fetch task for a repeating refresh. At most one fetch runs at a
/// time; results come back on the receiver returned by [`RefreshCycle::new`].
pub struct RefreshCycle<T> {
    generation: RequestGeneration,
    in_flight: Option<JoinHandle<()>>,
    results: mpsc::UnboundedSender<(RequestTicket, T)>,
}

impl<T: Send + 'static> RefreshCycle<T> {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(RequestTicket, T)>) {
        let (results, receiver) = mpsc::unbounded_channel();
        let cycle = RefreshCycle {
            generation: RequestGeneration::new(),
            in_flight: None,
            results,
        };
        (cycle, receiver)
    }

    /// Spawns `fetch` under a new ticket, aborting the previous fetch if it is
    /// still running.
    pub fn start<F>(&mut self, fetch: F) -> RequestTicket
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.cancel();
        let ticket = self.generation.begin();
        let results = self.results.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = fetch.await;
            let _ = results.send((ticket, result));
        }));
        ticket
    }

    /// Whether a fetch is still running.
    pub fn is_busy(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn accept(&self, ticket: RequestTicket, result: T) -> Option<T> {
        self.generation.accept(ticket, result)
    }
}

impl<T> RefreshCycle<T> {
    fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            if !handle.is_finished() {
                tracing::debug!("aborting superseded refresh");
                handle.abort();
            }
        }
    }
}

impl<T> Drop for RefreshCycle<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn tickets_increase() {
        let generation = RequestGeneration::new();
        let first = generation.begin();
        let second = generation.begin();
        assert!(second > first);
        assert_eq!(second.id(), first.id() + 1);
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }

    #[test]
    fn only_latest_result_is_accepted() {
        let generation = RequestGeneration::new();
        let old = generation.begin();
        let new = generation.begin();
        assert_eq!(generation.accept(old, "old"), None);
        assert_eq!(generation.accept(new, "new"), Some("new"));
    }

    #[tokio::test]
    async fn slow_older_fetch_cannot_overwrite_newer() {
        crate::logging::init_test();
        let generation = Arc::new(RequestGeneration::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        for (label, delay_ms) in [("slow", 80u64), ("fast", 5u64)] {
            let ticket = generation.begin();
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let _ = tx.send((ticket, label));
            });
        }
        drop(tx);

        let mut shown = Vec::new();
        while let Some((ticket, label)) = rx.recv().await {
            if let Some(label) = generation.accept(ticket, label) {
                shown.push(label);
            }
        }
        assert_eq!(shown, vec!["fast"]);
    }

    #[tokio::test]
    async fn starting_a_refresh_aborts_the_one_in_flight() {
        crate::logging::init_test();
        let (mut cycle, mut results) = RefreshCycle::new();
        let slow_finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&slow_finished);
        cycle.start(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            flag.store(true, Ordering::SeqCst);
            "slow"
        });
        assert!(cycle.is_busy());
        let newest = cycle.start(async { "fast" });

        let (ticket, label) = results.recv().await.unwrap();
        assert_eq!(ticket, newest);
        assert_eq!(cycle.accept(ticket, label), Some("fast"));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!slow_finished.load(Ordering::SeqCst));
        assert!(results.try_recv().is_err());
        assert!(!cycle.is_busy());
    }

    #[tokio::test]
    async fn finished_result_is_stale_once_a_new_refresh_starts() {
        let (mut cycle, mut results) = RefreshCycle::new();
        cycle.start(async { 1 });
        let (ticket, value) = results.recv().await.unwrap();

        cycle.start(std::future::pending::<i32>());
        assert_eq!(cycle.accept(ticket, value), None);
    }

    #[tokio::test]
    async fn dropping_the_cycle_aborts_its_fetch() {
        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let (mut cycle, mut results) = RefreshCycle::new();
        cycle.start(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
        });
        drop(cycle);

        assert!(results.recv().await.is_none());
        assert!(!started.load(Ordering::SeqCst));
    }
}
