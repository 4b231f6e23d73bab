//! Request tracking and response correlation
//!
//! The [`RequestTracker`] owns everything about in-flight requests: it
//! allocates the monotonically-increasing request ids, holds the one-shot
//! waiter for each pending request, arms a per-request timeout timer, and
//! removes entries exactly once on the first of complete / fail / cancel /
//! timeout / bulk-fail.
//!
//! The pending map is a plain `HashMap` behind a synchronous mutex: lookups
//! come from the connection task, removals also come from timer tasks, and
//! cancellation must run synchronously from a drop guard, so no lock is
//! ever held across an await point.
//!
//! Waiters are [`tokio::sync::oneshot`] senders; sending consumes the
//! sender, so a second delivery for the same id is unrepresentable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::error::RpcError;

/// The outcome delivered to a waiter: the server's `result` value or a
/// wire-level error (server error, timeout, cancellation, or closure).
pub type RpcOutcome = std::result::Result<serde_json::Value, RpcError>;

/// The single-fire reply channel for one pending request.
pub type Waiter = oneshot::Sender<RpcOutcome>;

/// One tracked in-flight request.
#[derive(Debug)]
struct PendingRequest {
    /// The method name, for timeout errors and diagnostics.
    method: String,
    /// The reply channel; consumed by exactly one delivery.
    waiter: Waiter,
    /// The armed timeout timer; aborted when the entry is removed early.
    /// `None` only in the window between insertion and timer attachment.
    timer: Option<tokio::task::JoinHandle<()>>,
    /// When the request was tracked.
    started: Instant,
}

impl PendingRequest {
    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Lifetime counters for tracker observability.
#[derive(Debug, Default)]
pub struct TrackerStats {
    tracked: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    timed_out: AtomicU64,
}

/// A point-in-time copy of [`TrackerStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Requests ever tracked.
    pub tracked: u64,
    /// Requests that received a success response.
    pub completed: u64,
    /// Requests failed by an error response or bulk failure.
    pub failed: u64,
    /// Requests cancelled by their caller.
    pub cancelled: u64,
    /// Requests whose timeout timer fired.
    pub timed_out: u64,
}

impl TrackerStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tracked: self.tracked.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }
}

/// Allocates request ids and correlates responses to waiters.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use mcpkit::tracker::RequestTracker;
/// use tokio::sync::oneshot;
///
/// # #[tokio::main]
/// # async fn main() {
/// let tracker = RequestTracker::new();
/// let id = tracker.next_id();
/// let (tx, rx) = oneshot::channel();
/// tracker.track(id, "ping", tx, Duration::from_secs(30));
///
/// // The connection task later matches a response by id:
/// let (waiter, _method) = tracker.complete(id).unwrap();
/// let _ = waiter.send(Ok(serde_json::json!({})));
/// assert!(rx.await.is_ok());
/// # }
/// ```
#[derive(Debug)]
pub struct RequestTracker {
    /// Monotonically increasing id counter, starting at 1.
    next_id: AtomicU64,
    /// In-flight requests keyed by id.
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    /// Lifetime counters.
    stats: Arc<TrackerStats>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTracker {
    /// Create an empty tracker. Ids start at 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
            stats: Arc::new(TrackerStats::default()),
        }
    }

    /// Allocate the next request id.
    ///
    /// Ids form a strictly increasing sequence and are never reused within
    /// the tracker's lifetime.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Record a pending request and arm its timeout timer.
    ///
    /// When the timer fires before the entry is removed, the tracker itself
    /// delivers a `-32001` request-timeout error to the waiter, since no
    /// external caller is involved at that point.
    ///
    /// # Arguments
    ///
    /// * `id` - The id allocated by [`RequestTracker::next_id`].
    /// * `method` - The method name, used in the timeout error.
    /// * `waiter` - The reply channel to deliver the outcome on.
    /// * `timeout` - The per-request deadline.
    pub fn track(&self, id: u64, method: &str, waiter: Waiter, timeout: Duration) {
        // Insert before arming the timer so even a zero-length timeout can
        // only ever fire against an existing entry.
        let entry = PendingRequest {
            method: method.to_string(),
            waiter,
            timer: None,
            started: Instant::now(),
        };
        self.stats.tracked.fetch_add(1, Ordering::Relaxed);
        let previous = lock_pending(&self.pending).insert(id, entry);
        debug_assert!(previous.is_none(), "request id {id} reused");

        let pending = Arc::clone(&self.pending);
        let stats = Arc::clone(&self.stats);
        let timer_method = method.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let entry = lock_pending(&pending).remove(&id);
            if let Some(entry) = entry {
                stats.timed_out.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    id,
                    method = %timer_method,
                    elapsed_ms = entry.started.elapsed().as_millis() as u64,
                    "request timed out"
                );
                // The waiter may already be gone if the caller was dropped.
                let _ = entry
                    .waiter
                    .send(Err(RpcError::request_timeout(&timer_method)));
            }
        });

        // Attach the timer handle unless the entry was already resolved; a
        // fired-and-missed timer is harmless, an unaborted one just sleeps.
        match lock_pending(&self.pending).get_mut(&id) {
            Some(entry) => entry.timer = Some(timer),
            None => timer.abort(),
        }
    }

    /// Remove a pending entry for a success response.
    ///
    /// Returns the waiter and method for the caller to deliver the result,
    /// or `None` when the id is unknown (already completed, timed out, or
    /// never tracked).
    pub fn complete(&self, id: u64) -> Option<(Waiter, String)> {
        let mut entry = lock_pending(&self.pending).remove(&id)?;
        entry.abort_timer();
        self.stats.completed.fetch_add(1, Ordering::Relaxed);
        Some((entry.waiter, entry.method))
    }

    /// Remove a pending entry for an error response or transport failure.
    ///
    /// Returns the waiter and method for the caller to deliver the error,
    /// or `None` when the id is unknown.
    pub fn fail(&self, id: u64) -> Option<(Waiter, String)> {
        let mut entry = lock_pending(&self.pending).remove(&id)?;
        entry.abort_timer();
        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        Some((entry.waiter, entry.method))
    }

    /// Drop a pending entry on caller cancellation.
    ///
    /// The waiter is dropped without a delivery; the cancelling caller has
    /// already stopped listening. Returns whether an entry existed.
    pub fn cancel(&self, id: u64) -> bool {
        let entry = lock_pending(&self.pending).remove(&id);
        match entry {
            Some(mut entry) => {
                entry.abort_timer();
                self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Atomically remove every pending entry.
    ///
    /// Returns all waiters with their methods; the caller (the connection)
    /// is responsible for delivering the error to each.
    pub fn fail_all(&self) -> Vec<(Waiter, String)> {
        let drained: Vec<PendingRequest> = {
            let mut pending = lock_pending(&self.pending);
            pending.drain().map(|(_, entry)| entry).collect()
        };
        self.stats
            .failed
            .fetch_add(drained.len() as u64, Ordering::Relaxed);
        drained
            .into_iter()
            .map(|mut entry| {
                entry.abort_timer();
                (entry.waiter, entry.method)
            })
            .collect()
    }

    /// Number of requests currently in flight.
    pub fn pending_count(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    /// A point-in-time copy of the lifetime counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

/// Lock the pending map, recovering from poisoning.
///
/// A panic while the lock is held can only come from a bug in this module;
/// the map itself stays structurally valid, so continuing is safe.
fn lock_pending(
    pending: &Mutex<HashMap<u64, PendingRequest>>,
) -> MutexGuard<'_, HashMap<u64, PendingRequest>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_strictly_increasing_from_one() {
        let tracker = RequestTracker::new();
        let ids: Vec<u64> = (0..5).map(|_| tracker.next_id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_complete_delivers_exactly_once() {
        let tracker = RequestTracker::new();
        let id = tracker.next_id();
        let (tx, rx) = oneshot::channel();
        tracker.track(id, "tools/list", tx, Duration::from_secs(10));

        let (waiter, method) = tracker.complete(id).expect("entry present");
        assert_eq!(method, "tools/list");
        waiter.send(Ok(json!({"tools": []}))).unwrap();

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.unwrap()["tools"], json!([]));

        // Second removal for the same id finds nothing.
        assert!(tracker.complete(id).is_none());
        assert!(tracker.fail(id).is_none());
        assert!(!tracker.cancel(id));
    }

    #[tokio::test]
    async fn test_timeout_delivers_minus_32001_and_counts() {
        let tracker = RequestTracker::new();
        let id = tracker.next_id();
        let (tx, rx) = oneshot::channel();
        tracker.track(id, "slow/method", tx, Duration::from_millis(50));

        let outcome = tokio::time::timeout(Duration::from_millis(500), rx)
            .await
            .expect("waiter fired within the window")
            .expect("sender not dropped");

        let err = outcome.unwrap_err();
        assert_eq!(err.code, -32001);
        assert!(err.message.contains("slow/method"));
        assert_eq!(tracker.stats().timed_out, 1);
        assert_eq!(tracker.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_complete_aborts_timer_no_late_delivery() {
        let tracker = RequestTracker::new();
        let id = tracker.next_id();
        let (tx, mut rx) = oneshot::channel();
        tracker.track(id, "fast", tx, Duration::from_millis(30));

        let (waiter, _) = tracker.complete(id).unwrap();
        waiter.send(Ok(json!(1))).unwrap();
        assert_eq!(rx.try_recv().unwrap().unwrap(), json!(1));

        // Wait past the original deadline: the aborted timer must not have
        // touched the counters.
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(tracker.stats().timed_out, 0);
        assert_eq!(tracker.stats().completed, 1);
    }

    #[tokio::test]
    async fn test_cancel_prevents_later_completion() {
        let tracker = RequestTracker::new();
        let id = tracker.next_id();
        let (tx, mut rx) = oneshot::channel();
        tracker.track(id, "m", tx, Duration::from_secs(10));

        assert!(tracker.cancel(id));
        assert_eq!(tracker.stats().cancelled, 1);

        // A late server reply for the cancelled id correlates to nothing.
        assert!(tracker.complete(id).is_none());

        // The waiter was dropped without delivery.
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_fail_all_drains_every_entry() {
        let tracker = RequestTracker::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let id = tracker.next_id();
            let (tx, rx) = oneshot::channel();
            tracker.track(id, "m", tx, Duration::from_secs(10));
            receivers.push(rx);
        }
        assert_eq!(tracker.pending_count(), 3);

        let waiters = tracker.fail_all();
        assert_eq!(waiters.len(), 3);
        assert_eq!(tracker.pending_count(), 0);
        assert_eq!(tracker.stats().failed, 3);

        for (waiter, method) in waiters {
            let _ = waiter.send(Err(RpcError::connection_closed(format!(
                "transport gone during {method}"
            ))));
        }
        for rx in receivers {
            let err = rx.await.unwrap().unwrap_err();
            assert_eq!(err.code, -32000);
        }
    }

    #[tokio::test]
    async fn test_dead_waiter_is_not_a_leak() {
        let tracker = RequestTracker::new();
        let id = tracker.next_id();
        let (tx, rx) = oneshot::channel();
        tracker.track(id, "m", tx, Duration::from_millis(30));

        // Caller went away without cancelling.
        drop(rx);

        // The timeout still cleans the entry; the lost wake is harmless.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(tracker.pending_count(), 0);
        assert_eq!(tracker.stats().timed_out, 1);
    }

    #[tokio::test]
    async fn test_stats_counters_independent() {
        let tracker = RequestTracker::new();

        let id1 = tracker.next_id();
        let (tx, _rx) = oneshot::channel();
        tracker.track(id1, "a", tx, Duration::from_secs(10));
        let _ = tracker.complete(id1);

        let id2 = tracker.next_id();
        let (tx, _rx) = oneshot::channel();
        tracker.track(id2, "b", tx, Duration::from_secs(10));
        let _ = tracker.fail(id2);

        let id3 = tracker.next_id();
        let (tx, _rx) = oneshot::channel();
        tracker.track(id3, "c", tx, Duration::from_secs(10));
        tracker.cancel(id3);

        let stats = tracker.stats();
        assert_eq!(stats.tracked, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.timed_out, 0);
    }

    #[tokio::test]
    async fn test_pending_count_reflects_in_flight() {
        let tracker = RequestTracker::new();
        assert_eq!(tracker.pending_count(), 0);

        let id = tracker.next_id();
        let (tx, _rx) = oneshot::channel();
        tracker.track(id, "m", tx, Duration::from_secs(10));
        assert_eq!(tracker.pending_count(), 1);

        let _ = tracker.complete(id);
        assert_eq!(tracker.pending_count(), 0);
    }
}
