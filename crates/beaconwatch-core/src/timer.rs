//! Reschedulable expiry timers.
//!
//! The engine only needs one timer per identity key, and a sighting must push
//! that timer back to the full timeout. [`ExpiryTimer`] is the seam; the
//! default backing is a [`DelayQueue`] polled from the engine task, so
//! rescheduling and expiry never run concurrently.

use std::collections::HashMap;
use std::future::{poll_fn, Future};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio_util::time::delay_queue::{self, DelayQueue};

/// Longest delay handed to the [`DelayQueue`], which panics on deadlines
/// past roughly two years.
pub const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A timer that ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expired {
    /// Identity key the timer was scheduled for.
    pub key: String,
    /// Stamp given to the last `schedule` call for the key.
    pub stamp: u64,
}

/// Per-key deadlines that can be pushed back.
pub trait ExpiryTimer: Send {
    /// Fire `after` from now for `key`.
    ///
    /// An existing timer for the key is moved to the new deadline (not
    /// extended by `after`) and takes the new `stamp`.
    fn schedule(&mut self, key: String, stamp: u64, after: Duration);

    /// Drop every timer.
    fn clear(&mut self);

    /// Number of armed timers.
    fn len(&self) -> usize;

    /// Whether no timer is armed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Poll for the next timer to fire.
    ///
    /// `Ready(None)` means no timer is armed.
    fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<Option<Expired>>;
}

/// Wait for the next expiry of `timer`.
pub fn next_expired<T: ExpiryTimer + ?Sized>(
    timer: &mut T,
) -> impl Future<Output = Option<Expired>> + '_ {
    poll_fn(move |cx| timer.poll_expired(cx))
}

/// [`ExpiryTimer`] backed by a tokio-util [`DelayQueue`].
pub struct DelayQueueTimer {
    queue: DelayQueue<String>,
    armed: HashMap<String, (delay_queue::Key, u64)>,
}

impl DelayQueueTimer {
    /// Create a timer set with nothing armed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: DelayQueue::new(),
            armed: HashMap::new(),
        }
    }
}

impl Default for DelayQueueTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DelayQueueTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayQueueTimer")
            .field("armed", &self.armed.len())
            .finish_non_exhaustive()
    }
}

impl ExpiryTimer for DelayQueueTimer {
    fn schedule(&mut self, key: String, stamp: u64, after: Duration) {
        let after = after.min(MAX_DELAY);
        if let Some((queue_key, armed_stamp)) = self.armed.get_mut(&key) {
            self.queue.reset(queue_key, after);
            *armed_stamp = stamp;
        } else {
            let queue_key = self.queue.insert(key.clone(), after);
            self.armed.insert(key, (queue_key, stamp));
        }
    }

    fn clear(&mut self) {
        self.queue.clear();
        self.armed.clear();
    }

    fn len(&self) -> usize {
        self.armed.len()
    }

    fn poll_expired(&mut self, cx: &mut Context<'_>) -> Poll<Option<Expired>> {
        loop {
            let Some(expired) = std::task::ready!(self.queue.poll_expired(cx)) else {
                return Poll::Ready(None);
            };
            let key = expired.into_inner();
            if let Some((_, stamp)) = self.armed.remove(&key) {
                return Poll::Ready(Some(Expired { key, stamp }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{self, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_duration() {
        let mut timer = DelayQueueTimer::new();
        let start = Instant::now();
        timer.schedule("a".into(), 7, Duration::from_secs(15));

        let expired = next_expired(&mut timer).await.unwrap();
        assert_eq!(expired, Expired { key: "a".into(), stamp: 7 });
        assert_eq!(start.elapsed().as_secs(), 15);
        assert!(timer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_moves_deadline_and_stamp() {
        let mut timer = DelayQueueTimer::new();
        let start = Instant::now();
        timer.schedule("a".into(), 1, Duration::from_secs(15));

        time::advance(Duration::from_secs(14)).await;
        timer.schedule("a".into(), 2, Duration::from_secs(15));
        assert_eq!(timer.len(), 1);

        let expired = next_expired(&mut timer).await.unwrap();
        assert_eq!(expired.stamp, 2);
        assert_eq!(start.elapsed().as_secs(), 29);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_in_deadline_order() {
        let mut timer = DelayQueueTimer::new();
        timer.schedule("late".into(), 1, Duration::from_secs(10));
        timer.schedule("early".into(), 2, Duration::from_secs(5));

        assert_eq!(next_expired(&mut timer).await.unwrap().key, "early");
        assert_eq!(next_expired(&mut timer).await.unwrap().key, "late");
        assert!(next_expired(&mut timer).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_every_timer() {
        let mut timer = DelayQueueTimer::new();
        timer.schedule("a".into(), 1, Duration::from_secs(5));
        timer.schedule("b".into(), 2, Duration::from_secs(5));
        assert_eq!(timer.len(), 2);

        timer.clear();
        assert!(timer.is_empty());
        assert!(next_expired(&mut timer).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlong_delay_is_capped() {
        let mut timer = DelayQueueTimer::new();
        let start = Instant::now();
        timer.schedule("a".into(), 1, Duration::from_secs(100_000_000));
        timer.schedule("a".into(), 2, Duration::MAX);
        assert_eq!(timer.len(), 1);

        let expired = next_expired(&mut timer).await.unwrap();
        assert_eq!(expired.stamp, 2);
        assert!(start.elapsed() >= MAX_DELAY);
    }
}
