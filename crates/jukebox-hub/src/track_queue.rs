//! Per-session FIFO of pending tracks.
//!
//! Producers never wait. The single consumer (the controller's advance step) may
//! wait for a bounded time so that an enqueue racing with a track-end
//! notification is still picked up instead of dropping the session to idle.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use jukebox_types::QueueItem;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Unbounded FIFO with a bounded-wait pop.
///
/// The item list sits behind a short-lived std mutex (never held across an
/// `.await`); arrivals are signalled through a [`Notify`].
#[derive(Default)]
pub struct TrackQueue {
    items: Mutex<VecDeque<QueueItem>>,
    available: Notify,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail. Producers append through `push_many`.
    #[cfg(test)]
    pub fn push(&self, item: QueueItem) {
        self.items
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push_back(item);
        self.available.notify_one();
    }

    /// Append a batch in order. Returns how many items were added.
    pub fn push_many(&self, items: impl IntoIterator<Item = QueueItem>) -> usize {
        let added = {
            let mut queue = self.items.lock().unwrap_or_else(|err| err.into_inner());
            let before = queue.len();
            queue.extend(items);
            queue.len() - before
        };
        if added > 0 {
            self.available.notify_one();
        }
        added
    }

    /// Remove the head without waiting.
    pub fn try_pop(&self) -> Option<QueueItem> {
        self.items
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .pop_front()
    }

    /// Remove the head, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` once the timeout elapses with the queue still empty.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<QueueItem> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so a push between the check and the
            // wait still wakes us.
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_pop();
            }
        }
    }

    /// Ordered copy of the pending items.
    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.items
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Discard every pending item. Returns how many were dropped.
    pub fn drain(&self) -> usize {
        let mut queue = self.items.lock().unwrap_or_else(|err| err.into_inner());
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|err| err.into_inner()).len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::player_backend::testing::item;

    #[test]
    fn push_preserves_insertion_order() {
        let queue = TrackQueue::new();
        queue.push(item("a"));
        queue.push_many(vec![item("b"), item("c")]);

        let locators: Vec<_> = queue.snapshot().into_iter().map(|i| i.locator).collect();
        assert_eq!(locators, vec!["enc:a", "enc:b", "enc:c"]);
        assert_eq!(queue.try_pop().unwrap().locator, "enc:a");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn snapshot_does_not_consume() {
        let queue = TrackQueue::new();
        queue.push_many(vec![item("a"), item("b")]);

        let first = queue.snapshot();
        let second = queue.snapshot();

        assert_eq!(first, second);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn drain_empties_and_reports_count() {
        let queue = TrackQueue::new();
        queue.push_many(vec![item("a"), item("b"), item("c")]);

        assert_eq!(queue.drain(), 3);
        assert!(queue.is_empty());
        assert_eq!(queue.drain(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pop_timeout_returns_head_immediately_when_available() {
        let queue = TrackQueue::new();
        queue.push(item("a"));
        let started = Instant::now();

        let popped = queue.pop_timeout(Duration::from_secs(1)).await;

        assert_eq!(popped.unwrap().locator, "enc:a");
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn pop_timeout_gives_up_after_deadline() {
        let queue = TrackQueue::new();
        let started = Instant::now();

        let popped = queue.pop_timeout(Duration::from_millis(1000)).await;

        assert!(popped.is_none());
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn pop_timeout_picks_up_late_push() {
        let queue = Arc::new(TrackQueue::new());
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            producer.push(item("late"));
        });

        let popped = queue.pop_timeout(Duration::from_secs(1)).await;

        assert_eq!(popped.unwrap().locator, "enc:late");
    }

    #[tokio::test(start_paused = true)]
    async fn stale_wakeup_does_not_end_wait_early() {
        let queue = TrackQueue::new();
        // Leaves a stored permit behind with nothing in the queue.
        queue.push(item("a"));
        queue.try_pop();
        let started = Instant::now();

        let popped = queue.pop_timeout(Duration::from_millis(500)).await;

        assert!(popped.is_none());
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
