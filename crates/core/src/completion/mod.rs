//! "A download finished" notifications.
//!
//! The broadcast is an explicit, cloneable object handed to whoever publishes
//! and whoever listens. Events carry no ticket: subscribers re-query the
//! download service to find out what, if anything, changed.

use tokio::sync::broadcast;
use tracing::debug;

/// Default number of undelivered events kept per subscriber.
pub const DEFAULT_COMPLETION_BUFFER: usize = 16;

/// Notification that some download finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompletionEvent;

/// Fire-and-forget fan-out of completion events.
#[derive(Debug, Clone)]
pub struct CompletionBroadcast {
    tx: broadcast::Sender<CompletionEvent>,
}

impl Default for CompletionBroadcast {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETION_BUFFER)
    }
}

impl CompletionBroadcast {
    /// Create a broadcast buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self) {
        match self.tx.send(CompletionEvent) {
            Ok(receivers) => debug!("Completion event delivered to {} subscriber(s)", receivers),
            Err(_) => debug!("Completion event published with no subscribers"),
        }
    }

    pub fn subscribe(&self) -> CompletionSubscription {
        CompletionSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct CompletionSubscription {
    rx: broadcast::Receiver<CompletionEvent>,
}

impl CompletionSubscription {
    /// Wait for the next event; `None` once the broadcast is gone.
    pub async fn recv(&mut self) -> Option<CompletionEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            // Missed events all mean the same thing.
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Completion subscriber lagged by {} event(s)", skipped);
                Some(CompletionEvent)
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Consume events already queued, returning how many were dropped.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => drained += 1,
                Err(_) => break,
            }
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let broadcast = CompletionBroadcast::default();
        broadcast.publish();
        assert_eq!(broadcast.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let broadcast = CompletionBroadcast::new(4);
        let mut subscription = broadcast.subscribe();
        broadcast.publish();

        let event = tokio::time::timeout(Duration::from_secs(1), subscription.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(CompletionEvent));
    }

    #[test]
    fn test_recv_waits_for_publish() {
        let broadcast = CompletionBroadcast::new(4);
        let mut subscription = broadcast.subscribe();
        let mut recv = tokio_test::task::spawn(subscription.recv());

        tokio_test::assert_pending!(recv.poll());
        broadcast.publish();
        assert!(recv.is_woken());
        tokio_test::assert_ready_eq!(recv.poll(), Some(CompletionEvent));
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let broadcast = CompletionBroadcast::new(4);
        let subscription = broadcast.subscribe();
        assert_eq!(broadcast.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(broadcast.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_drain_coalesces_burst() {
        let broadcast = CompletionBroadcast::new(8);
        let mut subscription = broadcast.subscribe();
        broadcast.publish();
        broadcast.publish();
        broadcast.publish();

        assert!(subscription.recv().await.is_some());
        assert_eq!(subscription.drain(), 2);
        assert_eq!(subscription.drain(), 0);
    }

    #[tokio::test]
    async fn test_lagged_is_reported_as_event() {
        let broadcast = CompletionBroadcast::new(1);
        let mut subscription = broadcast.subscribe();
        broadcast.publish();
        broadcast.publish();
        broadcast.publish();

        assert_eq!(subscription.recv().await, Some(CompletionEvent));
    }

    #[tokio::test]
    async fn test_closed_broadcast_ends_subscription() {
        let broadcast = CompletionBroadcast::new(1);
        let mut subscription = broadcast.subscribe();
        drop(broadcast);
        assert_eq!(subscription.recv().await, None);
    }
}
