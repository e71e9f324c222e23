//! In-process event bus for cross-view invalidation.
//!
//! One bus exists per entity family. Views that show the same family patch
//! their projections from these events instead of re-fetching.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::models::{Payload, Record, RecordId};

/// Default per-subscriber backlog before the slowest subscriber lags.
pub const DEFAULT_CAPACITY: usize = 256;

/// Change notification for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<P> {
    Created(Record<P>),
    Updated(Record<P>),
    Deleted(RecordId),
    Favorited(RecordId, bool),
}

impl<P> Event<P> {
    /// Local id of the record the event is about.
    pub const fn record_id(&self) -> RecordId {
        match self {
            Self::Created(record) | Self::Updated(record) => record.id,
            Self::Deleted(id) | Self::Favorited(id, _) => *id,
        }
    }
}

/// Publish/subscribe channel for family `P`.
#[derive(Debug)]
pub struct EventBus<P> {
    sender: broadcast::Sender<Event<P>>,
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<P: Payload> Default for EventBus<P> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<P: Payload> EventBus<P> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Fan out to live subscribers; returns how many received the event.
    ///
    /// Never blocks. With no subscribers the event is dropped.
    pub fn publish(&self, event: Event<P>) -> usize {
        tracing::trace!(family = P::FAMILY, id = %event.record_id(), "Publishing event");
        self.sender.send(event).unwrap_or(0)
    }

    /// Receive events published from now on.
    pub fn subscribe(&self) -> EventSubscription<P> {
        EventSubscription {
            rx: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A live subscription; dropping it unsubscribes.
#[derive(Debug)]
pub struct EventSubscription<P> {
    rx: broadcast::Receiver<Event<P>>,
}

impl<P: Payload> EventSubscription<P> {
    /// Next event in publish order, or `None` once every bus handle is gone.
    ///
    /// Events lost to lag are skipped.
    pub async fn next(&mut self) -> Option<Event<P>> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(family = P::FAMILY, skipped, "Event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Pending event without waiting.
    pub fn try_next(&mut self) -> Option<Event<P>> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(family = P::FAMILY, skipped, "Event subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Fresh subscription on the same bus starting from now.
    #[must_use]
    pub fn resubscribe(&self) -> Self {
        Self {
            rx: self.rx.resubscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Note;
    use pretty_assertions::assert_eq;

    fn record(id: i64) -> Record<Note> {
        Record {
            id: RecordId::new(id),
            remote_id: None,
            payload: Note::new(format!("n{id}"), ""),
            created_at: id,
            favorite: false,
        }
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::<Note>::default();
        assert_eq!(bus.publish(Event::Deleted(RecordId::new(1))), 0);
    }

    #[tokio::test]
    async fn subscribers_only_see_later_events() {
        let bus = EventBus::<Note>::default();
        bus.publish(Event::Deleted(RecordId::new(1)));

        let mut sub = bus.subscribe();
        bus.publish(Event::Favorited(RecordId::new(2), true));
        assert_eq!(sub.next().await, Some(Event::Favorited(RecordId::new(2), true)));
        assert_eq!(sub.try_next(), None);
    }

    #[tokio::test]
    async fn every_subscriber_sees_publish_order() {
        let bus = EventBus::<Note>::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.publish(Event::Created(record(1))), 2);
        bus.publish(Event::Deleted(RecordId::new(1)));

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.next().await, Some(Event::Created(record(1))));
            assert_eq!(sub.next().await, Some(Event::Deleted(RecordId::new(1))));
        }
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let bus = EventBus::<Note>::default();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn lagged_subscriber_skips_to_retained_events() {
        let bus = EventBus::<Note>::new(2);
        let mut sub = bus.subscribe();
        for id in 1..=5 {
            bus.publish(Event::Deleted(RecordId::new(id)));
        }
        assert_eq!(sub.next().await, Some(Event::Deleted(RecordId::new(4))));
        assert_eq!(sub.next().await, Some(Event::Deleted(RecordId::new(5))));
    }

    #[tokio::test]
    async fn closed_bus_ends_subscription() {
        let bus = EventBus::<Note>::default();
        let mut sub = bus.subscribe();
        drop(bus);
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn resubscribe_starts_from_now() {
        let bus = EventBus::<Note>::default();
        let mut first = bus.subscribe();
        bus.publish(Event::Deleted(RecordId::new(1)));
        let mut second = first.resubscribe();
        bus.publish(Event::Deleted(RecordId::new(2)));

        assert_eq!(second.next().await, Some(Event::Deleted(RecordId::new(2))));
        assert_eq!(first.next().await, Some(Event::Deleted(RecordId::new(1))));
    }
}
