//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::events::{EventChannel, EventFilter, OperationalEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Trait for publishing events to the bus.
///
/// Publishing never blocks and never fails: with no subscribers the event
/// is dropped.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    async fn publish(&self, event: OperationalEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer semantics.
/// Each gateway owns its own instance, so several can coexist in one process.
pub struct InMemoryEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<OperationalEvent>,

    /// Total events published.
    events_published: AtomicU64,

    /// Total events dropped for lack of subscribers.
    events_dropped: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    ///
    /// Returns a `Subscription` handle that can be used to receive events.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(channels = ?filter.channels, kinds = ?filter.kinds, "New subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Get a stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.sender.subscribe(), filter)
    }

    /// Invoke `handler` for every event published on `channel`.
    ///
    /// The subscription is registered before this returns, so every event
    /// published afterwards reaches the handler. The handler runs on a
    /// spawned task until the bus is dropped; abort the returned handle to
    /// unsubscribe. Must be called from within a Tokio runtime.
    pub fn on<F>(&self, channel: EventChannel, handler: F) -> JoinHandle<()>
    where
        F: Fn(OperationalEvent) + Send + Sync + 'static,
    {
        let mut subscription = self.subscribe(EventFilter::channel(channel));
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                handler(event);
            }
            debug!(channel = %channel, "Channel handler finished (bus closed)");
        })
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of events dropped because nobody was listening.
    #[must_use]
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: OperationalEvent) -> usize {
        let channel = event.channel;
        let kind = event.kind;

        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    channel = %channel,
                    kind = ?kind,
                    receivers = receiver_count,
                    "Event published"
                );
                receiver_count
            }
            Err(_) => {
                self.events_dropped.fetch_add(1, Ordering::Relaxed);
                trace!(channel = %channel, kind = ?kind, "Event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
