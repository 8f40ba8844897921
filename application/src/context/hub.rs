//! Per-context publish/subscribe hub for streaming chunks.
//!
//! Every subscriber gets its own tokio mpsc channel. Publishing never
//! awaits: unbounded channels always accept, bounded channels use
//! `try_send` and drop the chunk when the subscriber is full.
//!
//! ```text
//! emit_chunk(child) ──▶ child hub ──▶ child subscribers
//!        │
//!        └──▶ parent hub ──▶ parent subscribers ──▶ ... root
//! ```
//!
//! Propagation up the tree is driven by the execution context; the hub
//! only knows its own subscribers.

use crate::config::StreamBufferPolicy;
use agentctx_domain::{ChunkFilter, StreamChunk};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

enum ChunkSender {
    Unbounded(mpsc::UnboundedSender<StreamChunk>),
    Bounded(mpsc::Sender<StreamChunk>),
}

enum ChunkReceiver {
    Unbounded(mpsc::UnboundedReceiver<StreamChunk>),
    Bounded(mpsc::Receiver<StreamChunk>),
}

struct Subscriber {
    id: u64,
    filter: ChunkFilter,
    sender: ChunkSender,
}

enum Delivery {
    Sent,
    Dropped,
    Gone,
}

impl Subscriber {
    fn deliver(&self, chunk: &StreamChunk) -> Delivery {
        match &self.sender {
            ChunkSender::Unbounded(tx) => match tx.send(chunk.clone()) {
                Ok(()) => Delivery::Sent,
                Err(_) => Delivery::Gone,
            },
            ChunkSender::Bounded(tx) => match tx.try_send(chunk.clone()) {
                Ok(()) => Delivery::Sent,
                Err(TrySendError::Full(_)) => Delivery::Dropped,
                Err(TrySendError::Closed(_)) => Delivery::Gone,
            },
        }
    }
}

struct HubShared {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    policy: StreamBufferPolicy,
}

impl HubShared {
    fn remove(&self, id: u64) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|s| s.id != id);
    }
}

/// Result of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// Streaming hub owned by one execution context.
pub struct StreamHub {
    shared: Arc<HubShared>,
}

impl StreamHub {
    pub fn new(policy: StreamBufferPolicy) -> Self {
        Self {
            shared: Arc::new(HubShared {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                policy,
            }),
        }
    }

    /// Register a subscriber for chunks matching `filter`.
    ///
    /// Subscribing to a closed hub yields a subscription that is already
    /// at end of stream.
    pub fn subscribe(&self, filter: ChunkFilter) -> Subscription {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = match self.shared.policy {
            StreamBufferPolicy::Unbounded => {
                let (tx, rx) = mpsc::unbounded_channel();
                (ChunkSender::Unbounded(tx), ChunkReceiver::Unbounded(rx))
            }
            StreamBufferPolicy::Bounded { capacity } => {
                let (tx, rx) = mpsc::channel(capacity.max(1));
                (ChunkSender::Bounded(tx), ChunkReceiver::Bounded(rx))
            }
        };

        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.shared.closed.load(Ordering::Acquire) {
            subscribers.push(Subscriber { id, filter, sender });
        }

        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(&self.shared),
        }
    }

    /// Deliver `chunk` to every matching subscriber without waiting.
    pub fn publish(&self, chunk: &StreamChunk) -> PublishReport {
        let mut report = PublishReport::default();
        if self.shared.closed.load(Ordering::Acquire) {
            return report;
        }

        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|subscriber| {
            if !subscriber.filter.matches(chunk) {
                return true;
            }
            match subscriber.deliver(chunk) {
                Delivery::Sent => {
                    report.delivered += 1;
                    true
                }
                Delivery::Dropped => {
                    report.dropped += 1;
                    true
                }
                Delivery::Gone => false,
            }
        });
        report
    }

    /// Close every channel. Receivers drain what is buffered, then end.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for StreamHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHub")
            .field("subscribers", &self.subscriber_count())
            .field("closed", &self.is_closed())
            .field("policy", &self.shared.policy)
            .finish()
    }
}

/// Receiving end of a hub subscription.
///
/// The channel ends after [`unsubscribe`](Self::unsubscribe), when the
/// owning context's streams are closed, or when the hub is dropped.
/// Dropping the subscription unsubscribes.
pub struct Subscription {
    id: u64,
    receiver: ChunkReceiver,
    hub: Weak<HubShared>,
}

impl Subscription {
    /// Next chunk, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<StreamChunk> {
        match &mut self.receiver {
            ChunkReceiver::Unbounded(rx) => rx.recv().await,
            ChunkReceiver::Bounded(rx) => rx.recv().await,
        }
    }

    /// Next buffered chunk without waiting.
    pub fn try_recv(&mut self) -> Option<StreamChunk> {
        let result = match &mut self.receiver {
            ChunkReceiver::Unbounded(rx) => rx.try_recv(),
            ChunkReceiver::Bounded(rx) => rx.try_recv(),
        };
        match result {
            Ok(chunk) => Some(chunk),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drain every chunk currently buffered.
    pub fn drain(&mut self) -> Vec<StreamChunk> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Stop receiving. Chunks already buffered can still be read.
    pub fn unsubscribe(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
