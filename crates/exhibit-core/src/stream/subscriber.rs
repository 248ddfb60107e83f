//! Stream subscribers

use super::IndexStream;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

/// Trait for components that need to respond to a new terminal stream
pub trait StreamSubscriber: Send + Sync {
    /// Called after a recompute (or filter deletion) replaces the stream
    fn on_stream_change(&self, stream: &Arc<IndexStream>);
}

/// Weakly-held subscriber set; dropped subscribers are pruned on notify
#[derive(Default)]
pub struct SubscriberList {
    subscribers: RwLock<Vec<Weak<dyn StreamSubscriber>>>,
}

impl SubscriberList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber
    pub fn add(&self, subscriber: &Arc<dyn StreamSubscriber>) {
        self.subscribers.write().push(Arc::downgrade(subscriber));
    }

    /// Number of live subscribers
    pub fn live_count(&self) -> usize {
        self.subscribers
            .read()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Notify all subscribers of a stream change
    pub fn notify(&self, stream: &Arc<IndexStream>) {
        let mut subscribers = self.subscribers.write();

        // Remove any dead weak references
        subscribers.retain(|weak| weak.strong_count() > 0);

        for weak in subscribers.iter() {
            if let Some(subscriber) = weak.upgrade() {
                subscriber.on_stream_change(stream);
            }
        }
    }
}
