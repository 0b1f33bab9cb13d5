//! Queue publishing interface
//!
//! Queues are addressed by name and resolved to a URL before sending, the
//! way hosted FIFO queues work. Messages in the same group are delivered in
//! order; the relay uses the stream id as the group.

use crate::error::{RelayError, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use uuid::Uuid;

/// One message bound for a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Unique message id
    pub id: Uuid,
    /// Resolved queue URL
    pub queue_url: String,
    /// Ordering group
    pub group_id: String,
    /// Message body
    pub body: String,
}

/// Something that delivers messages to named queues
pub trait QueuePublisher: Send + Sync {
    /// URL of the queue called `name`
    fn resolve_queue(&self, name: &str) -> Result<String>;

    /// Deliver one message
    fn send(&self, message: OutboundMessage) -> Result<()>;
}

/// In-process queues
///
/// Queues must be declared before use; sending to an undeclared queue fails
/// the same way resolving one does.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    queues: RwLock<FxHashMap<String, Vec<OutboundMessage>>>,
}

impl MemoryQueue {
    /// Create with no queues
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with the named queues declared
    pub fn with_queues<I, Q>(names: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: AsRef<str>,
    {
        let queue = Self::new();
        for name in names {
            queue.declare(name.as_ref());
        }
        queue
    }

    /// Declare a queue; declaring twice is a no-op
    pub fn declare(&self, name: &str) {
        self.queues.write().entry(Self::url(name)).or_default();
    }

    /// Messages delivered to a queue, oldest first
    pub fn messages(&self, name: &str) -> Vec<OutboundMessage> {
        self.queues
            .read()
            .get(&Self::url(name))
            .cloned()
            .unwrap_or_default()
    }

    fn url(name: &str) -> String {
        format!("memory://queues/{}", name)
    }
}

impl QueuePublisher for MemoryQueue {
    fn resolve_queue(&self, name: &str) -> Result<String> {
        let url = Self::url(name);
        if self.queues.read().contains_key(&url) {
            Ok(url)
        } else {
            Err(RelayError::QueueNotFound(name.to_string()))
        }
    }

    fn send(&self, message: OutboundMessage) -> Result<()> {
        match self.queues.write().get_mut(&message.queue_url) {
            Some(queue) => {
                queue.push(message);
                Ok(())
            }
            None => Err(RelayError::Publish {
                queue: message.queue_url,
                reason: "no such queue".to_string(),
            }),
        }
    }
}
