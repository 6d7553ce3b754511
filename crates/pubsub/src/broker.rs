//! In-memory topic broker for tests/dev.
//!
//! - No IO / no async
//! - Fan-out to every live subscriber of a topic
//! - Dead subscribers are dropped on the next publish

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::message::InboundMessage;
use crate::publisher::{PublishError, Publisher};

/// A message delivered by the [`InMemoryBroker`].
///
/// Clones share the acknowledgement counter, so a test can keep a clone and
/// observe acks performed by the router.
#[derive(Debug, Clone)]
pub struct PulledMessage {
    message_id: Uuid,
    data: Arc<[u8]>,
    acks: Arc<AtomicUsize>,
}

impl PulledMessage {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        Self {
            message_id: Uuid::now_v7(),
            data: Arc::from(data),
            acks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn ack_count(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }

    pub fn is_acked(&self) -> bool {
        self.ack_count() > 0
    }
}

impl InboundMessage for PulledMessage {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn ack(&self) {
        self.acks.fetch_add(1, Ordering::SeqCst);
    }
}

/// A subscription to one topic.
///
/// Subscriptions are designed for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBroker {
    topics: Mutex<HashMap<String, Vec<Sender<PulledMessage>>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, topic: &str) -> Subscription<PulledMessage> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned we still hand out a subscription; it just
        // never receives anything.
        if let Ok(mut topics) = self.topics.lock() {
            topics.entry(topic.to_string()).or_default().push(tx);
        }

        Subscription::new(rx)
    }
}

impl Publisher for InMemoryBroker {
    fn publish(&self, topic: &str, data: Vec<u8>) -> Result<(), PublishError> {
        let mut topics = self.topics.lock().map_err(|_| PublishError::Poisoned)?;

        if let Some(subscribers) = topics.get_mut(topic) {
            let message = PulledMessage::new(data);
            subscribers.retain(|tx| tx.send(message.clone()).is_ok());
        }

        Ok(())
    }
}
