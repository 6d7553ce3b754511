//! Outbound publishing abstraction (mechanics only).
//!
//! A `Publisher` moves encoded bytes to a topic. It makes no assumptions
//! about the transport (Google Pub/Sub, Redis, in-memory channels) and no
//! delivery guarantees beyond what the transport provides.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::envelope::Envelope;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("publisher state is poisoned")]
    Poisoned,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Topic publisher.
///
/// Implementations must be safe to share across request tasks.
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, data: Vec<u8>) -> Result<(), PublishError>;
}

impl<P> Publisher for Arc<P>
where
    P: Publisher + ?Sized,
{
    fn publish(&self, topic: &str, data: Vec<u8>) -> Result<(), PublishError> {
        (**self).publish(topic, data)
    }
}

/// A message template that serializes to a routed envelope.
pub trait OutboundMessage {
    /// Route name the consumer registered for this message.
    fn name(&self) -> &'static str;

    fn arg(&self) -> Value;

    fn envelope(&self) -> Envelope {
        Envelope::new(self.name(), self.arg())
    }

    /// Encoded payload ready for publishing.
    fn encoded(&self) -> Result<Vec<u8>, serde_json::Error> {
        self.envelope().to_vec()
    }
}

/// Encode `message` and publish it to `topic`.
pub fn publish_message<P, M>(publisher: &P, topic: &str, message: &M) -> Result<(), PublishError>
where
    P: Publisher + ?Sized,
    M: OutboundMessage + ?Sized,
{
    let data = message.encoded()?;
    publisher.publish(topic, data).inspect_err(|e| {
        tracing::error!(topic, message = message.name(), error = %e, "a problem occurred when publishing");
    })
}
