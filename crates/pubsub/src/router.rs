//! Name-based dispatch of inbound envelopes.
//!
//! ## Error policy
//!
//! `handle_message` never returns or propagates an error. Invalid envelopes
//! and handler failures become a [`RouterError`]:
//!
//! - with an error handler configured, the error is passed to it (the
//!   handler decides whether to report, alert or panic);
//! - without one, the error is logged at `error` level and dropped.
//!
//! Messages naming an unregistered route are not errors: they are logged at
//! `info` level and dropped in both modes.
//!
//! ## Delivery
//!
//! Messages are acknowledged before processing, so a crashing handler never
//! causes redelivery (at-most-once). Nothing is deduplicated: the same
//! envelope delivered twice is dispatched twice.
//!
//! ## Sharing
//!
//! Routes are registered through `&mut self` during startup; dispatch only
//! needs `&self`, so a router wrapped in an `Arc` is immutable while
//! consumers run.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::broker::Subscription;
use crate::envelope::{Envelope, EnvelopeError};
use crate::message::InboundMessage;

type RouteHandler = Arc<dyn Fn(Value) -> anyhow::Result<()> + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(RouterError) + Send + Sync>;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[from] EnvelopeError),

    #[error("handler for '{name}' failed: {error:#}")]
    Handler { name: String, error: anyhow::Error },
}

#[derive(Clone, Default)]
pub struct MessageRouter {
    routes: HashMap<String, RouteHandler>,
    error_handler: Option<ErrorHandler>,
}

impl fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("MessageRouter")
            .field("routes", &names)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route invalid envelopes and handler failures to `handler` instead of
    /// only logging them.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(RouterError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Register the handler for `name`, replacing any previous one.
    pub fn add_route<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.routes.insert(name.clone(), Arc::new(handler)).is_some() {
            tracing::debug!(route = %name, "message route replaced");
        }
        self
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Acknowledge, validate and dispatch a single message.
    pub fn handle_message<M: InboundMessage + ?Sized>(&self, message: &M) {
        tracing::debug!(bytes = message.data().len(), "received message");

        message.ack();

        let envelope = match Envelope::parse(message.data()) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    data = %String::from_utf8_lossy(message.data()),
                    "message is not valid"
                );
                self.report(e.into());
                return;
            }
        };

        let Some(handler) = self.routes.get(&envelope.name) else {
            tracing::info!(name = %envelope.name, "unknown message name");
            return;
        };

        if let Err(error) = handler(envelope.arg) {
            tracing::error!(name = %envelope.name, error = %format!("{error:#}"), "message handler failed");
            self.report(RouterError::Handler {
                name: envelope.name,
                error,
            });
        }
    }

    /// Dispatch every message currently queued on `subscription`.
    ///
    /// Returns the number of messages handled.
    pub fn drain<M: InboundMessage>(&self, subscription: &Subscription<M>) -> usize {
        let mut handled = 0;
        while let Ok(message) = subscription.try_recv() {
            self.handle_message(&message);
            handled += 1;
        }
        handled
    }

    /// Consume `subscription` until its publisher side disconnects.
    ///
    /// `poll` bounds each wait so the loop stays responsive to disconnects.
    pub fn run<M: InboundMessage>(&self, subscription: &Subscription<M>, poll: Duration) -> usize {
        let mut handled = 0;
        loop {
            match subscription.recv_timeout(poll) {
                Ok(message) => {
                    self.handle_message(&message);
                    handled += 1;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::info!(handled, "subscription closed");
        handled
    }

    fn report(&self, error: RouterError) {
        if let Some(handler) = &self.error_handler {
            handler(error);
        }
    }
}
