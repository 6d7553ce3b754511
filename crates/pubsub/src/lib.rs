//! `restkit-pubsub` — `{name, arg}` message envelopes: routing inbound
//! messages to handlers and publishing outbound ones.

pub mod broker;
pub mod envelope;
pub mod helpers;
pub mod message;
pub mod messages;
pub mod publisher;
pub mod router;

pub use broker::{InMemoryBroker, PulledMessage, Subscription};
pub use envelope::{Envelope, EnvelopeError};
pub use helpers::{logme, send_email, track, track_user_event, user_event_key, user_events_table};
pub use message::InboundMessage;
pub use messages::{FileAlert, LogMe, SaveData, SendMail, TextAlert};
pub use publisher::{OutboundMessage, PublishError, Publisher, publish_message};
pub use router::{MessageRouter, RouterError};
