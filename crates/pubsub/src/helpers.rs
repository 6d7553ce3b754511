//! Topic-bound publishing for the shared platform workers.
//!
//! Each helper pairs a message template with the topic configured for it in
//! [`Settings`], so call sites never spell out topic names.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use restkit_core::Settings;

use crate::messages::{LogMe, SaveData, SendMail};
use crate::publisher::{PublishError, Publisher, publish_message};

/// Queue an email on the mailer topic.
pub fn send_email<P>(publisher: &P, settings: &Settings, mail: &SendMail) -> Result<(), PublishError>
where
    P: Publisher + ?Sized,
{
    publish_message(publisher, &settings.mailer_topic, mail)
}

/// Append `rows` to `dataset.table` through the logme topic.
pub fn logme<P>(
    publisher: &P,
    settings: &Settings,
    dataset: impl Into<String>,
    table: impl Into<String>,
    rows: Vec<Value>,
) -> Result<(), PublishError>
where
    P: Publisher + ?Sized,
{
    let message = LogMe {
        dataset: dataset.into(),
        table: table.into(),
        rows,
    };
    publish_message(publisher, &settings.logme_topic, &message)
}

pub fn user_events_table(settings: &Settings) -> String {
    format!("userEvents-{}", settings.environment)
}

/// `user#obj_type#seconds.micros`; an anonymous caller is recorded as `None`.
pub fn user_event_key(user_id: Option<&str>, obj_type: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}#{}#{}.{:06}",
        user_id.unwrap_or("None"),
        obj_type,
        at.timestamp(),
        at.timestamp_subsec_micros()
    )
}

/// Store one user event row on the common topic.
pub fn track_user_event<P>(
    publisher: &P,
    settings: &Settings,
    user_id: Option<&str>,
    obj_type: &str,
    data: Map<String, Value>,
) -> Result<(), PublishError>
where
    P: Publisher + ?Sized,
{
    let message = SaveData {
        table: user_events_table(settings),
        key: user_event_key(user_id, obj_type, Utc::now()),
        obj_type: obj_type.to_string(),
        data: Value::Object(data),
    };
    publish_message(publisher, &settings.topic_name, &message)
}

/// Run `operation` and record its inputs and outcome as a user event.
///
/// A successful result is stored under `"return"` as a JSON string. The event
/// is published whether or not the operation fails; a failed publish is
/// logged and never replaces the operation's own result.
pub fn track<P, T, E, F>(
    publisher: &P,
    settings: &Settings,
    user_id: Option<&str>,
    obj_type: &str,
    inputs: Map<String, Value>,
    operation: F,
) -> Result<T, E>
where
    P: Publisher + ?Sized,
    T: Serialize,
    F: FnOnce() -> Result<T, E>,
{
    let result = operation();

    let mut data = inputs;
    if let Ok(value) = &result {
        match serde_json::to_string(value) {
            Ok(encoded) => {
                data.insert("return".into(), Value::String(encoded));
            }
            Err(e) => tracing::warn!(obj_type, error = %e, "could not encode tracked result"),
        }
    }

    // Failure is already logged by `publish_message`.
    let _ = track_user_event(publisher, settings, user_id, obj_type, data);

    result
}
