use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Wire envelope for routed messages: `{"name": "<string>", "arg": <any>}`.
///
/// `arg` is opaque to the router and forwarded verbatim to the handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub name: String,
    pub arg: Value,
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("message data is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("message data is not a JSON object")]
    NotAnObject,

    #[error("missing '{0}' in message data")]
    MissingField(&'static str),

    #[error("'name' must be a string")]
    InvalidName,
}

impl Envelope {
    pub fn new(name: impl Into<String>, arg: Value) -> Self {
        Self {
            name: name.into(),
            arg,
        }
    }

    /// Parse and validate raw message data.
    ///
    /// Both keys are mandatory; `"arg": null` counts as present.
    pub fn parse(data: &[u8]) -> Result<Self, EnvelopeError> {
        let Value::Object(mut body) = serde_json::from_slice::<Value>(data)? else {
            return Err(EnvelopeError::NotAnObject);
        };

        let name = body.remove("name").ok_or(EnvelopeError::MissingField("name"))?;
        let arg = body.remove("arg").ok_or(EnvelopeError::MissingField("arg"))?;
        let Value::String(name) = name else {
            return Err(EnvelopeError::InvalidName);
        };

        Ok(Self { name, arg })
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}
