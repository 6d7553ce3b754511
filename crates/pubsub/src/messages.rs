//! Message templates consumed by the shared platform workers.

use serde_json::{Map, Value, json};

use restkit_core::Settings;

use crate::publisher::OutboundMessage;

/// Email request for the mailer worker.
#[derive(Debug, Clone, PartialEq)]
pub struct SendMail {
    pub receiver: String,
    pub title: String,
    pub body: String,
    pub cc: Vec<String>,
    pub sender_email: String,
    pub sender_name: String,
    pub email_type: String,
}

impl SendMail {
    /// Sender and content type default to the service settings.
    pub fn new(
        settings: &Settings,
        receiver: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            receiver: receiver.into(),
            title: title.into(),
            body: body.into(),
            cc: Vec::new(),
            sender_email: settings.email_sender.clone(),
            sender_name: settings.email_sender_name.clone(),
            email_type: settings.email_type.clone(),
        }
    }

    pub fn cc(mut self, cc: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cc = cc.into_iter().map(Into::into).collect();
        self
    }

    pub fn sender(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.sender_email = email.into();
        self.sender_name = name.into();
        self
    }

    pub fn email_type(mut self, email_type: impl Into<String>) -> Self {
        self.email_type = email_type.into();
        self
    }
}

impl OutboundMessage for SendMail {
    fn name(&self) -> &'static str {
        "SendMail"
    }

    fn arg(&self) -> Value {
        json!({
            "sender": [self.sender_email, self.sender_name],
            "receiver": [self.receiver],
            "cc": self.cc,
            "title": self.title,
            "body": self.body,
            "type": self.email_type,
        })
    }
}

/// Rows appended to an analytics table.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMe {
    pub dataset: String,
    pub table: String,
    pub rows: Vec<Value>,
}

impl OutboundMessage for LogMe {
    fn name(&self) -> &'static str {
        "LogMe"
    }

    fn arg(&self) -> Value {
        json!({
            "dataset": self.dataset,
            "table": self.table,
            "rows": self.rows,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveData {
    pub table: String,
    pub obj_type: String,
    pub key: String,
    pub data: Value,
}

impl OutboundMessage for SaveData {
    fn name(&self) -> &'static str {
        "SaveData"
    }

    fn arg(&self) -> Value {
        json!({
            "table": self.table,
            "obj_type": self.obj_type,
            "key": self.key,
            "data": self.data,
        })
    }
}

/// Plain text alert; `channel` is omitted from the payload when unset.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAlert {
    pub text: String,
    pub channel: Option<String>,
}

impl OutboundMessage for TextAlert {
    fn name(&self) -> &'static str {
        "TextAlert"
    }

    fn arg(&self) -> Value {
        let mut arg = Map::new();
        arg.insert("text".into(), self.text.clone().into());
        with_channel(arg, self.channel.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileAlert {
    pub filename: String,
    pub text: String,
    pub channel: Option<String>,
}

impl OutboundMessage for FileAlert {
    fn name(&self) -> &'static str {
        "FileAlert"
    }

    fn arg(&self) -> Value {
        let mut arg = Map::new();
        arg.insert("filename".into(), self.filename.clone().into());
        arg.insert("text".into(), self.text.clone().into());
        with_channel(arg, self.channel.as_deref())
    }
}

fn with_channel(mut arg: Map<String, Value>, channel: Option<&str>) -> Value {
    if let Some(channel) = channel {
        arg.insert("channel".into(), channel.into());
    }
    Value::Object(arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Envelope;

    #[test]
    fn send_mail_uses_settings_defaults() {
        let settings = Settings::default();
        let mail = SendMail::new(&settings, "to@example.com", "Hello", "<p>hi</p>");

        assert_eq!(
            mail.arg(),
            json!({
                "sender": ["info@styler.link", "FACYカスタマーサポート"],
                "receiver": ["to@example.com"],
                "cc": [],
                "title": "Hello",
                "body": "<p>hi</p>",
                "type": "text/html",
            })
        );
    }

    #[test]
    fn send_mail_overrides() {
        let mail = SendMail::new(&Settings::default(), "to@example.com", "t", "b")
            .cc(["boss@example.com"])
            .sender("noreply@example.com", "Robot")
            .email_type("text/plain");

        let arg = mail.arg();
        assert_eq!(arg["cc"], json!(["boss@example.com"]));
        assert_eq!(arg["sender"], json!(["noreply@example.com", "Robot"]));
        assert_eq!(arg["type"], "text/plain");
    }

    #[test]
    fn alerts_omit_missing_channel() {
        let plain = TextAlert { text: "down".into(), channel: None };
        assert_eq!(plain.arg(), json!({"text": "down"}));

        let file = FileAlert {
            filename: "report.csv".into(),
            text: "daily".into(),
            channel: Some("#ops".into()),
        };
        assert_eq!(file.arg(), json!({"filename": "report.csv", "text": "daily", "channel": "#ops"}));
    }

    #[test]
    fn encoded_payload_is_a_routable_envelope() {
        let msg = SaveData {
            table: "users".into(),
            obj_type: "user".into(),
            key: "u-1".into(),
            data: json!({"name": "A"}),
        };

        let parsed = Envelope::parse(&msg.encoded().unwrap()).unwrap();

        assert_eq!(parsed.name, "SaveData");
        assert_eq!(parsed.arg["key"], "u-1");
    }
}
