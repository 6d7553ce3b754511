//! Process-wide service settings.
//!
//! Loaded once at startup from the environment and treated as read-only
//! afterwards. `from_lookup` exists so tests never touch the real process
//! environment.

use thiserror::Error;

const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Service-wide configuration shared by every restkit component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub service_name: String,
    pub container_name: String,
    pub namespace: String,
    pub version: String,
    pub environment: String,

    /// Whether every outbound HTTP call is written to the request audit log.
    pub log_internal_requests: bool,
    pub internal_requests_dataset: String,
    pub internal_requests_table: String,

    pub topic_name: String,
    pub mailer_topic: String,
    pub logme_topic: String,

    pub email_sender: String,
    pub email_sender_name: String,
    pub email_type: String,

    pub jwks_url: String,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_internal_requests = match non_blank(&lookup, "INTERNAL_REQUESTS_LOG_ALL") {
            None => false,
            Some(raw) => parse_flag(&raw).ok_or(SettingsError::InvalidValue {
                key: "INTERNAL_REQUESTS_LOG_ALL",
                value: raw,
            })?,
        };

        Ok(Self::assemble(&lookup, log_internal_requests))
    }

    fn assemble(lookup: &dyn Fn(&str) -> Option<String>, log_internal_requests: bool) -> Self {
        let or = |key: &str, default: &str| {
            non_blank(lookup, key).unwrap_or_else(|| default.to_string())
        };

        let environment = or("ENVIRONMENT", "local");
        let topic = |key: &str, suffix: &str| {
            non_blank(lookup, key)
                .unwrap_or_else(|| format!("projects/facy-{environment}/topics/{suffix}"))
        };

        Self {
            service_name: or("SERVICE_NAME", "svc"),
            container_name: or("CONTAINER_NAME", "api"),
            namespace: or("NAMESPACE", "namespace"),
            version: or("VERSION", "0.1.0"),
            log_internal_requests,
            internal_requests_dataset: or("INTERNAL_REQUESTS_DATASET", "internal_requests"),
            internal_requests_table: or("INTERNAL_REQUESTS_TABLE", "requests"),
            topic_name: topic("TOPIC_NAME", "common"),
            mailer_topic: topic("MAILER_TOPIC", "send-email"),
            logme_topic: topic("LOGME_TOPIC", "logme"),
            email_sender: or("EMAIL_SENDER", "info@styler.link"),
            email_sender_name: or("EMAIL_SENDER_NAME", "FACYカスタマーサポート"),
            email_type: or("EMAIL_TYPE", "text/html"),
            jwks_url: or("JWKS_URL", DEFAULT_JWKS_URL),
            environment,
        }
    }

    /// Service identifier used when reporting errors (`namespace/container`).
    pub fn error_handler_service(&self) -> String {
        format!("{}/{}", self.namespace, self.container_name)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::assemble(&|_| None, false)
    }
}

fn non_blank(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
