//! Key-set backed token admission.
//!
//! [`KeySetValidator`] keeps the published verification keys in a
//! [`KeyCache`] and refetches them only after they expire. A token is
//! admitted when its `kid` names a published key and its time claims hold.
//! Cryptographic signature checks stay with the network edge.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use restkit_auth::{KeyCache, token_key_id};
use restkit_core::Settings;

use crate::middleware::{ClaimsValidator, InvalidToken, TokenValidator};

/// Key id → published certificate.
pub type KeySet = BTreeMap<String, String>;

/// Where published keys come from, with the time they stop being valid.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<(KeySet, DateTime<Utc>)>;
}

pub struct KeySetValidator<S> {
    source: S,
    url: String,
    cache: Mutex<KeyCache<Arc<KeySet>>>,
}

impl<S: KeySource> KeySetValidator<S> {
    pub fn new(source: S, url: impl Into<String>) -> Self {
        Self {
            source,
            url: url.into(),
            cache: Mutex::new(KeyCache::new()),
        }
    }

    /// Fetch keys from the configured `JWKS_URL`.
    pub fn from_settings(source: S, settings: &Settings) -> Self {
        Self::new(source, &settings.jwks_url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn keys(&self, now: DateTime<Utc>) -> Result<Arc<KeySet>, InvalidToken> {
        {
            let cache = self.cache.lock().map_err(|_| InvalidToken::new("key cache poisoned"))?;
            if !cache.is_stale(now) {
                if let Some(keys) = cache.value() {
                    return Ok(keys.clone());
                }
            }
        }

        let (keys, expiry) = self.source.fetch(&self.url).await.map_err(|e| {
            tracing::error!(url = %self.url, error = %format!("{e:#}"), "could not refresh verification keys");
            InvalidToken::new("verification keys unavailable")
        })?;
        tracing::debug!(url = %self.url, keys = keys.len(), %expiry, "verification keys refreshed");

        let mut cache = self.cache.lock().map_err(|_| InvalidToken::new("key cache poisoned"))?;
        Ok(cache.store(Arc::new(keys), expiry).clone())
    }
}

#[async_trait]
impl<S: KeySource> TokenValidator for KeySetValidator<S> {
    async fn validate(&self, token: &str) -> Result<(), InvalidToken> {
        let kid = token_key_id(token)
            .map_err(|e| InvalidToken::new(e.to_string()))?
            .ok_or_else(|| InvalidToken::new("token header has no kid"))?;

        let keys = self.keys(Utc::now()).await?;
        if !keys.contains_key(&kid) {
            return Err(InvalidToken::new(format!("unknown key id '{kid}'")));
        }

        ClaimsValidator.validate(token).await
    }
}
