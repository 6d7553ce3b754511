//! Expiring cache for verification key material (e.g. a JWKS document).
//!
//! The cache is a plain value owned by whichever long-lived validator uses
//! it; there is no module-level state. Refresh happens only when the cache is
//! empty or `expiry <= now`. `restkit_api::KeySetValidator` holds one for the
//! published key set.

use std::future::Future;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCache<T> {
    entry: Option<(T, DateTime<Utc>)>,
}

impl<T> KeyCache<T> {
    pub fn new() -> Self {
        Self { entry: None }
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match &self.entry {
            None => true,
            Some((_, expiry)) => *expiry <= now,
        }
    }

    /// Cached value regardless of expiry.
    pub fn value(&self) -> Option<&T> {
        self.entry.as_ref().map(|(value, _)| value)
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().map(|(_, expiry)| *expiry)
    }

    /// Replace the cached value unconditionally.
    pub fn store(&mut self, value: T, expiry: DateTime<Utc>) -> &T {
        &self.entry.insert((value, expiry)).0
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Return the cached value, calling `refresh` first when stale.
    ///
    /// A failed refresh leaves the previous entry untouched.
    pub fn get_or_refresh<F, E>(&mut self, now: DateTime<Utc>, refresh: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<(T, DateTime<Utc>), E>,
    {
        let entry = match self.entry.take() {
            Some(entry) if entry.1 > now => entry,
            previous => match refresh() {
                Ok(fresh) => fresh,
                Err(e) => {
                    self.entry = previous;
                    return Err(e);
                }
            },
        };
        Ok(&self.entry.insert(entry).0)
    }

    /// Async variant of [`KeyCache::get_or_refresh`] for network-backed key sources.
    pub async fn get_or_refresh_async<F, Fut, E>(&mut self, now: DateTime<Utc>, refresh: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(T, DateTime<Utc>), E>>,
    {
        let entry = match self.entry.take() {
            Some(entry) if entry.1 > now => entry,
            previous => match refresh().await {
                Ok(fresh) => fresh,
                Err(e) => {
                    self.entry = previous;
                    return Err(e);
                }
            },
        };
        Ok(&self.entry.insert(entry).0)
    }
}

impl<T> Default for KeyCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
