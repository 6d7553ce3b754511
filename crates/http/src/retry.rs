use std::collections::BTreeSet;

/// Statuses retried when none are configured.
pub const DEFAULT_RETRY_ON: [u16; 1] = [503];

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Remaining retries for one outbound call.
///
/// Retries happen immediately; there is no backoff between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBudget {
    retry_on: BTreeSet<u16>,
    remaining: u32,
}

impl RetryBudget {
    pub fn new(retry_on: impl IntoIterator<Item = u16>, max_retries: u32) -> Self {
        Self {
            retry_on: retry_on.into_iter().collect(),
            remaining: max_retries,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.retry_on.contains(&status)
    }

    /// Whether a failure with `status` should be retried.
    ///
    /// Spends one retry when it answers `true`.
    pub fn allows(&mut self, status: u16) -> bool {
        if self.remaining == 0 || !self.retries_status(status) {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_ON, DEFAULT_MAX_RETRIES)
    }
}
