// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-key exponential backoff for retried control events

use ahash::AHashMap;
use std::time::Duration;

/// Delay for the n-th retry of a key is `min(base * 2^n, max)`.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    base: Duration,
    max: Duration,
    failures: AHashMap<String, u32>,
}

impl RateLimiter {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: AHashMap::new(),
        }
    }

    /// Delay before the next retry of `key`; counts the retry.
    pub fn when(&mut self, key: &str) -> Duration {
        let exp = self.failures.entry(key.to_string()).or_insert(0);
        let attempt = *exp;
        *exp = exp.saturating_add(1);

        if attempt >= 64 {
            return self.max;
        }
        let backoff = self.base.as_nanos() << attempt;
        if backoff >= self.max.as_nanos() {
            self.max
        } else {
            Duration::from_nanos(backoff as u64)
        }
    }

    pub fn num_requeues(&self, key: &str) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }

    pub fn forget(&mut self, key: &str) {
        self.failures.remove(key);
    }

    pub fn clear(&mut self) {
        self.failures.clear();
    }
}
