/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Resubmission policy for items a batch write left unprocessed.

use std::time::Duration;

const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// How often, and how patiently, unprocessed items are resubmitted.
///
/// Attempts are counted per batch and include the first submission, so `max_attempts = 1`
/// disables resubmission entirely. Back-off doubles with every resubmission, starting at
/// `initial_backoff` and capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy. `None` attempts means resubmit until nothing is outstanding.
    pub fn new(max_attempts: Option<u32>, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    /// Resubmits immediately and forever.
    pub fn immediate() -> Self {
        Self::new(None, Duration::ZERO, Duration::ZERO)
    }

    /// Limits the number of submissions per batch.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Maximum submissions per batch, if bounded.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Whether submission number `attempt` (1-based) may be made.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }

    /// Delay to wait before submission number `attempt`. The first submission never waits.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(31);
        self.initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(None, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_unbounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), None);
        assert!(policy.allows_attempt(u32::MAX));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(
            Some(10),
            Duration::from_millis(100),
            Duration::from_millis(500),
        );
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert_eq!(policy.backoff(2), Duration::from_millis(100));
        assert_eq!(policy.backoff(3), Duration::from_millis(200));
        assert_eq!(policy.backoff(4), Duration::from_millis(400));
        assert_eq!(policy.backoff(5), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn max_attempts_counts_first_submission() {
        let policy = RetryPolicy::immediate().with_max_attempts(3);
        assert!(policy.allows_attempt(3));
        assert!(!policy.allows_attempt(4));
        assert_eq!(policy.backoff(3), Duration::ZERO);
    }
}
