// SPDX-FileCopyrightText: 2025 Roman Valls, 2025
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Bounded retry schedule.
//!
//! The policy only computes the schedule; callers do the waiting through
//! [`hal::Delay`], so nothing here depends on real time passing.

/// Up to `max_attempts` tries with a fixed `delay_ms` backoff after each
/// failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub delay_ms: u32,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u8, delay_ms: u32) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    /// Attempt numbers, starting at 1.
    pub fn attempts(&self) -> impl Iterator<Item = u8> {
        1..=self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_count_from_one() {
        let policy = RetryPolicy::fixed(3, 500);
        let attempts: Vec<u8> = policy.attempts().collect();
        assert_eq!(attempts, vec![1, 2, 3]);
    }

    #[test]
    fn zero_attempts_never_runs() {
        let policy = RetryPolicy::fixed(0, 500);
        assert_eq!(policy.attempts().count(), 0);
    }
}
