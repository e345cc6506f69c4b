//! Busy-poll strategies for the two hardware handshakes.
//!
//! The device gives no completion interrupt for either the sample counter
//! read-back or the block ready bit, so both are spins. The strategy decides
//! when a spin gives up.

use std::time::{Duration, Instant};
use thiserror::Error;

/// How long a busy-poll may spin before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollStrategy {
    /// Spin until the hardware answers. Matches the behavior existing
    /// characterization harnesses rely on.
    #[default]
    Unbounded,
    /// Give up after this many unsuccessful attempts.
    MaxAttempts(u64),
    /// Give up once this much wall-clock time has passed.
    Deadline(Duration),
}

/// A bounded poll ran out of attempts or time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("hardware did not respond after {attempts} polls")]
pub struct PollTimeout {
    /// Attempts made before giving up.
    pub attempts: u64,
}

impl PollStrategy {
    /// Builds a strategy from optional attempt and time limits.
    ///
    /// An attempt limit wins over a time limit when both are given.
    pub fn from_limits(max_attempts: Option<u64>, timeout: Option<Duration>) -> Self {
        match (max_attempts, timeout) {
            (Some(max), _) => Self::MaxAttempts(max.max(1)),
            (None, Some(timeout)) => Self::Deadline(timeout),
            (None, None) => Self::Unbounded,
        }
    }

    /// Calls `attempt` until it yields a value or the strategy is exhausted.
    ///
    /// `attempt` always runs at least once.
    pub fn spin<T>(&self, mut attempt: impl FnMut() -> Option<T>) -> Result<T, PollTimeout> {
        let started = Instant::now();
        let mut attempts: u64 = 0;

        loop {
            if let Some(value) = attempt() {
                return Ok(value);
            }
            attempts += 1;

            let exhausted = match *self {
                Self::Unbounded => false,
                Self::MaxAttempts(max) => attempts >= max,
                Self::Deadline(limit) => started.elapsed() >= limit,
            };
            if exhausted {
                return Err(PollTimeout { attempts });
            }

            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_waits_for_success() {
        let mut calls = 0;
        let value = PollStrategy::Unbounded
            .spin(|| {
                calls += 1;
                (calls == 500).then_some(calls)
            })
            .unwrap();
        assert_eq!(value, 500);
    }

    #[test]
    fn test_max_attempts_gives_up() {
        let mut calls = 0;
        let result: Result<(), _> = PollStrategy::MaxAttempts(10).spin(|| {
            calls += 1;
            None
        });
        assert_eq!(result, Err(PollTimeout { attempts: 10 }));
        assert_eq!(calls, 10);
    }

    #[test]
    fn test_deadline_gives_up() {
        let result: Result<(), _> =
            PollStrategy::Deadline(Duration::from_millis(5)).spin(|| None);
        assert!(result.unwrap_err().attempts >= 1);
    }

    #[test]
    fn test_from_limits() {
        assert_eq!(PollStrategy::from_limits(None, None), PollStrategy::Unbounded);
        assert_eq!(
            PollStrategy::from_limits(Some(0), None),
            PollStrategy::MaxAttempts(1)
        );
        assert_eq!(
            PollStrategy::from_limits(None, Some(Duration::from_millis(3))),
            PollStrategy::Deadline(Duration::from_millis(3))
        );
    }
}
