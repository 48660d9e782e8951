//! Exponential backoff schedule for transport-level retries.
//!
//! A [`BackoffPolicy`] is immutable configuration shared by every call made
//! through a client. Each commit starts its own [`Backoff`], which tracks the
//! elapsed time and the last delay handed out.

use rand::Rng;
use std::time::{Duration, Instant};

/// Describes how long to wait between transport retries and when to give up.
///
/// Delays start at `initial_interval`, grow by `multiplier` after every
/// failure, and never exceed `max_interval`. The whole retry loop is bounded
/// by `max_elapsed_time`; `None` means no elapsed-time cap.
///
/// # Examples
///
/// ```
/// use botcall::BackoffPolicy;
/// use std::time::Duration;
///
/// // At most 5s between attempts, give up after 30s.
/// let policy = BackoffPolicy::new(5, 30);
/// assert_eq!(policy.max_interval(), Duration::from_secs(5));
/// assert_eq!(policy.max_elapsed_time(), Some(Duration::from_secs(30)));
///
/// // A negative elapsed budget removes the cap entirely.
/// let unbounded = BackoffPolicy::new(5, -1);
/// assert_eq!(unbounded.max_elapsed_time(), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    initial_interval: Duration,
    max_interval: Duration,
    max_elapsed_time: Option<Duration>,
    multiplier: f64,
    randomization_factor: f64,
}

impl BackoffPolicy {
    const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
    const DEFAULT_MULTIPLIER: f64 = 1.5;
    const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;

    /// Creates a policy from whole seconds.
    ///
    /// A negative `max_elapsed_secs` means "retry without an elapsed-time cap";
    /// it is not treated as zero. A negative `max_interval_secs` is clamped to
    /// zero.
    pub fn new(max_interval_secs: i64, max_elapsed_secs: i64) -> Self {
        let max_interval = Duration::from_secs(max_interval_secs.max(0) as u64);
        let max_elapsed_time = if max_elapsed_secs < 0 {
            None
        } else {
            Some(Duration::from_secs(max_elapsed_secs as u64))
        };
        Self::from_durations(max_interval, max_elapsed_time)
    }

    /// Creates a policy from durations. `None` disables the elapsed-time cap.
    pub fn from_durations(max_interval: Duration, max_elapsed_time: Option<Duration>) -> Self {
        Self {
            initial_interval: Self::DEFAULT_INITIAL_INTERVAL,
            max_interval,
            max_elapsed_time,
            multiplier: Self::DEFAULT_MULTIPLIER,
            randomization_factor: Self::DEFAULT_RANDOMIZATION_FACTOR,
        }
    }

    /// Sets the delay before the first retry.
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Sets the growth factor applied after every failed attempt.
    ///
    /// Values below `1.0` are raised to `1.0`.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Sets the jitter ratio, clamped to `0.0..=1.0`.
    ///
    /// A factor of `0.5` picks each delay between 50% and 100% of the
    /// computed interval. `0.0` disables jitter.
    pub fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Delay before the first retry, before jitter.
    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    /// Upper bound on any single delay.
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Elapsed-time budget for the whole retry loop; `None` is uncapped.
    pub fn max_elapsed_time(&self) -> Option<Duration> {
        self.max_elapsed_time
    }

    /// Starts a fresh retry schedule. The elapsed-time clock begins now.
    pub fn start(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            started_at: Instant::now(),
            current_interval: self.initial_interval.min(self.max_interval),
            last_delay: Duration::ZERO,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(10, 60)
    }
}

/// Retry state for a single commit.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    started_at: Instant,
    current_interval: Duration,
    last_delay: Duration,
}

impl Backoff {
    /// Returns the delay to wait before the next attempt, or `None` once the
    /// elapsed-time budget would be exceeded by waiting.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let delay = self.jittered(self.current_interval);

        if let Some(max_elapsed) = self.policy.max_elapsed_time {
            if self.elapsed().saturating_add(delay) > max_elapsed {
                return None;
            }
        }

        self.last_delay = delay;
        self.current_interval =
            Duration::try_from_secs_f64(self.current_interval.as_secs_f64() * self.policy.multiplier)
                .unwrap_or(self.policy.max_interval)
                .min(self.policy.max_interval);

        Some(delay)
    }

    /// Time since this schedule was started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    // Jitter never drops below the previous delay, so the sequence stays
    // non-decreasing, and never rises above max_interval.
    fn jittered(&self, interval: Duration) -> Duration {
        let factor = self.policy.randomization_factor;
        let delay = if factor > 0.0 {
            let ratio = rand::thread_rng().gen_range((1.0 - factor)..=1.0);
            interval.mul_f64(ratio)
        } else {
            interval
        };
        delay.max(self.last_delay).min(self.policy.max_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deterministic(max_interval: Duration, max_elapsed: Option<Duration>) -> BackoffPolicy {
        BackoffPolicy::from_durations(max_interval, max_elapsed)
            .with_initial_interval(Duration::from_millis(100))
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
    }

    #[test]
    fn test_negative_elapsed_means_uncapped() {
        let policy = BackoffPolicy::new(3, -1);
        assert_eq!(policy.max_elapsed_time(), None);

        let policy = BackoffPolicy::new(3, 0);
        assert_eq!(policy.max_elapsed_time(), Some(Duration::ZERO));
    }

    #[test]
    fn test_negative_interval_is_clamped() {
        let policy = BackoffPolicy::new(-5, 10);
        assert_eq!(policy.max_interval(), Duration::ZERO);
    }

    #[test]
    fn test_exponential_delays_capped_by_max_interval() {
        let mut backoff = deterministic(Duration::from_millis(500), None).start();

        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(400)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(500)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_jittered_delays_are_monotonic_and_bounded() {
        let policy = BackoffPolicy::from_durations(Duration::from_millis(800), None)
            .with_initial_interval(Duration::from_millis(50))
            .with_randomization_factor(1.0);
        let mut backoff = policy.start();

        let mut previous = Duration::ZERO;
        for _ in 0..50 {
            let delay = backoff.next_delay().unwrap();
            assert!(delay >= previous, "{:?} < {:?}", delay, previous);
            assert!(delay <= Duration::from_millis(800));
            previous = delay;
        }
    }

    #[test]
    fn test_zero_budget_is_exhausted_immediately() {
        let mut backoff = deterministic(Duration::from_secs(1), Some(Duration::ZERO)).start();
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn test_budget_exhausts_once_delay_would_overrun() {
        // Nothing sleeps here, so elapsed stays near zero: 100ms and 200ms fit
        // in 350ms of budget, the third delay (400ms) does not.
        let mut backoff =
            deterministic(Duration::from_secs(1), Some(Duration::from_millis(350))).start();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn test_initial_interval_never_exceeds_max() {
        let mut backoff = BackoffPolicy::from_durations(Duration::from_millis(10), None)
            .with_initial_interval(Duration::from_secs(5))
            .start();
        assert!(backoff.next_delay().unwrap() <= Duration::from_millis(10));
    }
}
