use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// What a quota counter is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// One bot-wide counter (the documented `DAILY_LIMIT` semantics).
    Global,
    /// A per-user ceiling within the same window.
    User(String),
}

/// Consumption against a quota within the current 24-hour window.
#[derive(Debug, Clone, Copy)]
struct RateCounter {
    window_start: DateTime<Utc>,
    count: u32,
}

/// Daily request quota with lazy window rollover.
///
/// `admit` is an atomic check-and-increment: the counter map sits behind a
/// single mutex, so concurrent requests racing the same scope can never
/// collectively exceed the limit. No background timer is needed — a stale
/// window is detected and reset on access.
pub struct RateLimiter {
    daily_limit: u32,
    counters: Mutex<HashMap<Scope, RateCounter>>,
}

fn window() -> Duration {
    Duration::hours(24)
}

impl RateLimiter {
    /// `daily_limit` of 0 disables limiting — every `admit` succeeds.
    pub fn new(daily_limit: u32) -> Self {
        Self {
            daily_limit,
            counters: Mutex::new(HashMap::new()),
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Admit or reject a request against the scope's current window.
    pub fn admit(&self, scope: &Scope) -> bool {
        self.admit_at(scope, Utc::now())
    }

    /// Like [`Self::admit`], with the clock under caller control.
    pub fn admit_at(&self, scope: &Scope, now: DateTime<Utc>) -> bool {
        if self.daily_limit == 0 {
            return true;
        }

        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(scope.clone()).or_insert(RateCounter {
            window_start: now,
            count: 0,
        });

        if now >= counter.window_start + window() {
            counter.window_start = now;
            counter.count = 0;
        }

        // The ceiling is inclusive: at count == daily_limit the request is
        // rejected without mutating state.
        if counter.count < self.daily_limit {
            counter.count += 1;
            true
        } else {
            false
        }
    }

    /// Requests left in the scope's current window (diagnostics).
    pub fn remaining(&self, scope: &Scope) -> u32 {
        self.remaining_at(scope, Utc::now())
    }

    pub fn remaining_at(&self, scope: &Scope, now: DateTime<Utc>) -> u32 {
        if self.daily_limit == 0 {
            return u32::MAX;
        }

        let counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match counters.get(scope) {
            Some(counter) if now < counter.window_start + window() => {
                self.daily_limit - counter.count
            }
            _ => self.daily_limit,
        }
    }

    /// Force a window reset for the scope.
    pub fn reset(&self, scope: &Scope) {
        self.reset_at(scope, Utc::now());
    }

    pub fn reset_at(&self, scope: &Scope, now: DateTime<Utc>) {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        counters.insert(
            scope.clone(),
            RateCounter {
                window_start: now,
                count: 0,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(2);
        let now = Utc::now();

        let results = [
            limiter.admit_at(&Scope::Global, now),
            limiter.admit_at(&Scope::Global, now),
            limiter.admit_at(&Scope::Global, now),
        ];
        assert_eq!(results, [true, true, false]);
    }

    #[test]
    fn rejected_call_does_not_mutate_state() {
        let limiter = RateLimiter::new(1);
        let now = Utc::now();

        assert!(limiter.admit_at(&Scope::Global, now));
        assert!(!limiter.admit_at(&Scope::Global, now));
        assert_eq!(limiter.remaining_at(&Scope::Global, now), 0);
    }

    #[test]
    fn window_rolls_over_after_24_hours() {
        let limiter = RateLimiter::new(1);
        let start = Utc::now();

        assert!(limiter.admit_at(&Scope::Global, start));
        assert!(!limiter.admit_at(&Scope::Global, start + Duration::hours(23)));
        // Exactly 24h later the window resets and the request is admitted.
        assert!(limiter.admit_at(&Scope::Global, start + Duration::hours(24)));
    }

    #[test]
    fn scopes_are_independent() {
        let limiter = RateLimiter::new(1);
        let now = Utc::now();

        assert!(limiter.admit_at(&Scope::User("a".into()), now));
        assert!(limiter.admit_at(&Scope::User("b".into()), now));
        assert!(!limiter.admit_at(&Scope::User("a".into()), now));
    }

    #[test]
    fn zero_limit_admits_everything() {
        let limiter = RateLimiter::new(0);
        let now = Utc::now();
        for _ in 0..100 {
            assert!(limiter.admit_at(&Scope::Global, now));
        }
    }

    #[test]
    fn reset_reopens_an_exhausted_window() {
        let limiter = RateLimiter::new(1);
        let now = Utc::now();

        assert!(limiter.admit_at(&Scope::Global, now));
        assert!(!limiter.admit_at(&Scope::Global, now));
        limiter.reset_at(&Scope::Global, now);
        assert!(limiter.admit_at(&Scope::Global, now));
    }

    #[test]
    fn remaining_tracks_admissions_and_rollover() {
        let limiter = RateLimiter::new(3);
        let start = Utc::now();

        assert_eq!(limiter.remaining_at(&Scope::Global, start), 3);
        limiter.admit_at(&Scope::Global, start);
        limiter.admit_at(&Scope::Global, start);
        assert_eq!(limiter.remaining_at(&Scope::Global, start), 1);
        assert_eq!(
            limiter.remaining_at(&Scope::Global, start + Duration::hours(25)),
            3
        );
    }

    #[test]
    fn concurrent_admits_never_exceed_limit() {
        let limiter = std::sync::Arc::new(RateLimiter::new(50));
        let now = Utc::now();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = std::sync::Arc::clone(&limiter);
            handles.push(std::thread::spawn(move || {
                (0..25)
                    .filter(|_| limiter.admit_at(&Scope::Global, now))
                    .count()
            }));
        }
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(admitted, 50);
    }
}
