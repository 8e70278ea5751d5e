//! Login rate limiting keyed by the submitted identifier.
//!
//! Counters are kept in process memory. An attempt is reserved with
//! [`RateLimiter::try_begin`] before the credential check and settled
//! afterwards, all under one lock: failures already recorded plus attempts
//! still in flight never exceed `max_attempts`, however many requests arrive
//! in parallel.
//!
//! Once a lockout has expired, or no failure has been seen for a lockout
//! window, the counter restarts from zero. Entries that track nothing are
//! dropped so the map only holds identifiers with live state.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{error, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(15 * 60);
/// Longest lockout accepted; larger values are clamped.
pub const MAX_LOCKOUT: Duration = Duration::from_secs(30 * 24 * 60 * 60);
/// Suggested wait when the budget is held by attempts still being checked.
const PENDING_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Locked { retry_after: Duration },
}

/// Every `Allowed` from `try_begin` must be settled by exactly one of
/// `record_failure`, `release` or `clear`.
pub trait RateLimiter: Send + Sync {
    fn try_begin(&self, identifier: &str) -> RateLimitDecision;
    fn record_failure(&self, identifier: &str) -> RateLimitDecision;
    /// Give a reservation back without charging it.
    fn release(&self, identifier: &str);
    fn clear(&self, identifier: &str);
}

#[derive(Debug, Default, Clone, Copy)]
struct LockoutState {
    attempts: u32,
    in_flight: u32,
    last_failure: Option<Instant>,
    locked_until: Option<Instant>,
}

impl LockoutState {
    fn is_live(&self, now: Instant, window: Duration) -> bool {
        self.in_flight > 0
            || self.locked_until.is_some_and(|until| until > now)
            || self
                .last_failure
                .is_some_and(|at| now.saturating_duration_since(at) < window)
    }
}

#[derive(Debug)]
pub struct LoginRateLimiter {
    max_attempts: u32,
    lockout: Duration,
    entries: Mutex<HashMap<String, LockoutState>>,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCKOUT)
    }
}

impl LoginRateLimiter {
    #[must_use]
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout: lockout.min(MAX_LOCKOUT),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn try_begin_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        let Ok(mut entries) = self.entries.lock() else {
            error!("rate limiter state poisoned");
            return RateLimitDecision::Locked {
                retry_after: self.lockout,
            };
        };

        let Some(state) = entries.get_mut(identifier) else {
            entries.insert(
                identifier.to_string(),
                LockoutState {
                    in_flight: 1,
                    ..LockoutState::default()
                },
            );
            return RateLimitDecision::Allowed;
        };
        self.expire(state, now);

        if let Some(until) = state.locked_until {
            return RateLimitDecision::Locked {
                retry_after: until.saturating_duration_since(now),
            };
        }
        if state.attempts.saturating_add(state.in_flight) >= self.max_attempts {
            return RateLimitDecision::Locked {
                retry_after: PENDING_RETRY_AFTER,
            };
        }

        state.in_flight += 1;
        RateLimitDecision::Allowed
    }

    pub(crate) fn record_failure_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        let Ok(mut entries) = self.entries.lock() else {
            error!("rate limiter state poisoned");
            return RateLimitDecision::Locked {
                retry_after: self.lockout,
            };
        };

        let window = self.lockout;
        entries.retain(|key, state| key == identifier || state.is_live(now, window));

        let state = entries.entry(identifier.to_string()).or_default();
        self.expire(state, now);

        state.in_flight = state.in_flight.saturating_sub(1);
        state.attempts = state.attempts.saturating_add(1);
        state.last_failure = Some(now);
        if state.attempts >= self.max_attempts {
            let Some(until) = now.checked_add(self.lockout) else {
                error!("lockout deadline out of range");
                return RateLimitDecision::Locked {
                    retry_after: self.lockout,
                };
            };
            state.locked_until = Some(until);
            warn!(
                attempts = state.attempts,
                lockout_seconds = self.lockout.as_secs(),
                "login identifier locked out"
            );
            return RateLimitDecision::Locked {
                retry_after: self.lockout,
            };
        }

        RateLimitDecision::Allowed
    }

    pub(crate) fn release_at(&self, identifier: &str, now: Instant) {
        let Ok(mut entries) = self.entries.lock() else {
            error!("rate limiter state poisoned");
            return;
        };
        let Some(state) = entries.get_mut(identifier) else {
            return;
        };
        state.in_flight = state.in_flight.saturating_sub(1);
        if !state.is_live(now, self.lockout) {
            entries.remove(identifier);
        }
    }

    /// Reset a finished lockout, or a failure streak idle for a whole window.
    /// Reservations in flight are kept.
    fn expire(&self, state: &mut LockoutState, now: Instant) {
        let lock_over = state.locked_until.is_some_and(|until| until <= now);
        let idle = state.locked_until.is_none()
            && state
                .last_failure
                .is_some_and(|at| now.saturating_duration_since(at) >= self.lockout);
        if lock_over || idle {
            *state = LockoutState {
                in_flight: state.in_flight,
                ..LockoutState::default()
            };
        }
    }

    #[cfg(test)]
    fn attempts(&self, identifier: &str) -> u32 {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(identifier).map(|state| state.attempts))
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

impl RateLimiter for LoginRateLimiter {
    fn try_begin(&self, identifier: &str) -> RateLimitDecision {
        self.try_begin_at(identifier, Instant::now())
    }

    fn record_failure(&self, identifier: &str) -> RateLimitDecision {
        self.record_failure_at(identifier, Instant::now())
    }

    fn release(&self, identifier: &str) {
        self.release_at(identifier, Instant::now());
    }

    fn clear(&self, identifier: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(identifier);
        } else {
            error!("rate limiter state poisoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const ID: &str = "sarah@example.com";

    fn fail(limiter: &LoginRateLimiter, identifier: &str, now: Instant) -> RateLimitDecision {
        assert_eq!(
            limiter.try_begin_at(identifier, now),
            RateLimitDecision::Allowed
        );
        limiter.record_failure_at(identifier, now)
    }

    #[test]
    fn unknown_identifier_is_allowed() {
        let limiter = LoginRateLimiter::default();
        assert_eq!(limiter.try_begin(ID), RateLimitDecision::Allowed);
        limiter.release(ID);
        assert_eq!(limiter.attempts(ID), 0);
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn locks_after_max_attempts() {
        let limiter = LoginRateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        assert_eq!(fail(&limiter, ID, now), RateLimitDecision::Allowed);
        assert_eq!(fail(&limiter, ID, now), RateLimitDecision::Allowed);
        assert!(matches!(
            fail(&limiter, ID, now),
            RateLimitDecision::Locked { .. }
        ));

        let later = now + Duration::from_secs(59);
        assert_eq!(
            limiter.try_begin_at(ID, later),
            RateLimitDecision::Locked {
                retry_after: Duration::from_secs(1)
            }
        );
    }

    #[test]
    fn lockout_expires_and_counter_restarts() {
        let limiter = LoginRateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        fail(&limiter, ID, now);
        fail(&limiter, ID, now);

        let after = now + Duration::from_secs(60);
        assert_eq!(limiter.try_begin_at(ID, after), RateLimitDecision::Allowed);
        assert_eq!(limiter.attempts(ID), 0);
        assert_eq!(
            limiter.record_failure_at(ID, after),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn idle_failures_are_forgotten() {
        let limiter = LoginRateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();
        fail(&limiter, ID, now);
        fail(&limiter, ID, now);

        let after = now + Duration::from_secs(60);
        assert_eq!(limiter.try_begin_at(ID, after), RateLimitDecision::Allowed);
        assert_eq!(limiter.attempts(ID), 0);
        limiter.release_at(ID, after);
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn clear_resets_counter() {
        let limiter = LoginRateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();
        fail(&limiter, ID, now);
        fail(&limiter, ID, now);
        limiter.clear(ID);
        assert_eq!(limiter.attempts(ID), 0);
        assert_eq!(fail(&limiter, ID, now), RateLimitDecision::Allowed);
    }

    #[test]
    fn identifiers_are_independent() {
        let limiter = LoginRateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        fail(&limiter, ID, now);
        assert!(matches!(
            limiter.try_begin_at(ID, now),
            RateLimitDecision::Locked { .. }
        ));
        assert_eq!(
            limiter.try_begin_at("other@example.com", now),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn reservations_count_against_the_budget() {
        let limiter = LoginRateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(limiter.try_begin_at(ID, now), RateLimitDecision::Allowed);
        assert_eq!(limiter.try_begin_at(ID, now), RateLimitDecision::Allowed);
        assert_eq!(
            limiter.try_begin_at(ID, now),
            RateLimitDecision::Locked {
                retry_after: PENDING_RETRY_AFTER
            }
        );

        limiter.release_at(ID, now);
        assert_eq!(limiter.try_begin_at(ID, now), RateLimitDecision::Allowed);
    }

    #[test]
    fn parallel_attempts_never_exceed_max() {
        let limiter = Arc::new(LoginRateLimiter::new(2, Duration::from_secs(900)));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || match limiter.try_begin(ID) {
                    RateLimitDecision::Allowed => {
                        limiter.record_failure(ID);
                        true
                    }
                    RateLimitDecision::Locked { .. } => false,
                })
            })
            .collect();

        let checked = handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(checked, 2);
        assert_eq!(limiter.attempts(ID), 2);
        assert!(matches!(
            limiter.try_begin(ID),
            RateLimitDecision::Locked { .. }
        ));
    }

    #[test]
    fn settled_attempts_leave_no_entries() {
        let limiter = LoginRateLimiter::default();
        for i in 0..10_000 {
            let identifier = format!("patient{i}@example.com");
            assert_eq!(limiter.try_begin(&identifier), RateLimitDecision::Allowed);
            if i % 2 == 0 {
                limiter.release(&identifier);
            } else {
                limiter.clear(&identifier);
            }
        }
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn stale_failures_are_swept() {
        let limiter = LoginRateLimiter::new(5, Duration::from_secs(60));
        let now = Instant::now();
        for i in 0..100 {
            fail(&limiter, &format!("patient{i}@example.com"), now);
        }
        assert_eq!(limiter.tracked(), 100);

        let later = now + Duration::from_secs(61);
        fail(&limiter, ID, later);
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn huge_lockout_is_clamped() {
        let limiter = LoginRateLimiter::new(1, Duration::MAX);
        assert_eq!(
            fail(&limiter, ID, Instant::now()),
            RateLimitDecision::Locked {
                retry_after: MAX_LOCKOUT
            }
        );
    }
}
