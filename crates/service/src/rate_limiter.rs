use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::observability::RATE_LIMITED_TOTAL;

#[derive(Debug, Clone, Copy)]
struct WindowState {
    window_start: Instant,
    count: u32,
    blocked_until: Option<Instant>,
}

impl WindowState {
    fn fresh(now: Instant) -> Self {
        Self { window_start: now, count: 0, blocked_until: None }
    }
}

/// Fixed-window action counter keyed by actor address. Going over
/// `max_actions` inside one window puts the address in cooldown.
pub struct ActionRateLimiter {
    max_actions: u32,
    window: Duration,
    cooldown: Duration,
    enabled: bool,
    entries: DashMap<String, WindowState>,
}

impl ActionRateLimiter {
    pub fn new(max_actions: u32, window: Duration, cooldown: Duration, enabled: bool) -> Self {
        Self { max_actions, window, cooldown, enabled, entries: DashMap::new() }
    }

    pub fn from_config(cfg: &configs::RateLimitConfig) -> Self {
        Self::new(
            cfg.max_actions,
            Duration::from_secs(cfg.window_secs),
            Duration::from_secs(cfg.cooldown_secs),
            cfg.enabled,
        )
    }

    pub fn check(&self, address: &str) -> Result<(), ServiceError> {
        self.check_at(address, Instant::now())
    }

    /// Count one action for `address` at `now`.
    pub fn check_at(&self, address: &str, now: Instant) -> Result<(), ServiceError> {
        if !self.enabled {
            return Ok(());
        }

        let mut entry = self
            .entries
            .entry(address.to_string())
            .or_insert_with(|| WindowState::fresh(now));
        let state = entry.value_mut();

        if let Some(until) = state.blocked_until {
            if now < until {
                RATE_LIMITED_TOTAL.inc();
                return Err(limited(until - now));
            }
            *state = WindowState::fresh(now);
        }

        if now.duration_since(state.window_start) >= self.window {
            *state = WindowState::fresh(now);
        }

        if state.count >= self.max_actions {
            let until = now + self.cooldown;
            state.blocked_until = Some(until);
            RATE_LIMITED_TOTAL.inc();
            warn!(%address, max_actions = self.max_actions, "rate limit exceeded, entering cooldown");
            return Err(limited(self.cooldown));
        }

        state.count += 1;
        debug!(%address, count = state.count, "action counted");
        Ok(())
    }

    /// Drop entries whose window and cooldown are both over.
    pub fn prune(&self) {
        self.prune_at(Instant::now())
    }

    pub fn prune_at(&self, now: Instant) {
        self.entries.retain(|_, s| {
            let cooling = s.blocked_until.is_some_and(|until| now < until);
            cooling || now.duration_since(s.window_start) < self.window
        });
    }

    pub fn tracked(&self) -> usize { self.entries.len() }
}

fn limited(wait: Duration) -> ServiceError {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    ServiceError::RateLimited { retry_after_secs: secs.max(1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x00000000000000000000000000000000000000a1";
    const BOB: &str = "0x00000000000000000000000000000000000000b2";

    fn limiter() -> ActionRateLimiter {
        ActionRateLimiter::new(3, Duration::from_secs(60), Duration::from_secs(30), true)
    }

    #[test]
    fn allows_up_to_max_then_cools_down() {
        let l = limiter();
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(l.check_at(ALICE, t0).is_ok());
        }
        match l.check_at(ALICE, t0) {
            Err(ServiceError::RateLimited { retry_after_secs }) => assert_eq!(retry_after_secs, 30),
            other => panic!("expected rate limit, got {other:?}"),
        }
        // still blocked, remaining time shrinks and is not extended
        match l.check_at(ALICE, t0 + Duration::from_secs(20)) {
            Err(ServiceError::RateLimited { retry_after_secs }) => assert_eq!(retry_after_secs, 10),
            other => panic!("expected rate limit, got {other:?}"),
        }
        assert!(l.check_at(ALICE, t0 + Duration::from_secs(31)).is_ok());
    }

    #[test]
    fn addresses_are_independent() {
        let l = limiter();
        let t0 = Instant::now();
        for _ in 0..3 {
            l.check_at(ALICE, t0).unwrap();
        }
        assert!(l.check_at(ALICE, t0).is_err());
        assert!(l.check_at(BOB, t0).is_ok());
    }

    #[test]
    fn window_resets_counter() {
        let l = limiter();
        let t0 = Instant::now();
        for _ in 0..3 {
            l.check_at(ALICE, t0).unwrap();
        }
        assert!(l.check_at(ALICE, t0 + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn disabled_always_allows() {
        let l = ActionRateLimiter::new(1, Duration::from_secs(60), Duration::from_secs(30), false);
        for _ in 0..100 {
            assert!(l.check(ALICE).is_ok());
        }
        assert_eq!(l.tracked(), 0);
    }

    #[test]
    fn prune_keeps_cooling_entries() {
        let l = ActionRateLimiter::new(1, Duration::from_secs(10), Duration::from_secs(100), true);
        let t0 = Instant::now();
        l.check_at(ALICE, t0).unwrap();
        l.check_at(BOB, t0).unwrap();
        assert!(l.check_at(BOB, t0).is_err());

        l.prune_at(t0 + Duration::from_secs(20));
        assert_eq!(l.tracked(), 1);
        l.prune_at(t0 + Duration::from_secs(200));
        assert_eq!(l.tracked(), 0);
    }
}
