//! Per-provider cooldown bookkeeping.
//!
//! Rate limits belong to a credential/provider pair, not to one caller, so a
//! single [`RateLimitTracker`] is created at startup and shared by every
//! request through the router.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Cooldown after the first strike.
const BASE_COOLDOWN_SECS: u64 = 20;
/// Upper bound on any cooldown.
const MAX_COOLDOWN_SECS: u64 = 300;

/// Cooldown state for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    /// Rate-limit failures since the last success.
    pub strikes: u32,
    pub cooldown_until: Instant,
}

/// Cooldown for the given strike count: `min(20 * 2^(strikes-1), 300)` seconds.
pub fn backoff_for(strikes: u32) -> Duration {
    let exponent = strikes.saturating_sub(1).min(16);
    let secs = BASE_COOLDOWN_SECS
        .saturating_mul(1_u64 << exponent)
        .min(MAX_COOLDOWN_SECS);
    Duration::from_secs(secs)
}

/// Shared, mutex-guarded map of provider name to cooldown state.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    state: Mutex<HashMap<String, RateLimitState>>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimitState>> {
        // The map holds plain values, so a panic mid-update cannot leave it
        // half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the provider is still inside its cooldown window.
    pub fn is_cooling_down(&self, name: &str) -> bool {
        self.lock()
            .get(name)
            .is_some_and(|s| Instant::now() < s.cooldown_until)
    }

    /// Record a rate-limit failure and return the cooldown that was applied.
    pub fn record_failure(&self, name: &str) -> Duration {
        let mut guard = self.lock();
        let strikes = guard.get(name).map_or(0, |s| s.strikes) + 1;
        let cooldown = backoff_for(strikes);
        guard.insert(
            name.to_string(),
            RateLimitState {
                strikes,
                cooldown_until: Instant::now() + cooldown,
            },
        );
        cooldown
    }

    /// Forget everything about the provider. Called after any success.
    pub fn clear(&self, name: &str) {
        self.lock().remove(name);
    }

    /// Current strike count (zero when no state is recorded).
    pub fn strikes(&self, name: &str) -> u32 {
        self.lock().get(name).map_or(0, |s| s.strikes)
    }

    /// Snapshot of the state for one provider.
    pub fn state(&self, name: &str) -> Option<RateLimitState> {
        self.lock().get(name).copied()
    }
}
