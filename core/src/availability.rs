//! Circuit breaker gating calls to the generative backend.
//!
//! Only quota-class failures count toward the threshold. Any success resets
//! the count; the administrative toggle flips `enabled` and resets it too.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use utoipa::ToSchema;

/// Consecutive quota failures that disable the generative backend.
pub const QUOTA_FAILURE_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct AvailabilityState {
    /// Whether the generative backend may be tried
    pub enabled: bool,
    /// Quota failures since the last success or toggle
    pub consecutive_quota_failures: u32,
}

impl Default for AvailabilityState {
    fn default() -> Self {
        Self {
            enabled: true,
            consecutive_quota_failures: 0,
        }
    }
}

/// Result of recording one quota failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaFailureOutcome {
    pub failures: u32,
    /// True only for the call that moved the breaker from enabled to disabled.
    pub tripped: bool,
}

#[derive(Debug)]
pub struct AvailabilityTracker {
    state: Mutex<AvailabilityState>,
    threshold: u32,
}

impl Default for AvailabilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::with_threshold(QUOTA_FAILURE_THRESHOLD)
    }

    pub fn with_threshold(threshold: u32) -> Self {
        Self {
            state: Mutex::new(AvailabilityState::default()),
            threshold: threshold.max(1),
        }
    }

    // A panic while holding the guard cannot leave the two fields torn, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, AvailabilityState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn snapshot(&self) -> AvailabilityState {
        *self.lock()
    }

    pub fn record_success(&self) {
        self.lock().consecutive_quota_failures = 0;
    }

    pub fn record_quota_failure(&self) -> QuotaFailureOutcome {
        let mut state = self.lock();
        state.consecutive_quota_failures = state.consecutive_quota_failures.saturating_add(1);
        let tripped = state.enabled && state.consecutive_quota_failures >= self.threshold;
        if tripped {
            state.enabled = false;
        }
        QuotaFailureOutcome {
            failures: state.consecutive_quota_failures,
            tripped,
        }
    }

    /// Flip `enabled`, reset the failure count and return the new state.
    pub fn toggle(&self) -> AvailabilityState {
        let mut state = self.lock();
        state.enabled = !state.enabled;
        state.consecutive_quota_failures = 0;
        *state
    }
}
