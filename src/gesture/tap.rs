//! Tap versus double-tap disambiguation.
//!
//! A single tap cannot be reported on release: a second tap inside the
//! double-tap window upgrades it.  Instead the tap is parked as pending
//! and committed by a timer armed for the window plus a small grace
//! period.  All clocks here are in the frame timestamp domain.

use std::time::Duration;

use super::config::GestureConfig;
use super::event::TapRejectReason;

/// Extra delay past the double-tap window before a pending tap commits.
pub const TAP_COMMIT_GRACE_MS: f64 = 10.0;

/// A tap waiting out the double-tap window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingTap {
    /// Frame time of the release.
    pub at_ms: f64,
    pub duration_ms: f64,
    /// Frame time at which the tap commits.
    pub deadline_ms: f64,
}

/// Result of registering a tap candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapOutcome {
    Rejected {
        reason: TapRejectReason,
        duration_ms: Option<f64>,
    },
    /// Second tap inside the window; any pending tap was consumed.
    DoubleTap { duration_ms: f64 },
    /// Parked; the commit timer must be armed for `delay`.
    Pending { delay: Duration },
}

/// Tap bookkeeping: at most one pending tap, plus the cooldown clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TapDisambiguator {
    pending: Option<PendingTap>,
    last_tap_at_ms: Option<f64>,
}

impl TapDisambiguator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pinch released as a tap candidate at frame time `now_ms`.
    pub fn register(&mut self, now_ms: f64, duration_ms: f64, config: &GestureConfig) -> TapOutcome {
        if duration_ms > config.max_tap_duration_ms {
            return TapOutcome::Rejected {
                reason: TapRejectReason::TooLong,
                duration_ms: Some(duration_ms),
            };
        }

        if let Some(last) = self.last_tap_at_ms {
            if now_ms - last < config.tap_cooldown_ms {
                return TapOutcome::Rejected {
                    reason: TapRejectReason::Cooldown,
                    duration_ms: None,
                };
            }
        }

        if let Some(pending) = self.pending {
            if now_ms - pending.at_ms <= config.double_tap_window_ms {
                self.pending = None;
                self.last_tap_at_ms = Some(now_ms);
                return TapOutcome::DoubleTap { duration_ms };
            }
        }

        let delay_ms = config.double_tap_window_ms + TAP_COMMIT_GRACE_MS;
        self.pending = Some(PendingTap {
            at_ms: now_ms,
            duration_ms,
            deadline_ms: now_ms + delay_ms,
        });
        TapOutcome::Pending {
            delay: Duration::from_micros((delay_ms * 1000.0).round() as u64),
        }
    }

    /// Commit the pending tap, if any; returns its duration.
    ///
    /// The cooldown clock is stamped with the pending tap's deadline.
    pub fn commit(&mut self) -> Option<f64> {
        let pending = self.pending.take()?;
        self.last_tap_at_ms = Some(pending.deadline_ms);
        Some(pending.duration_ms)
    }

    pub fn pending(&self) -> Option<&PendingTap> {
        self.pending.as_ref()
    }

    pub fn last_tap_at_ms(&self) -> Option<f64> {
        self.last_tap_at_ms
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
