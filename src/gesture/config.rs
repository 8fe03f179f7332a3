//! Gesture recognition thresholds and live patches.

use tracing::warn;

/// Smallest gap between the pinch engage and release thresholds that is
/// accepted without a warning.
pub const PINCH_THRESHOLD_MARGIN: f32 = 0.008;

// ── Config ─────────────────────────────────────────────────

/// Configuration for gesture recognition thresholds.
///
/// Distances are in normalized image units, durations in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    /// Thumb-index distance below which a pinch starts engaging.
    pub pinch_threshold_down: f32,
    /// Thumb-index distance above which a pinch starts releasing.
    pub pinch_threshold_up: f32,
    /// Consecutive frames below `pinch_threshold_down` to engage.
    pub pinch_down_frames: u32,
    /// Consecutive frames above `pinch_threshold_up` to release.
    pub pinch_up_frames: u32,
    /// Pinch duration before it turns into a hold.
    pub hold_ms: f64,
    /// Cursor movement a hold must exceed on either axis to drag.
    pub drag_deadzone: f32,
    /// Maximum gap between two taps for them to count as a double tap.
    pub double_tap_window_ms: f64,
    /// Minimum time between two reported taps.
    pub tap_cooldown_ms: f64,
    /// Pinches held longer than this are not taps.
    pub max_tap_duration_ms: f64,
    /// Minimum time between two poses of the same kind.
    pub pose_cooldown_ms: f64,
    /// Vertical slack for the finger extended/folded tests.
    pub finger_extend_slack: f32,
    /// Minimum index-to-pinky tip spread for an open palm.
    pub open_palm_min_spread: f32,
    pub confetti_hold_frames: u32,
    pub heart_hold_frames: u32,
    pub peace_hold_frames: u32,
    pub rock_hold_frames: u32,
    /// Maximum gap between the two index tips of a heart.
    pub heart_index_dist: f32,
    /// Maximum gap between the two thumb tips of a heart.
    pub heart_thumb_dist: f32,
    /// Minimum per-hand pinch distance of a heart.
    pub heart_min_pinch: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pinch_threshold_down: 0.034,
            pinch_threshold_up: 0.050,
            pinch_down_frames: 3,
            pinch_up_frames: 2,
            hold_ms: 340.0,
            drag_deadzone: 0.005,
            double_tap_window_ms: 320.0,
            tap_cooldown_ms: 450.0,
            max_tap_duration_ms: 220.0,
            pose_cooldown_ms: 1400.0,
            finger_extend_slack: 0.02,
            open_palm_min_spread: 0.18,
            confetti_hold_frames: 7,
            heart_hold_frames: 7,
            peace_hold_frames: 6,
            rock_hold_frames: 6,
            heart_index_dist: 0.08,
            heart_thumb_dist: 0.10,
            heart_min_pinch: 0.06,
        }
    }
}

/// Why a configuration was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("pinch release threshold {up} is below engage threshold {down}")]
    InvertedPinchThresholds { down: f32, up: f32 },
    #[error("{0} must be at least one frame")]
    ZeroFrames(&'static str),
    #[error("{0} must be a finite, non-negative number")]
    OutOfRange(&'static str),
}

impl GestureConfig {
    /// Check the invariants the engine relies on.
    ///
    /// An inverted pinch threshold pair is refused rather than corrected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let distances = [
            ("pinch-threshold-down", self.pinch_threshold_down),
            ("pinch-threshold-up", self.pinch_threshold_up),
            ("drag-deadzone", self.drag_deadzone),
            ("finger-extend-slack", self.finger_extend_slack),
            ("open-palm-min-spread", self.open_palm_min_spread),
            ("heart-index-dist", self.heart_index_dist),
            ("heart-thumb-dist", self.heart_thumb_dist),
            ("heart-min-pinch", self.heart_min_pinch),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange(name));
            }
        }

        let durations = [
            ("hold-ms", self.hold_ms),
            ("double-tap-window-ms", self.double_tap_window_ms),
            ("tap-cooldown-ms", self.tap_cooldown_ms),
            ("max-tap-duration-ms", self.max_tap_duration_ms),
            ("pose-cooldown-ms", self.pose_cooldown_ms),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange(name));
            }
        }

        let frames = [
            ("pinch-down-frames", self.pinch_down_frames),
            ("pinch-up-frames", self.pinch_up_frames),
            ("confetti-hold-frames", self.confetti_hold_frames),
            ("heart-hold-frames", self.heart_hold_frames),
            ("peace-hold-frames", self.peace_hold_frames),
            ("rock-hold-frames", self.rock_hold_frames),
        ];
        for (name, value) in frames {
            if value == 0 {
                return Err(ConfigError::ZeroFrames(name));
            }
        }

        if self.pinch_threshold_up < self.pinch_threshold_down {
            return Err(ConfigError::InvertedPinchThresholds {
                down: self.pinch_threshold_down,
                up: self.pinch_threshold_up,
            });
        }
        if self.pinch_threshold_up < self.pinch_threshold_down + PINCH_THRESHOLD_MARGIN {
            warn!(
                "pinch thresholds down={:.3} up={:.3} are closer than {:.3}; expect flicker",
                self.pinch_threshold_down, self.pinch_threshold_up, PINCH_THRESHOLD_MARGIN,
            );
        }
        Ok(())
    }

    /// A copy of this config with `patch` applied.
    pub fn merged(&self, patch: &GestureConfigPatch) -> GestureConfig {
        let mut next = self.clone();
        patch.apply_to(&mut next);
        next
    }

    /// Generate s-expression for IPC config.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:pinch-threshold-down {:.3} :pinch-threshold-up {:.3} :pinch-down-frames {} :pinch-up-frames {} :hold-ms {:.0} :drag-deadzone {:.3} :double-tap-window-ms {:.0} :tap-cooldown-ms {:.0} :max-tap-duration-ms {:.0} :pose-cooldown-ms {:.0} :finger-extend-slack {:.3} :open-palm-min-spread {:.3} :confetti-hold-frames {} :heart-hold-frames {} :peace-hold-frames {} :rock-hold-frames {} :heart-index-dist {:.3} :heart-thumb-dist {:.3} :heart-min-pinch {:.3})",
            self.pinch_threshold_down,
            self.pinch_threshold_up,
            self.pinch_down_frames,
            self.pinch_up_frames,
            self.hold_ms,
            self.drag_deadzone,
            self.double_tap_window_ms,
            self.tap_cooldown_ms,
            self.max_tap_duration_ms,
            self.pose_cooldown_ms,
            self.finger_extend_slack,
            self.open_palm_min_spread,
            self.confetti_hold_frames,
            self.heart_hold_frames,
            self.peace_hold_frames,
            self.rock_hold_frames,
            self.heart_index_dist,
            self.heart_thumb_dist,
            self.heart_min_pinch,
        )
    }
}

// ── Patch ──────────────────────────────────────────────────

/// A partial configuration update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureConfigPatch {
    pub pinch_threshold_down: Option<f32>,
    pub pinch_threshold_up: Option<f32>,
    pub pinch_down_frames: Option<u32>,
    pub pinch_up_frames: Option<u32>,
    pub hold_ms: Option<f64>,
    pub drag_deadzone: Option<f32>,
    pub double_tap_window_ms: Option<f64>,
    pub tap_cooldown_ms: Option<f64>,
    pub max_tap_duration_ms: Option<f64>,
    pub pose_cooldown_ms: Option<f64>,
    pub finger_extend_slack: Option<f32>,
    pub open_palm_min_spread: Option<f32>,
    pub confetti_hold_frames: Option<u32>,
    pub heart_hold_frames: Option<u32>,
    pub peace_hold_frames: Option<u32>,
    pub rock_hold_frames: Option<u32>,
    pub heart_index_dist: Option<f32>,
    pub heart_thumb_dist: Option<f32>,
    pub heart_min_pinch: Option<f32>,
}

macro_rules! apply_fields {
    ($patch:expr, $config:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = $patch.$field {
                $config.$field = v;
            }
        )+
    };
}

impl GestureConfigPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply_to(&self, config: &mut GestureConfig) {
        apply_fields!(
            self,
            config,
            pinch_threshold_down,
            pinch_threshold_up,
            pinch_down_frames,
            pinch_up_frames,
            hold_ms,
            drag_deadzone,
            double_tap_window_ms,
            tap_cooldown_ms,
            max_tap_duration_ms,
            pose_cooldown_ms,
            finger_extend_slack,
            open_palm_min_spread,
            confetti_hold_frames,
            heart_hold_frames,
            peace_hold_frames,
            rock_hold_frames,
            heart_index_dist,
            heart_thumb_dist,
            heart_min_pinch,
        );
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GestureConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.pinch_threshold_up >= config.pinch_threshold_down + PINCH_THRESHOLD_MARGIN);
    }

    #[test]
    fn test_merge_only_touches_set_fields() {
        let base = GestureConfig::default();
        let patch = GestureConfigPatch {
            hold_ms: Some(500.0),
            pinch_down_frames: Some(4),
            ..Default::default()
        };
        let merged = base.merged(&patch);
        assert_eq!(merged.hold_ms, 500.0);
        assert_eq!(merged.pinch_down_frames, 4);
        assert_eq!(merged.pinch_threshold_down, base.pinch_threshold_down);
        assert_eq!(merged.heart_min_pinch, base.heart_min_pinch);
    }

    #[test]
    fn test_empty_patch() {
        assert!(GestureConfigPatch::default().is_empty());
        let patch = GestureConfigPatch {
            drag_deadzone: Some(0.01),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        assert_eq!(GestureConfig::default().merged(&GestureConfigPatch::default()), GestureConfig::default());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config = GestureConfig {
            pinch_threshold_down: 0.05,
            pinch_threshold_up: 0.04,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedPinchThresholds { down: 0.05, up: 0.04 }),
        );
    }

    #[test]
    fn test_thin_margin_accepted() {
        let config = GestureConfig {
            pinch_threshold_down: 0.040,
            pinch_threshold_up: 0.042,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_frames_rejected() {
        let config = GestureConfig {
            pinch_up_frames: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroFrames("pinch-up-frames")));
    }

    #[test]
    fn test_negative_and_nan_rejected() {
        let config = GestureConfig {
            hold_ms: -1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::OutOfRange("hold-ms")));

        let config = GestureConfig {
            drag_deadzone: f32::NAN,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::OutOfRange("drag-deadzone")));
    }

    #[test]
    fn test_config_sexp() {
        let sexp = GestureConfig::default().config_sexp();
        assert!(sexp.contains(":pinch-threshold-down 0.034"));
        assert!(sexp.contains(":pinch-threshold-up 0.050"));
        assert!(sexp.contains(":hold-ms 340"));
        assert!(sexp.contains(":double-tap-window-ms 320"));
        assert!(sexp.contains(":confetti-hold-frames 7"));
    }
}
