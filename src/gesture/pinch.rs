//! Pinch detection with hysteresis and frame-stability counters.
//!
//! A pinch engages only after the thumb-index distance has stayed below
//! the engage threshold for `pinch_down_frames` consecutive frames, and
//! releases only after it has stayed above the (larger) release threshold
//! for `pinch_up_frames` consecutive frames.  Any frame that breaks a run
//! resets that run's counter.

use super::config::GestureConfig;

/// Logical pinch state for one hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinchHysteresis {
    down_count: u32,
    up_count: u32,
    pinching: bool,
}

impl PinchHysteresis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame's thumb-index distance; returns the logical pinch
    /// state after this frame.
    pub fn update(&mut self, distance: f32, config: &GestureConfig) -> bool {
        if !self.pinching {
            if distance < config.pinch_threshold_down {
                self.down_count += 1;
                if self.down_count >= config.pinch_down_frames {
                    self.pinching = true;
                    self.down_count = 0;
                    self.up_count = 0;
                }
            } else {
                self.down_count = 0;
            }
        } else if distance > config.pinch_threshold_up {
            self.up_count += 1;
            if self.up_count >= config.pinch_up_frames {
                self.pinching = false;
                self.down_count = 0;
                self.up_count = 0;
            }
        } else {
            self.up_count = 0;
        }
        self.pinching
    }

    pub fn is_pinching(&self) -> bool {
        self.pinching
    }

    /// Consecutive frames counted toward engaging.
    pub fn down_count(&self) -> u32 {
        self.down_count
    }

    /// Consecutive frames counted toward releasing.
    pub fn up_count(&self) -> u32 {
        self.up_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
