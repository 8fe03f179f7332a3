//! Gesture recognition from 2-D hand landmarks.
//!
//! Provides:
//! - `GestureEngine`: pinch state machine (tap, double tap, hold, drag)
//! - `PoseClassifier`: static poses (open palm, peace, rock on, two-hand heart)
//! - `TapTimer`: the deferred tap commit, host-driven or on a calloop loop

pub mod config;
pub mod engine;
pub mod event;
pub mod hold;
pub mod landmarks;
pub mod pinch;
pub mod pose;
pub mod tap;
pub mod timer;

pub use config::{ConfigError, GestureConfig, GestureConfigPatch, PINCH_THRESHOLD_MARGIN};
pub use engine::{EngineError, GestureEngine, GestureEngineBuilder};
pub use event::{GestureEvent, Phase, PinchUpKind, PoseKind, TapRejectReason};
pub use landmarks::{
    Finger, FrameError, HandLandmark, HandLandmarkFrame, HandLandmarks, Handedness, Landmark,
    Point, RawHand, LANDMARK_COUNT, MAX_HANDS,
};
pub use pose::PoseClassifier;
pub use tap::{PendingTap, TAP_COMMIT_GRACE_MS};
pub use timer::{CalloopTapTimer, ManualTapTimer, TapTimer, TimerError};
