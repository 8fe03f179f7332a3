//! Gesture recognition engine for 2-D hand-landmark streams.
//!
//! Turns per-frame hand landmarks into pinch, tap, hold, drag and static
//! pose events.  `ipc` carries the s-expression message codec used by the
//! `gesture-replay` binary.

pub mod gesture;
pub mod ipc;

pub use gesture::{GestureConfig, GestureEngine, GestureEvent, HandLandmarkFrame};
