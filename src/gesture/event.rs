//! Events emitted by the gesture engine.

// ── Phase ──────────────────────────────────────────────────

/// Pinch state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Pinching,
    Holding,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Pinching => "PINCHING",
            Self::Holding => "HOLDING",
        }
    }
}

/// How a pinch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinchUpKind {
    /// Released before turning into a hold; a tap candidate.
    Tap,
    /// Released out of a hold.
    Release,
}

impl PinchUpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tap => "tap",
            Self::Release => "release",
        }
    }
}

/// Why a tap candidate was not reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapRejectReason {
    TooLong,
    Cooldown,
}

impl TapRejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooLong => "too_long",
            Self::Cooldown => "cooldown",
        }
    }
}

/// Static poses recognized while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseKind {
    /// Open palm.
    Confetti,
    /// Two hands forming a heart.
    Heart,
    Peace,
    RockOn,
}

impl PoseKind {
    pub const ALL: [PoseKind; 4] = [Self::Confetti, Self::Heart, Self::Peace, Self::RockOn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confetti => "confetti",
            Self::Heart => "heart",
            Self::Peace => "peace",
            Self::RockOn => "rock_on",
        }
    }

    pub(crate) fn slot(&self) -> usize {
        *self as usize
    }
}

// ── Events ─────────────────────────────────────────────────

/// Events emitted by gesture recognition, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    /// A pinch engaged at cursor `(x, y)`.
    PinchDown { x: f32, y: f32, pinch_distance: f32 },
    /// A pinch released.  `duration_ms` is set for tap candidates.
    PinchUp {
        kind: PinchUpKind,
        duration_ms: Option<f64>,
        pinch_distance: f32,
    },
    /// A single tap, reported once the double-tap window has passed.
    Tap { duration_ms: f64 },
    DoubleTap { duration_ms: f64 },
    TapRejected {
        reason: TapRejectReason,
        duration_ms: Option<f64>,
    },
    /// A pinch turned into a hold at cursor `(x, y)`.
    HoldStart { x: f32, y: f32 },
    HoldEnd,
    /// The tracked hand disappeared while a pinch or hold was active.
    HandLost { from: Phase },
    /// Cursor moved past the deadzone during a hold.
    Drag { dx: f32, dy: f32, x: f32, y: f32 },
    /// Hold continues without leaving the deadzone.
    Holding { x: f32, y: f32 },
    /// A static pose was held long enough.
    Pose { kind: PoseKind, x: f32, y: f32 },
}

impl GestureEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PinchDown { .. } => "pinch_down",
            Self::PinchUp { .. } => "pinch_up",
            Self::Tap { .. } => "tap",
            Self::DoubleTap { .. } => "double_tap",
            Self::TapRejected { .. } => "tap_rejected",
            Self::HoldStart { .. } => "hold_start",
            Self::HoldEnd => "hold_end",
            Self::HandLost { .. } => "hand_lost",
            Self::Drag { .. } => "drag",
            Self::Holding { .. } => "holding",
            Self::Pose { kind, .. } => kind.as_str(),
        }
    }
}
