//! Hand landmark frames as delivered by a 2-D hand-landmark detector.
//!
//! Models the 21 landmarks per hand of the MediaPipe hand landmarker.
//! Raw point lists are validated once, when a `HandLandmarks` is built;
//! everything downstream addresses landmarks through `HandLandmark`.

use tracing::{trace, warn};

// ── Landmark definitions ───────────────────────────────────

/// The 21 hand landmarks, in detector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Total number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

/// Hands beyond this count in a single frame are ignored.
pub const MAX_HANDS: usize = 2;

impl HandLandmark {
    /// Position of this landmark in the detector's point list (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// String representation for IPC.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb-cmc",
            Self::ThumbMcp => "thumb-mcp",
            Self::ThumbIp => "thumb-ip",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMcp => "index-mcp",
            Self::IndexPip => "index-pip",
            Self::IndexDip => "index-dip",
            Self::IndexTip => "index-tip",
            Self::MiddleMcp => "middle-mcp",
            Self::MiddlePip => "middle-pip",
            Self::MiddleDip => "middle-dip",
            Self::MiddleTip => "middle-tip",
            Self::RingMcp => "ring-mcp",
            Self::RingPip => "ring-pip",
            Self::RingDip => "ring-dip",
            Self::RingTip => "ring-tip",
            Self::PinkyMcp => "pinky-mcp",
            Self::PinkyPip => "pinky-pip",
            Self::PinkyDip => "pinky-dip",
            Self::PinkyTip => "pinky-tip",
        }
    }
}

// ── Fingers ────────────────────────────────────────────────

/// The four non-thumb fingers used by pose classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub fn tip(&self) -> HandLandmark {
        match self {
            Self::Index => HandLandmark::IndexTip,
            Self::Middle => HandLandmark::MiddleTip,
            Self::Ring => HandLandmark::RingTip,
            Self::Pinky => HandLandmark::PinkyTip,
        }
    }

    /// Proximal interphalangeal joint.
    pub fn pip(&self) -> HandLandmark {
        match self {
            Self::Index => HandLandmark::IndexPip,
            Self::Middle => HandLandmark::MiddlePip,
            Self::Ring => HandLandmark::RingPip,
            Self::Pinky => HandLandmark::PinkyPip,
        }
    }
}

// ── Handedness ─────────────────────────────────────────────

/// Which hand the detector believes it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Handedness {
    Left,
    Right,
    #[default]
    Unknown,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a detector category label ("Left", "right", ...).
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Unknown,
        }
    }
}

// ── Geometry ───────────────────────────────────────────────

/// A point in normalized image space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn midpoint(&self, other: Point) -> Point {
        Point {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// One detector landmark. `z` is carried through but never used for
/// classification.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    /// X coordinate (0.0 to 1.0, normalized to image width).
    pub x: f32,
    /// Y coordinate (0.0 to 1.0, normalized to image height, down is positive).
    pub y: f32,
    /// Relative depth, if the detector reported one.
    pub z: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: None }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f32::is_finite)
    }
}

// ── Errors ─────────────────────────────────────────────────

/// Why a raw point list could not become a hand.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("expected 21 landmarks, got {0}")]
    LandmarkCount(usize),
    #[error("landmark {index} has non-finite coordinates")]
    NonFinite { index: usize },
}

// ── Hand ───────────────────────────────────────────────────

/// A validated hand: exactly 21 finite landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    landmarks: [Landmark; LANDMARK_COUNT],
    handedness: Handedness,
}

impl HandLandmarks {
    /// Validate a raw point list coming from the detector.
    pub fn new(points: &[Landmark], handedness: Handedness) -> Result<Self, FrameError> {
        let landmarks: [Landmark; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| FrameError::LandmarkCount(points.len()))?;
        if let Some(index) = landmarks.iter().position(|lm| !lm.is_finite()) {
            return Err(FrameError::NonFinite { index });
        }
        Ok(Self {
            landmarks,
            handedness,
        })
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    pub fn landmark(&self, which: HandLandmark) -> Landmark {
        self.landmarks[which.index()]
    }

    pub fn point(&self, which: HandLandmark) -> Point {
        self.landmark(which).point()
    }

    /// Thumb-tip to index-tip distance.
    pub fn pinch_distance(&self) -> f32 {
        self.point(HandLandmark::ThumbTip)
            .distance(self.point(HandLandmark::IndexTip))
    }

    /// Pointer position: midpoint of thumb tip and index tip.
    pub fn cursor(&self) -> Point {
        self.point(HandLandmark::ThumbTip)
            .midpoint(self.point(HandLandmark::IndexTip))
    }

    /// Midpoint of wrist and middle-finger MCP.
    pub fn palm_center(&self) -> Point {
        self.point(HandLandmark::Wrist)
            .midpoint(self.point(HandLandmark::MiddleMcp))
    }
}

// ── Frame ──────────────────────────────────────────────────

/// Unvalidated detector output for one hand.
#[derive(Debug, Clone, Default)]
pub struct RawHand {
    pub points: Vec<Landmark>,
    pub handedness: Handedness,
}

/// One detector sample.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarkFrame {
    /// Monotonic timestamp in milliseconds.
    pub timestamp_ms: f64,
    hands: Vec<HandLandmarks>,
}

impl HandLandmarkFrame {
    /// Build a frame from validated hands; hands past `MAX_HANDS` are dropped.
    pub fn new(timestamp_ms: f64, mut hands: Vec<HandLandmarks>) -> Self {
        if hands.len() > MAX_HANDS {
            trace!("frame at {timestamp_ms:.1}ms: ignoring {} extra hands", hands.len() - MAX_HANDS);
            hands.truncate(MAX_HANDS);
        }
        Self {
            timestamp_ms,
            hands,
        }
    }

    /// A frame in which the detector found no hands.
    pub fn empty(timestamp_ms: f64) -> Self {
        Self::new(timestamp_ms, Vec::new())
    }

    /// Validate raw detector output.  Malformed hands are dropped, so a
    /// frame whose only hand is malformed behaves like a frame with no hand.
    pub fn from_raw(timestamp_ms: f64, raw: Vec<RawHand>) -> Self {
        let hands = raw
            .into_iter()
            .enumerate()
            .filter_map(|(i, hand)| match HandLandmarks::new(&hand.points, hand.handedness) {
                Ok(h) => Some(h),
                Err(e) => {
                    warn!("frame at {timestamp_ms:.1}ms: dropping hand {i}: {e}");
                    None
                }
            })
            .collect();
        Self::new(timestamp_ms, hands)
    }

    pub fn hands(&self) -> &[HandLandmarks] {
        &self.hands
    }

    /// The hand that drives pinch, tap and hold tracking.
    pub fn primary(&self) -> Option<&HandLandmarks> {
        self.hands.first()
    }

    /// Both hands, when two were detected.
    pub fn pair(&self) -> Option<(&HandLandmarks, &HandLandmarks)> {
        match self.hands.as_slice() {
            [a, b, ..] => Some((a, b)),
            _ => None,
        }
    }
}

// ── Test helpers ───────────────────────────────────────────

/// A hand with every landmark at (0.5, 0.5): no finger is extended or
/// folded and the pinch distance is zero.
#[cfg(test)]
pub(crate) fn neutral_points() -> Vec<Landmark> {
    vec![Landmark::new(0.5, 0.5); LANDMARK_COUNT]
}

#[cfg(test)]
pub(crate) fn set_point(points: &mut [Landmark], which: HandLandmark, x: f32, y: f32) {
    points[which.index()] = Landmark::new(x, y);
}

#[cfg(test)]
pub(crate) fn make_hand(points: &[Landmark]) -> HandLandmarks {
    HandLandmarks::new(points, Handedness::Right).unwrap()
}

/// Thumb and index tips `distance` apart, centred on `(x, y)`.
#[cfg(test)]
pub(crate) fn pinch_hand(distance: f32, x: f32, y: f32) -> HandLandmarks {
    let mut points = neutral_points();
    set_point(&mut points, HandLandmark::ThumbTip, x - distance / 2.0, y);
    set_point(&mut points, HandLandmark::IndexTip, x + distance / 2.0, y);
    make_hand(&points)
}

/// Four fingers straight up and spread, thumb well away from the index tip.
#[cfg(test)]
pub(crate) fn open_palm_hand() -> HandLandmarks {
    let mut points = neutral_points();
    set_point(&mut points, HandLandmark::Wrist, 0.45, 0.8);
    set_point(&mut points, HandLandmark::MiddleMcp, 0.45, 0.55);
    set_point(&mut points, HandLandmark::ThumbTip, 0.2, 0.5);
    set_point(&mut points, HandLandmark::IndexPip, 0.35, 0.45);
    set_point(&mut points, HandLandmark::IndexTip, 0.35, 0.3);
    set_point(&mut points, HandLandmark::MiddlePip, 0.43, 0.45);
    set_point(&mut points, HandLandmark::MiddleTip, 0.43, 0.28);
    set_point(&mut points, HandLandmark::RingPip, 0.51, 0.45);
    set_point(&mut points, HandLandmark::RingTip, 0.52, 0.3);
    set_point(&mut points, HandLandmark::PinkyPip, 0.58, 0.47);
    set_point(&mut points, HandLandmark::PinkyTip, 0.6, 0.33);
    make_hand(&points)
}

/// Extend `up` fingers and fold `down` fingers on an otherwise neutral hand.
#[cfg(test)]
pub(crate) fn finger_pose_hand(up: &[Finger], down: &[Finger]) -> HandLandmarks {
    let mut points = neutral_points();
    set_point(&mut points, HandLandmark::Wrist, 0.5, 0.8);
    set_point(&mut points, HandLandmark::MiddleMcp, 0.5, 0.5);
    set_point(&mut points, HandLandmark::ThumbTip, 0.3, 0.6);
    let x_of = |f: &Finger| match f {
        Finger::Index => 0.4,
        Finger::Middle => 0.47,
        Finger::Ring => 0.54,
        Finger::Pinky => 0.6,
    };
    for f in up {
        set_point(&mut points, f.pip(), x_of(f), 0.45);
        set_point(&mut points, f.tip(), x_of(f), 0.3);
    }
    for f in down {
        set_point(&mut points, f.pip(), x_of(f), 0.45);
        set_point(&mut points, f.tip(), x_of(f), 0.55);
    }
    make_hand(&points)
}

/// Half of a two-hand heart: index tip above thumb tip, 0.1 apart.
#[cfg(test)]
pub(crate) fn heart_half(x: f32) -> HandLandmarks {
    let mut points = neutral_points();
    set_point(&mut points, HandLandmark::IndexTip, x, 0.4);
    set_point(&mut points, HandLandmark::ThumbTip, x, 0.5);
    make_hand(&points)
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_indices() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::ThumbTip.index(), 4);
        assert_eq!(HandLandmark::IndexPip.index(), 6);
        assert_eq!(HandLandmark::IndexTip.index(), 8);
        assert_eq!(HandLandmark::MiddleMcp.index(), 9);
        assert_eq!(HandLandmark::RingPip.index(), 14);
        assert_eq!(HandLandmark::PinkyTip.index(), LANDMARK_COUNT - 1);
    }

    #[test]
    fn test_finger_joints() {
        assert_eq!(Finger::Middle.tip(), HandLandmark::MiddleTip);
        assert_eq!(Finger::Pinky.pip(), HandLandmark::PinkyPip);
        assert_eq!(HandLandmark::RingTip.as_str(), "ring-tip");
    }

    #[test]
    fn test_handedness_from_label() {
        assert_eq!(Handedness::from_label("Left"), Handedness::Left);
        assert_eq!(Handedness::from_label("RIGHT"), Handedness::Right);
        assert_eq!(Handedness::from_label("Unknown"), Handedness::Unknown);
        assert_eq!(Handedness::from_label(""), Handedness::Unknown);
    }

    #[test]
    fn test_hand_rejects_wrong_count() {
        let points = vec![Landmark::new(0.5, 0.5); 20];
        assert_eq!(
            HandLandmarks::new(&points, Handedness::Left),
            Err(FrameError::LandmarkCount(20)),
        );
    }

    #[test]
    fn test_hand_rejects_non_finite() {
        let mut points = neutral_points();
        points[7] = Landmark::new(f32::NAN, 0.5);
        assert_eq!(
            HandLandmarks::new(&points, Handedness::Left),
            Err(FrameError::NonFinite { index: 7 }),
        );

        let mut points = neutral_points();
        points[3].z = Some(f32::INFINITY);
        assert!(HandLandmarks::new(&points, Handedness::Left).is_err());
    }

    #[test]
    fn test_pinch_distance_and_cursor() {
        let hand = pinch_hand(0.04, 0.3, 0.6);
        assert!((hand.pinch_distance() - 0.04).abs() < 1e-6);
        let cursor = hand.cursor();
        assert!((cursor.x - 0.3).abs() < 1e-6);
        assert!((cursor.y - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_palm_center() {
        let hand = open_palm_hand();
        let center = hand.palm_center();
        assert!((center.x - 0.45).abs() < 1e-6);
        assert!((center.y - 0.675).abs() < 1e-6);
    }

    #[test]
    fn test_frame_from_raw_drops_malformed_hands() {
        let good = RawHand {
            points: neutral_points(),
            handedness: Handedness::Left,
        };
        let short = RawHand {
            points: vec![Landmark::new(0.1, 0.1); 5],
            handedness: Handedness::Right,
        };

        let frame = HandLandmarkFrame::from_raw(10.0, vec![short.clone(), good]);
        assert_eq!(frame.hands().len(), 1);
        assert_eq!(frame.primary().map(|h| h.handedness()), Some(Handedness::Left));

        let frame = HandLandmarkFrame::from_raw(20.0, vec![short]);
        assert!(frame.primary().is_none());
    }

    #[test]
    fn test_frame_keeps_at_most_two_hands() {
        let hands = vec![make_hand(&neutral_points()); 3];
        let frame = HandLandmarkFrame::new(0.0, hands);
        assert_eq!(frame.hands().len(), MAX_HANDS);
        assert!(frame.pair().is_some());
    }

    #[test]
    fn test_pair_requires_two_hands() {
        let frame = HandLandmarkFrame::new(0.0, vec![make_hand(&neutral_points())]);
        assert!(frame.pair().is_none());
        assert!(HandLandmarkFrame::empty(0.0).primary().is_none());
    }
}
