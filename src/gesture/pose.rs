//! Static pose recognition: open palm, peace, rock-on and two-hand heart.
//!
//! Each pose has a per-frame predicate, a consecutive-frame hold count and
//! its own cooldown clock.  A failed predicate resets that pose's counter
//! immediately.  Firing any pose clears every counter, so one held shape
//! produces one event per recognition episode.

use tracing::debug;

use super::config::GestureConfig;
use super::event::{GestureEvent, PoseKind};
use super::landmarks::{Finger, HandLandmark, HandLandmarkFrame, HandLandmarks, Point};

// ── Predicates ─────────────────────────────────────────────

/// Tip clearly above the PIP joint (image y grows downward).
pub fn is_finger_extended(hand: &HandLandmarks, finger: Finger, slack: f32) -> bool {
    hand.landmark(finger.tip()).y + slack < hand.landmark(finger.pip()).y
}

/// Tip clearly below the PIP joint.
pub fn is_finger_folded(hand: &HandLandmarks, finger: Finger, slack: f32) -> bool {
    hand.landmark(finger.tip()).y - slack > hand.landmark(finger.pip()).y
}

pub fn is_open_palm(hand: &HandLandmarks, config: &GestureConfig) -> bool {
    if hand.pinch_distance() < config.pinch_threshold_up {
        return false;
    }
    let slack = config.finger_extend_slack;
    let all_extended = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky]
        .iter()
        .all(|f| is_finger_extended(hand, *f, slack));
    if !all_extended {
        return false;
    }
    let spread = hand
        .point(HandLandmark::IndexTip)
        .distance(hand.point(HandLandmark::PinkyTip));
    spread >= config.open_palm_min_spread
}

pub fn is_peace(hand: &HandLandmarks, config: &GestureConfig) -> bool {
    let slack = config.finger_extend_slack;
    is_finger_extended(hand, Finger::Index, slack)
        && is_finger_extended(hand, Finger::Middle, slack)
        && is_finger_folded(hand, Finger::Ring, slack)
        && is_finger_folded(hand, Finger::Pinky, slack)
}

pub fn is_rock_on(hand: &HandLandmarks, config: &GestureConfig) -> bool {
    let slack = config.finger_extend_slack;
    is_finger_extended(hand, Finger::Index, slack)
        && is_finger_extended(hand, Finger::Pinky, slack)
        && is_finger_folded(hand, Finger::Middle, slack)
        && is_finger_folded(hand, Finger::Ring, slack)
}

/// Index tips and thumb tips of both hands touching, with each hand's own
/// thumb and index kept apart (a double pinch is not a heart).
pub fn is_heart(a: &HandLandmarks, b: &HandLandmarks, config: &GestureConfig) -> bool {
    let index_gap = a
        .point(HandLandmark::IndexTip)
        .distance(b.point(HandLandmark::IndexTip));
    let thumb_gap = a
        .point(HandLandmark::ThumbTip)
        .distance(b.point(HandLandmark::ThumbTip));
    index_gap <= config.heart_index_dist
        && thumb_gap <= config.heart_thumb_dist
        && a.pinch_distance() >= config.heart_min_pinch
        && b.pinch_distance() >= config.heart_min_pinch
}

// ── Classifier ─────────────────────────────────────────────

/// Hold counters and cooldown clocks, one slot per `PoseKind`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseClassifier {
    counts: [u32; 4],
    last_fired_ms: [Option<f64>; 4],
}

impl PoseClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate every pose for one idle, non-pinching frame.
    pub fn evaluate(
        &mut self,
        frame: &HandLandmarkFrame,
        config: &GestureConfig,
    ) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        let now = frame.timestamp_ms;

        if let Some(hand) = frame.primary() {
            let palm = hand.palm_center();
            let single = [
                (PoseKind::Confetti, is_open_palm(hand, config)),
                (PoseKind::Peace, is_peace(hand, config)),
                (PoseKind::RockOn, is_rock_on(hand, config)),
            ];
            for (kind, matched) in single {
                if let Some(event) = self.observe(kind, matched, palm, now, config) {
                    events.push(event);
                }
            }
        }

        match frame.pair() {
            Some((a, b)) => {
                let anchor = a
                    .point(HandLandmark::IndexTip)
                    .midpoint(b.point(HandLandmark::IndexTip));
                let matched = is_heart(a, b, config);
                if let Some(event) = self.observe(PoseKind::Heart, matched, anchor, now, config) {
                    events.push(event);
                }
            }
            None => self.counts[PoseKind::Heart.slot()] = 0,
        }

        events
    }

    fn observe(
        &mut self,
        kind: PoseKind,
        matched: bool,
        anchor: Point,
        now: f64,
        config: &GestureConfig,
    ) -> Option<GestureEvent> {
        let slot = kind.slot();
        if !matched {
            self.counts[slot] = 0;
            return None;
        }

        self.counts[slot] += 1;
        if self.counts[slot] < required_frames(kind, config) {
            return None;
        }
        if let Some(last) = self.last_fired_ms[slot] {
            if now - last < config.pose_cooldown_ms {
                return None;
            }
        }

        self.last_fired_ms[slot] = Some(now);
        self.clear_counts();
        debug!("Pose recognized: {} at ({:.3}, {:.3})", kind.as_str(), anchor.x, anchor.y);
        Some(GestureEvent::Pose {
            kind,
            x: anchor.x,
            y: anchor.y,
        })
    }

    /// Consecutive matching frames seen so far for `kind`.
    pub fn count(&self, kind: PoseKind) -> u32 {
        self.counts[kind.slot()]
    }

    pub fn last_fired_ms(&self, kind: PoseKind) -> Option<f64> {
        self.last_fired_ms[kind.slot()]
    }

    /// Zero every hold counter; cooldown clocks are kept.
    pub fn clear_counts(&mut self) {
        self.counts = [0; 4];
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn required_frames(kind: PoseKind, config: &GestureConfig) -> u32 {
    match kind {
        PoseKind::Confetti => config.confetti_hold_frames,
        PoseKind::Heart => config.heart_hold_frames,
        PoseKind::Peace => config.peace_hold_frames,
        PoseKind::RockOn => config.rock_hold_frames,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::landmarks::{
        finger_pose_hand, heart_half, make_hand, neutral_points, open_palm_hand, pinch_hand,
    };

    fn frame(t: f64, hands: Vec<HandLandmarks>) -> HandLandmarkFrame {
        HandLandmarkFrame::new(t, hands)
    }

    fn run(
        poses: &mut PoseClassifier,
        config: &GestureConfig,
        start_ms: f64,
        n: usize,
        hands: &[HandLandmarks],
    ) -> Vec<GestureEvent> {
        (0..n)
            .flat_map(|i| poses.evaluate(&frame(start_ms + 16.0 * i as f64, hands.to_vec()), config))
            .collect()
    }

    #[test]
    fn test_open_palm_predicate() {
        let config = GestureConfig::default();
        assert!(is_open_palm(&open_palm_hand(), &config));
        assert!(!is_open_palm(&make_hand(&neutral_points()), &config));
        // Pinching hand is never an open palm
        assert!(!is_open_palm(&pinch_hand(0.02, 0.5, 0.5), &config));
    }

    #[test]
    fn test_open_palm_needs_spread() {
        let config = GestureConfig {
            open_palm_min_spread: 0.5,
            ..Default::default()
        };
        assert!(!is_open_palm(&open_palm_hand(), &config));
    }

    #[test]
    fn test_peace_and_rock_predicates() {
        let config = GestureConfig::default();
        let peace = finger_pose_hand(
            &[Finger::Index, Finger::Middle],
            &[Finger::Ring, Finger::Pinky],
        );
        let rock = finger_pose_hand(
            &[Finger::Index, Finger::Pinky],
            &[Finger::Middle, Finger::Ring],
        );
        assert!(is_peace(&peace, &config));
        assert!(!is_rock_on(&peace, &config));
        assert!(is_rock_on(&rock, &config));
        assert!(!is_peace(&rock, &config));
        assert!(!is_open_palm(&peace, &config));
    }

    #[test]
    fn test_finger_slack() {
        let config = GestureConfig::default();
        let hand = make_hand(&neutral_points());
        assert!(!is_finger_extended(&hand, Finger::Index, config.finger_extend_slack));
        assert!(!is_finger_folded(&hand, Finger::Index, config.finger_extend_slack));
    }

    #[test]
    fn test_heart_predicate() {
        let config = GestureConfig::default();
        assert!(is_heart(&heart_half(0.48), &heart_half(0.52), &config));
        // Hands too far apart
        assert!(!is_heart(&heart_half(0.3), &heart_half(0.7), &config));
        // Double pinch is excluded
        assert!(!is_heart(
            &pinch_hand(0.01, 0.49, 0.45),
            &pinch_hand(0.01, 0.51, 0.45),
            &config
        ));
    }

    #[test]
    fn test_confetti_fires_at_hold_frames() {
        let config = GestureConfig::default();
        let mut poses = PoseClassifier::new();
        let n = config.confetti_hold_frames as usize;
        let events = run(&mut poses, &config, 0.0, n, &[open_palm_hand()]);
        assert_eq!(events.len(), 1, "got {events:?}");
        match events[0] {
            GestureEvent::Pose { kind, x, y } => {
                assert_eq!(kind, PoseKind::Confetti);
                assert!((x - 0.45).abs() < 1e-6);
                assert!((y - 0.675).abs() < 1e-6);
            }
            ref other => panic!("expected confetti, got {other:?}"),
        }
        assert_eq!(poses.count(PoseKind::Confetti), 0);
    }

    #[test]
    fn test_interrupted_pose_does_not_fire() {
        let config = GestureConfig::default();
        let mut poses = PoseClassifier::new();
        let n = config.confetti_hold_frames as usize - 1;
        let mut events = run(&mut poses, &config, 0.0, n, &[open_palm_hand()]);
        events.extend(run(&mut poses, &config, 200.0, 1, &[make_hand(&neutral_points())]));
        events.extend(run(&mut poses, &config, 300.0, n, &[open_palm_hand()]));
        assert!(events.is_empty(), "got {events:?}");
    }

    #[test]
    fn test_pose_cooldown() {
        let config = GestureConfig::default();
        let mut poses = PoseClassifier::new();
        let n = config.confetti_hold_frames as usize;
        assert_eq!(run(&mut poses, &config, 0.0, n, &[open_palm_hand()]).len(), 1);

        // Still inside the cooldown: the counter reaches the target but
        // nothing fires.
        assert!(run(&mut poses, &config, 200.0, n, &[open_palm_hand()]).is_empty());

        let events = run(&mut poses, &config, 2000.0, 1, &[open_palm_hand()]);
        assert_eq!(events.len(), 1, "got {events:?}");
        assert_eq!(poses.last_fired_ms(PoseKind::Confetti), Some(2000.0));
    }

    #[test]
    fn test_cooldowns_are_per_kind() {
        let config = GestureConfig::default();
        let mut poses = PoseClassifier::new();
        let peace = finger_pose_hand(
            &[Finger::Index, Finger::Middle],
            &[Finger::Ring, Finger::Pinky],
        );
        run(&mut poses, &config, 0.0, config.confetti_hold_frames as usize, &[open_palm_hand()]);
        let events = run(&mut poses, &config, 150.0, config.peace_hold_frames as usize, &[peace]);
        assert!(
            matches!(events.as_slice(), [GestureEvent::Pose { kind: PoseKind::Peace, .. }]),
            "got {events:?}"
        );
    }

    #[test]
    fn test_rock_on_fires() {
        let config = GestureConfig::default();
        let mut poses = PoseClassifier::new();
        let rock = finger_pose_hand(
            &[Finger::Index, Finger::Pinky],
            &[Finger::Middle, Finger::Ring],
        );
        let events = run(&mut poses, &config, 0.0, config.rock_hold_frames as usize, &[rock]);
        assert!(
            matches!(events.as_slice(), [GestureEvent::Pose { kind: PoseKind::RockOn, .. }]),
            "got {events:?}"
        );
    }

    #[test]
    fn test_heart_fires_with_two_hands() {
        let config = GestureConfig::default();
        let mut poses = PoseClassifier::new();
        let hands = [heart_half(0.48), heart_half(0.52)];
        let events = run(&mut poses, &config, 0.0, config.heart_hold_frames as usize, &hands);
        assert_eq!(events.len(), 1, "got {events:?}");
        match events[0] {
            GestureEvent::Pose { kind, x, y } => {
                assert_eq!(kind, PoseKind::Heart);
                assert!((x - 0.5).abs() < 1e-6);
                assert!((y - 0.4).abs() < 1e-6);
            }
            ref other => panic!("expected heart, got {other:?}"),
        }
    }

    #[test]
    fn test_heart_counter_resets_without_second_hand() {
        let config = GestureConfig::default();
        let mut poses = PoseClassifier::new();
        let hands = [heart_half(0.48), heart_half(0.52)];
        run(&mut poses, &config, 0.0, 3, &hands);
        assert_eq!(poses.count(PoseKind::Heart), 3);
        run(&mut poses, &config, 100.0, 1, &[heart_half(0.48)]);
        assert_eq!(poses.count(PoseKind::Heart), 0);
    }
}
