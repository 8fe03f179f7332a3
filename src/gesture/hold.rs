//! Drag tracking during a held pinch.

use super::event::GestureEvent;
use super::landmarks::Point;

/// Drag anchor for an active hold.
///
/// The anchor only moves when the cursor leaves the deadzone, so slow
/// sub-deadzone jitter never accumulates into anchor creep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoldTracker {
    anchor: Option<Point>,
}

impl HoldTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a hold anchored at `at`.
    pub fn start(&mut self, at: Point) {
        self.anchor = Some(at);
    }

    /// Report the cursor for one held frame: `Drag` past the deadzone,
    /// `Holding` otherwise.
    pub fn track(&mut self, cursor: Point, deadzone: f32) -> GestureEvent {
        let anchor = *self.anchor.get_or_insert(cursor);
        let dx = cursor.x - anchor.x;
        let dy = cursor.y - anchor.y;

        if dx.abs() > deadzone || dy.abs() > deadzone {
            self.anchor = Some(cursor);
            GestureEvent::Drag {
                dx,
                dy,
                x: cursor.x,
                y: cursor.y,
            }
        } else {
            GestureEvent::Holding {
                x: cursor.x,
                y: cursor.y,
            }
        }
    }

    pub fn anchor(&self) -> Option<Point> {
        self.anchor
    }

    pub fn end(&mut self) {
        self.anchor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_past_deadzone_moves_anchor() {
        let mut hold = HoldTracker::new();
        hold.start(Point::new(0.5, 0.5));
        match hold.track(Point::new(0.51, 0.5), 0.005) {
            GestureEvent::Drag { dx, dy, x, y } => {
                assert!((dx - 0.01).abs() < 1e-5);
                assert!(dy.abs() < 1e-6);
                assert_eq!((x, y), (0.51, 0.5));
            }
            other => panic!("expected drag, got {other:?}"),
        }
        assert_eq!(hold.anchor(), Some(Point::new(0.51, 0.5)));
    }

    #[test]
    fn test_jitter_inside_deadzone_does_not_creep() {
        let mut hold = HoldTracker::new();
        hold.start(Point::new(0.5, 0.5));
        for step in 1..=4 {
            let cursor = Point::new(0.5 + 0.001 * step as f32, 0.5);
            assert!(matches!(
                hold.track(cursor, 0.005),
                GestureEvent::Holding { .. }
            ));
            assert_eq!(hold.anchor(), Some(Point::new(0.5, 0.5)));
        }
        // Accumulated offset finally crosses the deadzone relative to the
        // original anchor.
        assert!(matches!(
            hold.track(Point::new(0.506, 0.5), 0.005),
            GestureEvent::Drag { .. }
        ));
    }

    #[test]
    fn test_vertical_drag() {
        let mut hold = HoldTracker::new();
        hold.start(Point::new(0.2, 0.2));
        assert!(matches!(
            hold.track(Point::new(0.2, 0.19), 0.005),
            GestureEvent::Drag { .. }
        ));
    }

    #[test]
    fn test_end_clears_anchor() {
        let mut hold = HoldTracker::new();
        hold.start(Point::new(0.2, 0.2));
        hold.end();
        assert_eq!(hold.anchor(), None);
    }
}
