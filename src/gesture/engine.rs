//! Gesture engine: the pinch state machine that ties the detectors together.
//!
//! Feeds one landmark frame at a time through the pinch hysteresis and the
//! pose classifier, drives the `Idle` / `Pinching` / `Holding` state
//! machine, and emits events synchronously to the registered sink.  The
//! only asynchronous output is the deferred single-tap commit, delivered
//! when the host fires the tap timer.

use tracing::{debug, trace, warn};

use super::config::{ConfigError, GestureConfig, GestureConfigPatch};
use super::event::{GestureEvent, Phase, PinchUpKind};
use super::hold::HoldTracker;
use super::landmarks::{HandLandmarkFrame, Point};
use super::pinch::PinchHysteresis;
use super::pose::PoseClassifier;
use super::tap::{PendingTap, TapDisambiguator, TapOutcome};
use super::timer::{ManualTapTimer, TapTimer};

type EventSink = Box<dyn FnMut(GestureEvent)>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("gesture engine requires an event sink")]
    MissingEventSink,
    #[error("invalid gesture config: {0}")]
    Config(#[from] ConfigError),
}

// ── Builder ────────────────────────────────────────────────

/// Builder for `GestureEngine`.  An event sink is mandatory; the tap timer
/// defaults to a `ManualTapTimer`.
#[derive(Default)]
pub struct GestureEngineBuilder {
    config: GestureConfig,
    sink: Option<EventSink>,
    timer: Option<Box<dyn TapTimer>>,
}

impl GestureEngineBuilder {
    pub fn config(mut self, config: GestureConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the single event listener.
    pub fn on_event<F>(mut self, sink: F) -> Self
    where
        F: FnMut(GestureEvent) + 'static,
    {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn tap_timer<T>(mut self, timer: T) -> Self
    where
        T: TapTimer + 'static,
    {
        self.timer = Some(Box::new(timer));
        self
    }

    pub fn build(self) -> Result<GestureEngine, EngineError> {
        let sink = self.sink.ok_or(EngineError::MissingEventSink)?;
        self.config.validate()?;
        Ok(GestureEngine {
            config: self.config,
            phase: Phase::Idle,
            pinch_started_at_ms: 0.0,
            last_cursor: None,
            pinch: PinchHysteresis::new(),
            taps: TapDisambiguator::new(),
            hold: HoldTracker::new(),
            poses: PoseClassifier::new(),
            sink,
            timer: self
                .timer
                .unwrap_or_else(|| Box::new(ManualTapTimer::new())),
        })
    }
}

// ── Engine ─────────────────────────────────────────────────

/// Per-session gesture recognition state.
pub struct GestureEngine {
    config: GestureConfig,
    phase: Phase,
    pinch_started_at_ms: f64,
    last_cursor: Option<Point>,
    pinch: PinchHysteresis,
    taps: TapDisambiguator,
    hold: HoldTracker,
    poses: PoseClassifier,
    sink: EventSink,
    timer: Box<dyn TapTimer>,
}

impl GestureEngine {
    pub fn builder() -> GestureEngineBuilder {
        GestureEngineBuilder::default()
    }

    /// Process one detector frame.  A pending tap whose deadline has passed
    /// in frame time is committed first, whatever timer the host installed.
    pub fn update(&mut self, frame: &HandLandmarkFrame) {
        self.poll(frame.timestamp_ms);

        let Some(hand) = frame.primary() else {
            self.lose_hand();
            return;
        };

        let now = frame.timestamp_ms;
        let pinch_distance = hand.pinch_distance();
        let pinching = self.pinch.update(pinch_distance, &self.config);
        let cursor = hand.cursor();
        trace!(
            "frame {now:.1}ms: phase={} d={pinch_distance:.4} pinching={pinching}",
            self.phase.as_str()
        );

        if self.phase == Phase::Idle && !pinching {
            for event in self.poses.evaluate(frame, &self.config) {
                self.emit(event);
            }
        } else {
            self.poses.clear_counts();
        }

        match self.phase {
            Phase::Idle => {
                if pinching {
                    self.phase = Phase::Pinching;
                    self.pinch_started_at_ms = now;
                    self.last_cursor = Some(cursor);
                    debug!("Pinch down at ({:.3}, {:.3})", cursor.x, cursor.y);
                    self.emit(GestureEvent::PinchDown {
                        x: cursor.x,
                        y: cursor.y,
                        pinch_distance,
                    });
                }
            }
            Phase::Pinching => {
                if !pinching {
                    let duration_ms = (now - self.pinch_started_at_ms).max(0.0);
                    self.emit(GestureEvent::PinchUp {
                        kind: PinchUpKind::Tap,
                        duration_ms: Some(duration_ms),
                        pinch_distance,
                    });
                    self.phase = Phase::Idle;
                    self.pinch_started_at_ms = 0.0;
                    self.last_cursor = None;
                    self.register_tap(now, duration_ms);
                } else if now - self.pinch_started_at_ms >= self.config.hold_ms {
                    self.phase = Phase::Holding;
                    self.last_cursor = Some(cursor);
                    self.hold.start(cursor);
                    debug!("Hold started at ({:.3}, {:.3})", cursor.x, cursor.y);
                    self.emit(GestureEvent::HoldStart {
                        x: cursor.x,
                        y: cursor.y,
                    });
                }
            }
            Phase::Holding => {
                if !pinching {
                    self.emit(GestureEvent::HoldEnd);
                    self.emit(GestureEvent::PinchUp {
                        kind: PinchUpKind::Release,
                        duration_ms: None,
                        pinch_distance,
                    });
                    debug!("Hold released");
                    self.pinch.reset();
                    self.hold.end();
                    self.phase = Phase::Idle;
                    self.pinch_started_at_ms = 0.0;
                    self.last_cursor = None;
                } else {
                    let event = self.hold.track(cursor, self.config.drag_deadzone);
                    self.last_cursor = Some(cursor);
                    self.emit(event);
                }
            }
        }
    }

    /// The tap timer fired: commit the pending tap, if one is still waiting.
    pub fn on_tap_timer(&mut self) {
        self.timer.disarm();
        if let Some(duration_ms) = self.taps.commit() {
            debug!("Tap committed ({duration_ms:.0}ms)");
            self.emit(GestureEvent::Tap { duration_ms });
        }
    }

    /// Fire the tap timer from the frame clock: commits the pending tap once
    /// `now_ms` has reached its deadline.
    pub fn poll(&mut self, now_ms: f64) {
        if self
            .taps
            .pending()
            .is_some_and(|pending| now_ms >= pending.deadline_ms)
        {
            self.on_tap_timer();
        }
    }

    /// Merge `patch` into the live config.  Takes effect on the next
    /// `update`; phase, counters and any pending tap are untouched.  A patch
    /// that would leave the config invalid is refused as a whole.
    pub fn set_config(&mut self, patch: &GestureConfigPatch) -> Result<(), ConfigError> {
        let next = self.config.merged(patch);
        if let Err(e) = next.validate() {
            warn!("Rejected gesture config patch: {e}");
            return Err(e);
        }
        debug!("Gesture config updated");
        self.config = next;
        Ok(())
    }

    /// Forget all recognition state and cancel the tap timer.  The config is
    /// kept and no events are emitted.
    pub fn reset(&mut self) {
        self.timer.disarm();
        self.taps.reset();
        self.pinch.reset();
        self.poses.reset();
        self.hold.end();
        self.phase = Phase::Idle;
        self.pinch_started_at_ms = 0.0;
        self.last_cursor = None;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Logical pinch state from the hysteresis detector.
    pub fn is_pinching(&self) -> bool {
        self.pinch.is_pinching()
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn pending_tap(&self) -> Option<&PendingTap> {
        self.taps.pending()
    }

    /// Cursor at pinch start, or the latest cursor while holding.
    pub fn last_cursor(&self) -> Option<Point> {
        self.last_cursor
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        let pending = self
            .taps
            .pending()
            .map(|p| format!("(:at {:.1} :deadline {:.1})", p.at_ms, p.deadline_ms))
            .unwrap_or_else(|| "nil".to_string());
        let last_tap = self
            .taps
            .last_tap_at_ms()
            .map(|t| format!("{t:.1}"))
            .unwrap_or_else(|| "nil".to_string());
        let cursor = self
            .last_cursor
            .map(|c| format!("({:.3} {:.3})", c.x, c.y))
            .unwrap_or_else(|| "nil".to_string());
        format!(
            "(:phase :{} :pinching {} :down-count {} :up-count {} :cursor {} :pending-tap {} :last-tap {})",
            self.phase.as_str().to_ascii_lowercase(),
            if self.pinch.is_pinching() { "t" } else { "nil" },
            self.pinch.down_count(),
            self.pinch.up_count(),
            cursor,
            pending,
            last_tap,
        )
    }

    fn register_tap(&mut self, now: f64, duration_ms: f64) {
        match self.taps.register(now, duration_ms, &self.config) {
            TapOutcome::Rejected {
                reason,
                duration_ms,
            } => {
                debug!("Tap rejected: {}", reason.as_str());
                self.emit(GestureEvent::TapRejected {
                    reason,
                    duration_ms,
                });
            }
            TapOutcome::DoubleTap { duration_ms } => {
                self.timer.disarm();
                debug!("Double tap ({duration_ms:.0}ms)");
                self.emit(GestureEvent::DoubleTap { duration_ms });
            }
            TapOutcome::Pending { delay } => {
                if let Err(e) = self.timer.arm(delay) {
                    warn!("{e}; committing tap without waiting for a second one");
                    self.on_tap_timer();
                }
            }
        }
    }

    /// No hand in this frame: abandon any pinch, hold or pending tap.
    fn lose_hand(&mut self) {
        if self.phase != Phase::Idle {
            debug!("Hand lost while {}", self.phase.as_str());
            self.emit(GestureEvent::HandLost { from: self.phase });
        }
        self.timer.disarm();
        self.taps.reset();
        self.pinch.reset();
        self.poses.clear_counts();
        self.hold.end();
        self.phase = Phase::Idle;
        self.pinch_started_at_ms = 0.0;
        self.last_cursor = None;
    }

    fn emit(&mut self, event: GestureEvent) {
        (self.sink)(event);
    }
}

impl Drop for GestureEngine {
    fn drop(&mut self) {
        self.timer.disarm();
    }
}

// ── Tests ──────────────────────────────────────────────────
