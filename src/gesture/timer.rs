//! Deferred tap-commit timers.
//!
//! The engine owns exactly one `TapTimer`.  When it fires, the host must
//! call `GestureEngine::on_tap_timer`.  `CalloopTapTimer` does that from
//! a calloop timer source; `ManualTapTimer` leaves firing to the host
//! (usually through `GestureEngine::poll` with the frame clock).

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use tracing::trace;

use super::engine::GestureEngine;

/// A cancellable one-shot timer for the pending tap.
pub trait TapTimer {
    /// Arm the timer to fire after `delay`, replacing any armed deadline.
    fn arm(&mut self, delay: Duration) -> Result<(), TimerError>;
    /// Cancel the armed deadline, if any.
    fn disarm(&mut self);
}

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("failed to register tap timer: {0}")]
    Register(String),
}

// ── Manual timer ───────────────────────────────────────────

/// Timer whose firing is driven by the host.
///
/// Clones share state, so a host can keep one clone to observe what the
/// engine armed.
#[derive(Debug, Clone, Default)]
pub struct ManualTapTimer {
    armed: Rc<Cell<Option<Duration>>>,
}

impl ManualTapTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay of the currently armed deadline.
    pub fn armed(&self) -> Option<Duration> {
        self.armed.get()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.get().is_some()
    }
}

impl TapTimer for ManualTapTimer {
    fn arm(&mut self, delay: Duration) -> Result<(), TimerError> {
        self.armed.set(Some(delay));
        Ok(())
    }

    fn disarm(&mut self) {
        self.armed.set(None);
    }
}

// ── calloop timer ──────────────────────────────────────────

/// Timer backed by a calloop `Timer` source on the host's event loop.
///
/// `engine_of` locates the engine inside the loop's shared data when the
/// source fires.
pub struct CalloopTapTimer<D: 'static> {
    handle: LoopHandle<'static, D>,
    engine_of: fn(&mut D) -> &mut GestureEngine,
    token: Rc<Cell<Option<RegistrationToken>>>,
}

impl<D: 'static> CalloopTapTimer<D> {
    pub fn new(handle: LoopHandle<'static, D>, engine_of: fn(&mut D) -> &mut GestureEngine) -> Self {
        Self {
            handle,
            engine_of,
            token: Rc::new(Cell::new(None)),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.token.get().is_some()
    }
}

impl<D: 'static> TapTimer for CalloopTapTimer<D> {
    fn arm(&mut self, delay: Duration) -> Result<(), TimerError> {
        self.disarm();

        let slot = self.token.clone();
        let engine_of = self.engine_of;
        let token = self
            .handle
            .insert_source(Timer::from_duration(delay), move |_, _, data| {
                // The source drops itself; forget the token before the
                // engine tries to disarm it.
                slot.set(None);
                engine_of(data).on_tap_timer();
                TimeoutAction::Drop
            })
            .map_err(|e| TimerError::Register(e.error.to_string()))?;

        trace!("tap timer armed for {:?}", delay);
        self.token.set(Some(token));
        Ok(())
    }

    fn disarm(&mut self) {
        if let Some(token) = self.token.take() {
            trace!("tap timer disarmed");
            self.handle.remove(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use calloop::EventLoop;

    use super::*;
    use crate::gesture::config::GestureConfig;
    use crate::gesture::event::GestureEvent;
    use crate::gesture::landmarks::{pinch_hand, HandLandmarkFrame};

    struct Host {
        engine: GestureEngine,
    }

    fn host_engine(host: &mut Host) -> &mut GestureEngine {
        &mut host.engine
    }

    fn tap(engine: &mut GestureEngine) {
        for (i, d) in [0.02, 0.02, 0.02, 0.06, 0.06].iter().enumerate() {
            let frame = HandLandmarkFrame::new(16.0 * i as f64, vec![pinch_hand(*d, 0.5, 0.5)]);
            engine.update(&frame);
        }
    }

    fn calloop_host(
        event_loop: &EventLoop<'static, Host>,
    ) -> (Host, Rc<RefCell<Vec<GestureEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let engine = GestureEngine::builder()
            .config(GestureConfig {
                double_tap_window_ms: 5.0,
                ..Default::default()
            })
            .tap_timer(CalloopTapTimer::new(event_loop.handle(), host_engine))
            .on_event(move |e| sink.borrow_mut().push(e))
            .build()
            .unwrap();
        (Host { engine }, events)
    }

    fn tap_count(events: &Rc<RefCell<Vec<GestureEvent>>>) -> usize {
        events
            .borrow()
            .iter()
            .filter(|e| matches!(e, GestureEvent::Tap { .. }))
            .count()
    }

    #[test]
    fn test_manual_timer_clones_share_state() {
        let timer = ManualTapTimer::new();
        let mut engine_side = timer.clone();
        engine_side.arm(Duration::from_millis(330)).unwrap();
        assert_eq!(timer.armed(), Some(Duration::from_millis(330)));
        engine_side.disarm();
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_calloop_timer_commits_tap() {
        let mut event_loop: EventLoop<'static, Host> = EventLoop::try_new().unwrap();
        let (mut host, events) = calloop_host(&event_loop);

        tap(&mut host.engine);
        assert!(host.engine.pending_tap().is_some());
        assert_eq!(tap_count(&events), 0);

        for _ in 0..50 {
            event_loop
                .dispatch(Some(Duration::from_millis(10)), &mut host)
                .unwrap();
            if tap_count(&events) > 0 {
                break;
            }
        }
        assert_eq!(tap_count(&events), 1, "got {:?}", events.borrow());
        assert!(host.engine.pending_tap().is_none());
    }

    #[test]
    fn test_calloop_timer_cancelled_by_reset() {
        let mut event_loop: EventLoop<'static, Host> = EventLoop::try_new().unwrap();
        let (mut host, events) = calloop_host(&event_loop);

        tap(&mut host.engine);
        host.engine.reset();

        for _ in 0..5 {
            event_loop
                .dispatch(Some(Duration::from_millis(10)), &mut host)
                .unwrap();
        }
        assert_eq!(tap_count(&events), 0, "got {:?}", events.borrow());
    }
}
