//! gesture-replay - feed recorded hand-landmark frames through the gesture engine
//!
//! Reads one s-expression message per line and prints the resulting
//! gesture events and responses to stdout.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use clap::Parser;
use tracing::{info, warn};

use gesture_engine::gesture::{CalloopTapTimer, GestureConfig, GestureEngine, GestureEvent};
use gesture_engine::ipc::dispatch::{self, error_response, event_sexp, Message, MessageError};

#[derive(Parser, Debug)]
#[command(name = "gesture-replay", about = "Replay hand-landmark frames through the gesture engine")]
struct Cli {
    /// Message file, one s-expression per line (`;` starts a comment line)
    input: PathBuf,

    /// Gesture config plist merged over the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pace frames by their timestamps instead of replaying as fast as possible
    #[arg(long)]
    realtime: bool,
}

type Line = (usize, Result<Message, MessageError>);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gesture_engine=info,gesture_replay=info".into()),
        )
        .init();

    info!("gesture-replay v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;
    let lines = read_messages(&cli.input)?;
    info!("{} messages from {}", lines.len(), cli.input.display());

    if cli.realtime {
        replay_realtime(config, lines)
    } else {
        replay_frame_clock(config, lines)
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GestureConfig> {
    let Some(path) = path else {
        return Ok(GestureConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let value = lexpr::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    let patch = dispatch::parse_config_patch(&value)
        .with_context(|| format!("invalid config {}", path.display()))?;
    let config = GestureConfig::default().merged(&patch);
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    info!("config loaded from {}", path.display());
    Ok(config)
}

fn read_messages(path: &Path) -> anyhow::Result<Vec<Line>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with(';'))
        .map(|(n, line)| (n, dispatch::parse_message(line)))
        .collect())
}

fn print_event(event: GestureEvent) {
    println!("{}", event_sexp(&event));
}

fn feed(engine: &mut GestureEngine, line: usize, message: Result<Message, MessageError>) {
    match message {
        Ok(message) => {
            if let Some(response) = dispatch::dispatch(engine, message) {
                println!("{response}");
            }
        }
        Err(e) => {
            warn!("line {line}: {e}");
            println!("{}", error_response(0, &e.to_string()));
        }
    }
}

// ── Frame clock ────────────────────────────────────────────

/// Replay as fast as possible; pending taps commit on frame timestamps.
fn replay_frame_clock(config: GestureConfig, lines: Vec<Line>) -> anyhow::Result<()> {
    let mut engine = GestureEngine::builder()
        .config(config)
        .on_event(print_event)
        .build()?;

    for (line, message) in lines {
        feed(&mut engine, line, message);
    }

    // Input ended inside a double-tap window: let the window run out.
    if let Some(deadline) = engine.pending_tap().map(|p| p.deadline_ms) {
        engine.poll(deadline);
    }
    Ok(())
}

// ── Real time ──────────────────────────────────────────────

struct Replay {
    engine: GestureEngine,
    lines: VecDeque<Line>,
    /// Wall-clock start and timestamp of the first frame.
    origin: Option<(Instant, f64)>,
}

fn replay_engine(replay: &mut Replay) -> &mut GestureEngine {
    &mut replay.engine
}

impl Replay {
    /// Time until the next message is due; non-frame messages are due at once.
    fn next_wait(&mut self) -> Option<Duration> {
        let (_, message) = self.lines.front()?;
        let Ok(Message::Frame(frame)) = message else {
            return Some(Duration::ZERO);
        };
        let (started, first_ms) = *self
            .origin
            .get_or_insert_with(|| (Instant::now(), frame.timestamp_ms));
        let offset_ms = (frame.timestamp_ms - first_ms).max(0.0);
        let offset = Duration::from_micros((offset_ms * 1000.0).round() as u64);
        Some(offset.saturating_sub(started.elapsed()))
    }

    fn feed_due(&mut self) {
        while self.next_wait() == Some(Duration::ZERO) {
            if let Some((line, message)) = self.lines.pop_front() {
                feed(&mut self.engine, line, message);
            }
        }
    }

    fn finished(&self) -> bool {
        self.lines.is_empty() && self.engine.pending_tap().is_none()
    }
}

/// Replay on a calloop event loop, pacing frames by their timestamps.  The
/// tap timer is a real calloop timer.
fn replay_realtime(config: GestureConfig, lines: Vec<Line>) -> anyhow::Result<()> {
    let mut event_loop: EventLoop<'static, Replay> =
        EventLoop::try_new().context("failed to create event loop")?;

    let engine = GestureEngine::builder()
        .config(config)
        .tap_timer(CalloopTapTimer::new(event_loop.handle(), replay_engine))
        .on_event(print_event)
        .build()?;
    let mut replay = Replay {
        engine,
        lines: lines.into(),
        origin: None,
    };

    event_loop
        .handle()
        .insert_source(Timer::immediate(), |_, _, replay: &mut Replay| {
            replay.feed_due();
            match replay.next_wait() {
                Some(wait) => TimeoutAction::ToDuration(wait),
                None => TimeoutAction::Drop,
            }
        })
        .map_err(|e| anyhow::anyhow!("failed to insert frame timer: {}", e.error))?;

    while !replay.finished() {
        event_loop.dispatch(Some(Duration::from_millis(16)), &mut replay)?;
    }

    info!("replay finished");
    Ok(())
}
