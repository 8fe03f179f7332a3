//! IPC message dispatch: parse s-expressions and route them to the engine.

use lexpr::Value;
use tracing::{debug, warn};

use crate::gesture::{
    GestureConfigPatch, GestureEngine, GestureEvent, HandLandmarkFrame, Handedness, Landmark,
    PinchUpKind, RawHand, LANDMARK_COUNT,
};

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// One detector frame.  Produces events, never a response.
    Frame(HandLandmarkFrame),
    GestureConfig { id: i64, patch: GestureConfigPatch },
    GestureStatus { id: i64 },
    GestureReset { id: i64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MessageError {
    #[error("malformed s-expression: {0}")]
    Malformed(String),
    #[error("missing :type")]
    MissingType,
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("missing :{0}")]
    MissingField(&'static str),
    #[error("invalid :{0}")]
    InvalidField(&'static str),
}

/// Parse one message line.
pub fn parse_message(raw: &str) -> Result<Message, MessageError> {
    let value = lexpr::from_str(raw).map_err(|e| MessageError::Malformed(e.to_string()))?;
    message_from_value(&value)
}

/// Parse an s-expression message and apply it to `engine`.
/// Returns an optional response string (s-expression).
pub fn handle_message(engine: &mut GestureEngine, raw: &str) -> Option<String> {
    let value = match lexpr::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("malformed s-expression: {}", e);
            return Some(error_response(0, &format!("malformed s-expression: {e}")));
        }
    };
    let msg_id = get_int(&value, "id").unwrap_or(0);

    match message_from_value(&value) {
        Ok(message) => dispatch(engine, message),
        Err(e) => {
            warn!("rejected message: {}", e);
            Some(error_response(msg_id, &e.to_string()))
        }
    }
}

/// Apply an already-parsed message to `engine`.
pub fn dispatch(engine: &mut GestureEngine, message: Message) -> Option<String> {
    match message {
        Message::Frame(frame) => {
            engine.update(&frame);
            None
        }
        Message::GestureConfig { id, patch } => handle_gesture_config(engine, id, &patch),
        Message::GestureStatus { id } => handle_gesture_status(engine, id),
        Message::GestureReset { id } => {
            debug!("gesture engine reset");
            engine.reset();
            Some(ok_response(id))
        }
    }
}

fn message_from_value(value: &Value) -> Result<Message, MessageError> {
    let msg_id = get_int(value, "id").unwrap_or(0);
    match get_keyword(value, "type").as_deref() {
        Some("frame") => parse_frame(value).map(Message::Frame),
        Some("gesture-config") => Ok(Message::GestureConfig {
            id: msg_id,
            patch: parse_config_patch(value)?,
        }),
        Some("gesture-status") => Ok(Message::GestureStatus { id: msg_id }),
        Some("gesture-reset") => Ok(Message::GestureReset { id: msg_id }),
        Some(other) => Err(MessageError::UnknownType(other.to_string())),
        None => Err(MessageError::MissingType),
    }
}

// ── Handlers ───────────────────────────────────────────────

fn handle_gesture_status(engine: &GestureEngine, msg_id: i64) -> Option<String> {
    Some(format!(
        "(:type :response :id {} :status :ok :gesture {} :config {})",
        msg_id,
        engine.status_sexp(),
        engine.config().config_sexp()
    ))
}

fn handle_gesture_config(
    engine: &mut GestureEngine,
    msg_id: i64,
    patch: &GestureConfigPatch,
) -> Option<String> {
    if let Err(e) = engine.set_config(patch) {
        return Some(error_response(msg_id, &e.to_string()));
    }
    Some(format!(
        "(:type :response :id {} :status :ok :config {})",
        msg_id,
        engine.config().config_sexp()
    ))
}

// ── Frame decoding ─────────────────────────────────────────

fn parse_frame(value: &Value) -> Result<HandLandmarkFrame, MessageError> {
    let t = get_float(value, "t").ok_or(MessageError::MissingField("t"))?;
    let hands = match get_value(value, "hands") {
        Some(hands) => list_items(hands).into_iter().map(parse_hand).collect(),
        None => Vec::new(),
    };
    Ok(HandLandmarkFrame::from_raw(t, hands))
}

/// Decode `(:handedness "Right" :points (x0 y0 ...))`.  Points are either
/// x/y pairs or x/y/z triples.  A hand whose points cannot be decoded is
/// kept with no landmarks, so frame validation drops it and the rest of
/// the frame still reaches the engine.
fn parse_hand(value: &Value) -> RawHand {
    let handedness = get_string(value, "handedness")
        .map(|label| Handedness::from_label(&label))
        .unwrap_or_default();
    let numbers = get_value(value, "points")
        .map(list_items)
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.as_f64().map(|n| n as f32))
        .collect::<Option<Vec<_>>>();

    let points = match numbers {
        Some(numbers) => {
            let stride = if numbers.len() == 3 * LANDMARK_COUNT { 3 } else { 2 };
            if numbers.len() % stride == 0 {
                numbers
                    .chunks_exact(stride)
                    .map(|c| Landmark {
                        x: c[0],
                        y: c[1],
                        z: c.get(2).copied(),
                    })
                    .collect()
            } else {
                debug!("hand with {} point coordinates", numbers.len());
                Vec::new()
            }
        }
        None => {
            debug!("hand with non-numeric points");
            Vec::new()
        }
    };

    RawHand { points, handedness }
}

// ── Config decoding ────────────────────────────────────────

/// Build a config patch from the kebab-case keys of a plist.  Keys that are
/// absent stay unset; keys that are present must be numeric.
pub fn parse_config_patch(value: &Value) -> Result<GestureConfigPatch, MessageError> {
    Ok(GestureConfigPatch {
        pinch_threshold_down: distance_field(value, "pinch-threshold-down")?,
        pinch_threshold_up: distance_field(value, "pinch-threshold-up")?,
        pinch_down_frames: frames_field(value, "pinch-down-frames")?,
        pinch_up_frames: frames_field(value, "pinch-up-frames")?,
        hold_ms: float_field(value, "hold-ms")?,
        drag_deadzone: distance_field(value, "drag-deadzone")?,
        double_tap_window_ms: float_field(value, "double-tap-window-ms")?,
        tap_cooldown_ms: float_field(value, "tap-cooldown-ms")?,
        max_tap_duration_ms: float_field(value, "max-tap-duration-ms")?,
        pose_cooldown_ms: float_field(value, "pose-cooldown-ms")?,
        finger_extend_slack: distance_field(value, "finger-extend-slack")?,
        open_palm_min_spread: distance_field(value, "open-palm-min-spread")?,
        confetti_hold_frames: frames_field(value, "confetti-hold-frames")?,
        heart_hold_frames: frames_field(value, "heart-hold-frames")?,
        peace_hold_frames: frames_field(value, "peace-hold-frames")?,
        rock_hold_frames: frames_field(value, "rock-hold-frames")?,
        heart_index_dist: distance_field(value, "heart-index-dist")?,
        heart_thumb_dist: distance_field(value, "heart-thumb-dist")?,
        heart_min_pinch: distance_field(value, "heart-min-pinch")?,
    })
}

fn float_field(value: &Value, key: &'static str) -> Result<Option<f64>, MessageError> {
    match get_keyword(value, key) {
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| MessageError::InvalidField(key)),
        None => Ok(None),
    }
}

fn distance_field(value: &Value, key: &'static str) -> Result<Option<f32>, MessageError> {
    Ok(float_field(value, key)?.map(|v| v as f32))
}

fn frames_field(value: &Value, key: &'static str) -> Result<Option<u32>, MessageError> {
    match get_keyword(value, key) {
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| MessageError::InvalidField(key)),
        None => Ok(None),
    }
}

// ── Event encoding ─────────────────────────────────────────

/// Render a gesture event as an IPC event s-expression.
pub fn event_sexp(event: &GestureEvent) -> String {
    let num = |v: f32| format!("{v:.4}");
    let ms = |v: f64| format!("{v:.1}");
    let opt_ms = |v: Option<f64>| v.map(ms).unwrap_or_else(|| "nil".to_string());

    let fields: Vec<(&str, String)> = match *event {
        GestureEvent::PinchDown {
            x,
            y,
            pinch_distance,
        } => vec![
            ("x", num(x)),
            ("y", num(y)),
            ("pinch-distance", num(pinch_distance)),
        ],
        GestureEvent::PinchUp {
            kind,
            duration_ms,
            pinch_distance,
        } => vec![
            (
                "kind",
                match kind {
                    PinchUpKind::Tap => ":tap".to_string(),
                    PinchUpKind::Release => ":release".to_string(),
                },
            ),
            ("duration-ms", opt_ms(duration_ms)),
            ("pinch-distance", num(pinch_distance)),
        ],
        GestureEvent::Tap { duration_ms } | GestureEvent::DoubleTap { duration_ms } => {
            vec![("duration-ms", ms(duration_ms))]
        }
        GestureEvent::TapRejected {
            reason,
            duration_ms,
        } => vec![
            ("reason", format!(":{}", reason.as_str())),
            ("duration-ms", opt_ms(duration_ms)),
        ],
        GestureEvent::HoldStart { x, y }
        | GestureEvent::Holding { x, y }
        | GestureEvent::Pose { x, y, .. } => vec![("x", num(x)), ("y", num(y))],
        GestureEvent::HoldEnd => Vec::new(),
        GestureEvent::HandLost { from } => {
            vec![("from", format!(":{}", from.as_str().to_ascii_lowercase()))]
        }
        GestureEvent::Drag { dx, dy, x, y } => vec![
            ("dx", num(dx)),
            ("dy", num(dy)),
            ("x", num(x)),
            ("y", num(y)),
        ],
    };

    let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    format_event(event.name(), &borrowed)
}

/// Format an IPC event s-expression.
pub fn format_event(event_type: &str, fields: &[(&str, &str)]) -> String {
    let mut s = format!("(:type :event :event :{}", event_type);
    for (key, val) in fields {
        s.push_str(&format!(" :{} {}", key, val));
    }
    s.push(')');
    s
}

// ── Helpers ────────────────────────────────────────────────

pub fn ok_response(id: i64) -> String {
    format!("(:type :response :id {} :status :ok)", id)
}

pub fn error_response(id: i64, reason: &str) -> String {
    format!(
        "(:type :response :id {} :status :error :reason \"{}\")",
        id,
        escape_string(reason)
    )
}

/// Escape a string for s-expression output.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Find the value following `:key` in an s-expression plist.
/// Walks key/value pairs, so a keyword in value position never matches.
/// Handles both `Value::Keyword("key")` (elisp parser) and
/// `Value::Symbol(":key")` (default parser) forms.
fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let Value::Cons(next) = pair.cdr() else {
            return None;
        };
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return Some(next.car());
        }
        current = next.cdr();
    }
    None
}

/// Extract a keyword value from an s-expression plist as a string.
fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let val = get_value(value, key)?;
    match val {
        Value::Keyword(v) => Some(v.to_string()),
        Value::Symbol(v) => {
            let s = v.to_string();
            Some(s.strip_prefix(':').unwrap_or(&s).to_string())
        }
        Value::String(v) => Some(v.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "t" } else { "nil" }.to_string()),
        Value::Null => Some("nil".to_string()),
        _ => Some(val.to_string()),
    }
}

/// Extract an integer value from an s-expression plist.
fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Extract a string value from an s-expression plist.
fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Extract a floating-point value from an s-expression plist.
fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Top-level elements of a proper or dotted list.  Anything that is not a
/// cons (including `()` and `nil`) yields no elements.
fn list_items(value: &Value) -> Vec<&Value> {
    let mut items = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        items.push(pair.car());
        current = pair.cdr();
    }
    items
}
