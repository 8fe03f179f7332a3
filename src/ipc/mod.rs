//! S-expression message protocol for driving a gesture engine.

pub mod dispatch;

pub use dispatch::{event_sexp, handle_message, parse_message, Message, MessageError};
