//! Decoder for the appliance's `<PRI>key=value ...` syslog payloads.
//!
//! Pure and allocation-bounded by the input line: no I/O, no shared state.
//! `decode` always returns a [`Record`]; grammar failures are carried inside it.

mod grammar;
pub mod model;
pub mod priority;

pub use grammar::decode;
pub use model::{DecodeError, DecodeErrorKind, Fields, Record};
