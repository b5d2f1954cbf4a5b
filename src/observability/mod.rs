//! Observability for simulation runs
//!
//! Every turn emits a [`TurnEvent`] to the configured sinks:
//! - File (JSONL) - writes to paths.events/<month>/<day>.jsonl
//! - Stdout - prints a one-line colored summary

pub mod emitter;

pub use emitter::{EventEmitter, TurnEvent};
