//! Main loop module.
//!
//! Session state machine and the cooperative loop that drives it.
//!
//! # Architecture
//! - `buffer` - Fixed-capacity receive / transmit staging buffer
//! - `state` - Session states and the pure transition function
//! - `event` - Completion events, event queue and `CompletionSink`
//! - `context` - Per-cycle session context, applies events
//! - `session` - Phases, wait loop, teardown and the forever loop

pub mod buffer;
pub mod context;
pub mod event;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod mock;

pub use buffer::{SessionBuffer, BUFFER_CAPACITY};
pub use context::{Effect, SessionContext};
pub use event::{CompletionSink, Event, EventQueue, Payload};
pub use session::{CycleReport, Session};
pub use state::{SessionState, Transition};
