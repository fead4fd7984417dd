//! Core flow state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! All timing and storage lives in the runtime; this module only decides
//! what happens next.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, TimerKind};
pub use state::{CompletionReason, FlowContext, FlowState};
pub use transition::{transition, TransitionError, TransitionResult};
