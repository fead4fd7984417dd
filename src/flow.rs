//! Declarative conversation flows
//!
//! A flow is a graph of steps: each step pairs an AI prompt template with
//! the input widget the caller should render and a rule for picking the
//! next step from the answer.

pub mod onboarding;
mod step;
mod template;

pub use step::{FlowDefinition, FlowError, InputKind, NextStep, Profile, Step};
pub use template::interpolate;
