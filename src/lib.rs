//! Tutor Flow - scripted conversational flow engine
//!
//! Walks a declarative step graph one step at a time, producing a chat
//! transcript and a map of captured answers for an onboarding UI to render.

pub mod config;
pub mod flow;
pub mod runtime;
pub mod state_machine;

pub use config::EngineSettings;
pub use flow::{FlowDefinition, FlowError, InputKind, NextStep, Profile, Step};
pub use runtime::{
    EngineError, FlowEngine, FlowEvent, FlowHandle, FlowSnapshot, IdSource, Message, Role,
    SequentialIds,
};
pub use state_machine::{CompletionReason, FlowState};
