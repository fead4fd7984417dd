//! Flow state types

use crate::config::EngineSettings;
use crate::flow::FlowDefinition;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Why a run ended
///
/// Both reasons set the same completion flag; the caller cannot rely on
/// completion meaning every step was answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionReason {
    /// A terminal step was answered
    Finished { step_id: String },
    /// A step id did not resolve to any step
    UnresolvedStep { step_id: String },
}

/// Flow run state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowState {
    /// Not started yet
    #[default]
    Idle,

    /// AI is composing the message for `step_id`
    AwaitingAi { step_id: String },

    /// AI message shown, waiting for the caller's answer
    AwaitingInput { step_id: String },

    /// Answer accepted; further submissions are dropped until the next step begins
    ProcessingAnswer {
        step_id: String,
        next_step_id: String,
    },

    /// No operation other than a restart leaves this state
    Complete {
        reason: CompletionReason,
        /// Step that was active when the run ended; `None` only when the
        /// initial step itself did not resolve
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_step_id: Option<String>,
    },
}

impl FlowState {
    /// The step currently active, if any
    ///
    /// A completed run keeps reporting the step it ended on.
    #[must_use]
    pub fn step_id(&self) -> Option<&str> {
        match self {
            FlowState::AwaitingAi { step_id }
            | FlowState::AwaitingInput { step_id }
            | FlowState::ProcessingAnswer { step_id, .. } => Some(step_id),
            FlowState::Complete { last_step_id, .. } => last_step_id.as_deref(),
            FlowState::Idle => None,
        }
    }

    /// True while the AI message is being "typed"
    #[must_use]
    pub fn is_typing(&self) -> bool {
        matches!(self, FlowState::AwaitingAi { .. })
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, FlowState::Complete { .. })
    }

    /// Short name used in logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::AwaitingAi { .. } => "awaiting_ai",
            FlowState::AwaitingInput { .. } => "awaiting_input",
            FlowState::ProcessingAnswer { .. } => "processing_answer",
            FlowState::Complete { .. } => "complete",
        }
    }
}

/// Immutable configuration for one engine
#[derive(Debug, Clone)]
pub struct FlowContext {
    pub definition: Arc<FlowDefinition>,
    pub settings: EngineSettings,
}

impl FlowContext {
    #[must_use]
    pub fn new(definition: FlowDefinition, settings: EngineSettings) -> Self {
        Self {
            definition: Arc::new(definition),
            settings,
        }
    }
}
