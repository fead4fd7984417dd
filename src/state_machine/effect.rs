//! Effects produced by state transitions

use super::event::TimerKind;
use super::state::CompletionReason;
use std::time::Duration;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Cancel the outstanding scheduled continuation, if any
    CancelPending,

    /// Clear the transcript and profile for a fresh run
    ResetRun,

    /// Record an answer in the profile, overwriting any earlier value
    StoreField { key: String, value: String },

    /// Append a user message with the raw answer
    AppendUserMessage { content: String },

    /// Interpolate the step's template and append it as an AI message
    AppendAiMessage { step_id: String },

    /// Schedule a continuation; replaces any pending one
    ScheduleTimer { kind: TimerKind, delay: Duration },

    /// Tell subscribers the run has ended
    NotifyCompleted { reason: CompletionReason },
}

impl Effect {
    #[must_use]
    pub fn compose_after(delay: Duration) -> Self {
        Effect::ScheduleTimer {
            kind: TimerKind::Compose,
            delay,
        }
    }

    #[must_use]
    pub fn answer_delay(delay: Duration) -> Self {
        Effect::ScheduleTimer {
            kind: TimerKind::AnswerDelay,
            delay,
        }
    }

    #[must_use]
    pub fn store_field(key: impl Into<String>, value: impl Into<String>) -> Self {
        Effect::StoreField {
            key: key.into(),
            value: value.into(),
        }
    }
}
