//! Events that can occur in a flow run

use serde::{Deserialize, Serialize};

/// Which scheduled continuation fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// The AI finished "typing" the current step's message
    Compose,
    /// The pause after an accepted answer elapsed
    AnswerDelay,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Caller events
    Start,
    SubmitAnswer { answer: String },

    // Runtime events
    Timer { kind: TimerKind },
}
