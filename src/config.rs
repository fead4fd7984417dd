//! Engine timing configuration

use std::time::Duration;

pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_ANSWER_DELAY: Duration = Duration::from_millis(500);

/// Simulated delays used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// How long the AI "types" before its message appears
    pub typing_delay: Duration,
    /// Pause between accepting an answer and starting the next step
    pub answer_delay: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            typing_delay: DEFAULT_TYPING_DELAY,
            answer_delay: DEFAULT_ANSWER_DELAY,
        }
    }
}

impl EngineSettings {
    /// Load from `TUTOR_FLOW_TYPING_DELAY_MS` / `TUTOR_FLOW_ANSWER_DELAY_MS`,
    /// falling back to the defaults for anything missing or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map_or(default, Duration::from_millis)
        };
        Self {
            typing_delay: millis("TUTOR_FLOW_TYPING_DELAY_MS", DEFAULT_TYPING_DELAY),
            answer_delay: millis("TUTOR_FLOW_ANSWER_DELAY_MS", DEFAULT_ANSWER_DELAY),
        }
    }

    /// Zero delays, for callers that do not want the typing simulation
    #[must_use]
    pub fn instant() -> Self {
        Self {
            typing_delay: Duration::ZERO,
            answer_delay: Duration::ZERO,
        }
    }
}
