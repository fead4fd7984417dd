//! Flow graph types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Captured answers for one flow run, keyed by field name
pub type Profile = BTreeMap<String, String>;

/// The input widget the caller should render for a step.
///
/// Opaque to the engine: answers are never checked against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Text,
    VoiceChoice,
    TagSelect,
    BiometricCapture,
    ConfirmCard,
    MultiSelect,
}

/// Successor rule for a step
#[derive(Clone)]
pub enum NextStep {
    Fixed(String),
    /// Computed from the raw answer text
    Computed(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl NextStep {
    #[must_use]
    pub fn resolve(&self, answer: &str) -> String {
        match self {
            NextStep::Fixed(id) => id.clone(),
            NextStep::Computed(f) => f(answer),
        }
    }
}

impl fmt::Debug for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStep::Fixed(id) => f.debug_tuple("Fixed").field(id).finish(),
            NextStep::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

/// One node of the conversation graph
#[derive(Debug, Clone)]
pub struct Step {
    pub id: String,
    /// May contain `{field}` placeholders
    pub template: String,
    pub input_kind: InputKind,
    /// Forwarded to the caller unchanged
    pub input_config: Option<Value>,
    /// Profile key the answer is stored under
    pub field_key: Option<String>,
    /// `None` marks a terminal step
    pub next: Option<NextStep>,
}

impl Step {
    #[must_use]
    pub fn new(id: impl Into<String>, template: impl Into<String>, input_kind: InputKind) -> Self {
        Self {
            id: id.into(),
            template: template.into(),
            input_kind,
            input_config: None,
            field_key: None,
            next: None,
        }
    }

    #[must_use]
    pub fn input_config(mut self, config: Value) -> Self {
        self.input_config = Some(config);
        self
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>) -> Self {
        self.field_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn next(mut self, step_id: impl Into<String>) -> Self {
        self.next = Some(NextStep::Fixed(step_id.into()));
        self
    }

    #[must_use]
    pub fn next_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.next = Some(NextStep::Computed(Arc::new(f)));
        self
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

/// Configuration errors reported by [`FlowDefinition::validate`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Initial step not found: {0}")]
    UnknownInitialStep(String),
    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),
    #[error("Step {from} points to unknown step {to}")]
    UnknownNextStep { from: String, to: String },
}

/// A complete flow: ordered steps plus the entry point
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    pub initial_step_id: String,
    steps: Vec<Step>,
}

impl FlowDefinition {
    #[must_use]
    pub fn new(initial_step_id: impl Into<String>) -> Self {
        Self {
            initial_step_id: initial_step_id.into(),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Look up a step by id. With duplicate ids the first one wins.
    #[must_use]
    pub fn get(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    #[must_use]
    pub fn contains(&self, step_id: &str) -> bool {
        self.get(step_id).is_some()
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Stricter opt-in check. The engine itself never calls this: an
    /// unresolvable id at runtime completes the flow instead.
    ///
    /// Computed successors cannot be checked ahead of time.
    ///
    /// # Errors
    ///
    /// Returns the first [`FlowError`] found: an unknown initial step, a
    /// duplicate step id, or a fixed successor that names no step.
    pub fn validate(&self) -> Result<(), FlowError> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(FlowError::DuplicateStep(step.id.clone()));
            }
        }

        if !seen.contains(self.initial_step_id.as_str()) {
            return Err(FlowError::UnknownInitialStep(self.initial_step_id.clone()));
        }

        for step in &self.steps {
            if let Some(NextStep::Fixed(to)) = &step.next {
                if !seen.contains(to.as_str()) {
                    return Err(FlowError::UnknownNextStep {
                        from: step.id.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
