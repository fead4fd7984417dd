//! Pure state transition function

use super::{CompletionReason, Effect, Event, FlowContext, FlowState, TimerKind};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: FlowState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    #[must_use]
    pub fn new(state: FlowState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    fn with_effects_first(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        let rest = std::mem::take(&mut self.effects);
        self.effects.extend(effects);
        self.effects.extend(rest);
        self
    }
}

/// Inputs the current state does not accept.
///
/// The runtime drops these silently; they never reach the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No active step, call start first")]
    NoActiveStep,
    #[error("Flow is complete")]
    FlowComplete,
    #[error("AI is still composing the message for step {0}")]
    Composing(String),
    #[error("An answer for step {0} is already being processed")]
    AnswerInFlight(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
///
/// # Errors
///
/// A [`TransitionError`] when `state` does not accept `event`.
pub fn transition(
    state: &FlowState,
    context: &FlowContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Start / restart: valid from every state
        // ============================================================
        (_, Event::Start) => {
            let initial = context.definition.initial_step_id.clone();
            Ok(advance_to_step(context, initial, None)
                .with_effects_first([Effect::CancelPending, Effect::ResetRun]))
        }

        // ============================================================
        // AI message composed
        // ============================================================
        (FlowState::AwaitingAi { step_id }, Event::Timer { kind: TimerKind::Compose }) => {
            Ok(
                TransitionResult::new(FlowState::AwaitingInput {
                    step_id: step_id.clone(),
                })
                .with_effect(Effect::AppendAiMessage {
                    step_id: step_id.clone(),
                }),
            )
        }

        // ============================================================
        // Answer submission
        // ============================================================
        (FlowState::AwaitingInput { step_id }, Event::SubmitAnswer { answer }) => {
            let Some(step) = context.definition.get(step_id) else {
                return Err(TransitionError::InvalidTransition(format!(
                    "Active step {step_id} is not part of the flow"
                )));
            };

            let mut effects = Vec::with_capacity(3);
            if let Some(key) = &step.field_key {
                effects.push(Effect::store_field(key.clone(), answer.clone()));
            }

            let next = step.next.as_ref().map(|n| n.resolve(&answer));
            effects.push(Effect::AppendUserMessage { content: answer });

            match next {
                Some(next_step_id) => Ok(TransitionResult::new(FlowState::ProcessingAnswer {
                    step_id: step_id.clone(),
                    next_step_id,
                })
                .with_effects(effects)
                .with_effect(Effect::answer_delay(context.settings.answer_delay))),
                None => {
                    let reason = CompletionReason::Finished {
                        step_id: step_id.clone(),
                    };
                    Ok(TransitionResult::new(FlowState::Complete {
                        reason: reason.clone(),
                        last_step_id: Some(step_id.clone()),
                    })
                    .with_effects(effects)
                    .with_effect(Effect::NotifyCompleted { reason }))
                }
            }
        }

        (FlowState::Idle, Event::SubmitAnswer { .. }) => Err(TransitionError::NoActiveStep),
        (FlowState::Complete { .. }, Event::SubmitAnswer { .. }) => {
            Err(TransitionError::FlowComplete)
        }
        (FlowState::AwaitingAi { step_id }, Event::SubmitAnswer { .. }) => {
            Err(TransitionError::Composing(step_id.clone()))
        }
        (FlowState::ProcessingAnswer { step_id, .. }, Event::SubmitAnswer { .. }) => {
            Err(TransitionError::AnswerInFlight(step_id.clone()))
        }

        // ============================================================
        // Answer delay elapsed: move on
        // ============================================================
        (
            FlowState::ProcessingAnswer {
                step_id,
                next_step_id,
            },
            Event::Timer {
                kind: TimerKind::AnswerDelay,
            },
        ) => Ok(advance_to_step(
            context,
            next_step_id.clone(),
            Some(step_id.clone()),
        )),

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {event:?}",
            state.kind()
        ))),
    }
}

/// Enter `step_id`, or complete the flow if it does not exist.
///
/// An unknown id is indistinguishable from a finished flow to the caller.
/// The current step stays `current` since the unknown one never became active.
fn advance_to_step(
    context: &FlowContext,
    step_id: String,
    current: Option<String>,
) -> TransitionResult {
    if context.definition.contains(&step_id) {
        TransitionResult::new(FlowState::AwaitingAi { step_id })
            .with_effect(Effect::compose_after(context.settings.typing_delay))
    } else {
        let reason = CompletionReason::UnresolvedStep { step_id };
        TransitionResult::new(FlowState::Complete {
            reason: reason.clone(),
            last_step_id: current,
        })
        .with_effect(Effect::NotifyCompleted { reason })
    }
}
