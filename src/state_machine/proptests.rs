//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::config::EngineSettings;
use crate::flow::{FlowDefinition, InputKind, Step};
use proptest::prelude::*;
use std::time::Duration;

// ============================================================================
// Test Helpers
// ============================================================================

/// A small flow with a fixed edge, a computed branch, an edge to a missing
/// step and a terminal step
fn test_context() -> FlowContext {
    let definition = FlowDefinition::new("greet")
        .step(
            Step::new("greet", "Hello! Your name?", InputKind::Text)
                .field("name")
                .next("identity"),
        )
        .step(
            Step::new("identity", "{name}, student or parent?", InputKind::VoiceChoice)
                .field("identity")
                .next_with(|a| {
                    if a.contains("学生") {
                        "student".to_string()
                    } else if a.contains("家长") {
                        "parent".to_string()
                    } else {
                        "nowhere".to_string()
                    }
                }),
        )
        .step(Step::new("student", "Welcome {name}", InputKind::ConfirmCard))
        .step(
            Step::new("parent", "Child's grade?", InputKind::TagSelect)
                .field("grade")
                .next("student"),
        );
    FlowContext::new(
        definition,
        EngineSettings {
            typing_delay: Duration::from_millis(800),
            answer_delay: Duration::from_millis(300),
        },
    )
}

fn is_valid_state(state: &FlowState, ctx: &FlowContext) -> bool {
    match state {
        FlowState::Idle => true,
        FlowState::AwaitingAi { step_id } | FlowState::AwaitingInput { step_id } => {
            ctx.definition.contains(step_id)
        }
        FlowState::ProcessingAnswer { step_id, .. } => ctx.definition.contains(step_id),
        FlowState::Complete {
            reason,
            last_step_id,
        } => match reason {
            CompletionReason::Finished { step_id } => {
                last_step_id.as_ref() == Some(step_id)
                    && ctx.definition.get(step_id).is_some_and(Step::is_terminal)
            }
            CompletionReason::UnresolvedStep { step_id } => {
                !ctx.definition.contains(step_id)
                    && last_step_id.as_ref().is_none_or(|s| ctx.definition.contains(s))
            }
        },
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_answer() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("我是学生".to_string()),
        Just("我是家长".to_string()),
        "[a-zA-Z ]{0,12}",
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        1 => Just(Event::Start),
        4 => arb_answer().prop_map(|answer| Event::SubmitAnswer { answer }),
        3 => Just(Event::Timer { kind: TimerKind::Compose }),
        3 => Just(Event::Timer { kind: TimerKind::AnswerDelay }),
    ]
}

fn arb_any_state() -> impl Strategy<Value = FlowState> {
    let step = || {
        proptest::sample::select(vec!["greet", "identity", "student", "parent"])
            .prop_map(String::from)
    };
    prop_oneof![
        Just(FlowState::Idle),
        step().prop_map(|step_id| FlowState::AwaitingAi { step_id }),
        step().prop_map(|step_id| FlowState::AwaitingInput { step_id }),
        (step(), step()).prop_map(|(step_id, next_step_id)| FlowState::ProcessingAnswer {
            step_id,
            next_step_id
        }),
        Just(FlowState::Complete {
            reason: CompletionReason::Finished {
                step_id: "student".to_string()
            },
            last_step_id: Some("student".to_string()),
        }),
        Just(FlowState::Complete {
            reason: CompletionReason::UnresolvedStep {
                step_id: "nowhere".to_string()
            },
            last_step_id: Some("identity".to_string()),
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Invariant 1: Valid state after any transition
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = FlowState::Idle;
        let ctx = test_context();

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
                prop_assert!(is_valid_state(&state, &ctx), "Invalid state: {:?}", state);
            }
        }
    }

    // Invariant 2: Start always resets and cancels first, from any state
    #[test]
    fn prop_start_always_resets(state in arb_any_state()) {
        let result = transition(&state, &test_context(), Event::Start).unwrap();
        prop_assert_eq!(&result.effects[0], &Effect::CancelPending);
        prop_assert_eq!(&result.effects[1], &Effect::ResetRun);
        prop_assert_eq!(
            result.new_state,
            FlowState::AwaitingAi { step_id: "greet".to_string() }
        );
    }

    // Invariant 3: An AI message is only produced when entering AwaitingInput,
    // and only for the step being composed
    #[test]
    fn prop_ai_message_only_on_compose(state in arb_any_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, &test_context(), event) {
            for effect in &result.effects {
                if let Effect::AppendAiMessage { step_id } = effect {
                    prop_assert_eq!(
                        &result.new_state,
                        &FlowState::AwaitingInput { step_id: step_id.clone() }
                    );
                    prop_assert_eq!(state.step_id(), Some(step_id.as_str()));
                }
            }
        }
    }

    // Invariant 4: Submissions are accepted only while awaiting input, and an
    // accepted one appends exactly one user message with the raw answer
    #[test]
    fn prop_submit_only_when_awaiting_input(state in arb_any_state(), answer in arb_answer()) {
        let event = Event::SubmitAnswer { answer: answer.clone() };
        match transition(&state, &test_context(), event) {
            Ok(result) => {
                let is_awaiting_input = matches!(state, FlowState::AwaitingInput { .. });
                prop_assert!(is_awaiting_input);
                let user_messages: Vec<_> = result
                    .effects
                    .iter()
                    .filter_map(|e| match e {
                        Effect::AppendUserMessage { content } => Some(content.clone()),
                        _ => None,
                    })
                    .collect();
                prop_assert_eq!(user_messages, vec![answer]);
            }
            Err(_) => {
                let is_awaiting_input = matches!(state, FlowState::AwaitingInput { .. });
                prop_assert!(!is_awaiting_input);
            }
        }
    }

    // Invariant 5: A second submission right after an accepted one is dropped
    #[test]
    fn prop_double_submit_rejected(first in arb_answer(), second in arb_answer()) {
        let ctx = test_context();
        let state = FlowState::AwaitingInput { step_id: "greet".to_string() };
        let after_first = transition(&state, &ctx, Event::SubmitAnswer { answer: first })
            .unwrap()
            .new_state;
        let again = transition(&after_first, &ctx, Event::SubmitAnswer { answer: second });
        prop_assert_eq!(again.unwrap_err(), TransitionError::AnswerInFlight("greet".to_string()));
    }

    // Invariant 6: Complete is only left through Start
    #[test]
    fn prop_complete_is_terminal(events in proptest::collection::vec(arb_event(), 1..10)) {
        let ctx = test_context();
        let done = FlowState::Complete {
            reason: CompletionReason::Finished { step_id: "student".to_string() },
            last_step_id: Some("student".to_string()),
        };
        for event in events {
            let is_start = event == Event::Start;
            let result = transition(&done, &ctx, event);
            if is_start {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(result.is_err());
            }
        }
    }

    // Invariant 7: Transitions are deterministic
    #[test]
    fn prop_transition_deterministic(state in arb_any_state(), event in arb_event()) {
        let ctx = test_context();
        let a = transition(&state, &ctx, event.clone());
        let b = transition(&state, &ctx, event);
        match (a, b) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.new_state, b.new_state);
                prop_assert_eq!(a.effects, b.effects);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            _ => prop_assert!(false, "Outcome differed between identical calls"),
        }
    }

    // Invariant 8: Completing through an answer or a missing successor keeps
    // the step the run was on
    #[test]
    fn prop_completion_keeps_current_step(state in arb_any_state(), event in arb_event()) {
        let is_start = event == Event::Start;
        if let Ok(result) = transition(&state, &test_context(), event) {
            if result.new_state.is_complete() && !is_start && !state.is_complete() {
                prop_assert!(state.step_id().is_some());
                prop_assert_eq!(result.new_state.step_id(), state.step_id());
            }
        }
    }

    // Invariant 9: Field capture always stores the raw answer under the step's key
    #[test]
    fn prop_field_capture(answer in arb_answer()) {
        let state = FlowState::AwaitingInput { step_id: "identity".to_string() };
        let result = transition(&state, &test_context(), Event::SubmitAnswer { answer: answer.clone() })
            .unwrap();
        prop_assert_eq!(&result.effects[0], &Effect::store_field("identity", answer));
    }
}

/// Unknown branch target completes the run instead of erroring
#[test]
fn test_branch_to_missing_step_completes() {
    let ctx = test_context();
    let state = FlowState::AwaitingInput {
        step_id: "identity".to_string(),
    };
    let processing = transition(
        &state,
        &ctx,
        Event::SubmitAnswer {
            answer: "???".to_string(),
        },
    )
    .unwrap()
    .new_state;
    let result = transition(
        &processing,
        &ctx,
        Event::Timer {
            kind: TimerKind::AnswerDelay,
        },
    )
    .unwrap();
    assert_eq!(
        result.new_state,
        FlowState::Complete {
            reason: CompletionReason::UnresolvedStep {
                step_id: "nowhere".to_string()
            },
            last_step_id: Some("identity".to_string()),
        }
    );
}
