//! Terminal demo for the onboarding flows
//!
//! Usage: `tutor-flow [identity|student|parent]`. Each AI prompt is printed
//! with its input hint; each line typed on stdin is submitted as the answer.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutor_flow::flow::onboarding::OnboardingFlow;
use tutor_flow::{EngineSettings, FlowEngine, FlowEvent, InputKind, Message};

/// Submitted when Enter is pressed on a capture step
const CAPTURE_DONE: &str = "声纹采集完成";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutor_flow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Configuration
    let flow_name = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TUTOR_FLOW_NAME").ok())
        .unwrap_or_else(|| OnboardingFlow::Identity.name().to_string());
    let flow: OnboardingFlow = flow_name.parse()?;
    let definition = flow.definition();
    definition.validate()?;
    let settings = EngineSettings::from_env();

    tracing::info!(%flow, ?settings, "Starting onboarding flow");

    let handle = FlowEngine::new(definition).settings(settings).spawn();
    let mut events = handle.subscribe();
    handle.start().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut current_kind = None;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(FlowEvent::MessageAppended { message }) if message.is_ai() => {
                    print_prompt(&message);
                    current_kind = message.input_kind;
                }
                Ok(FlowEvent::StateChange { state }) if state.is_typing() => {
                    println!("  ...");
                }
                Ok(FlowEvent::Completed { reason }) => {
                    tracing::info!(?reason, "Flow finished");
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let answer = line.trim();
                if !answer.is_empty() {
                    handle.submit_answer(answer).await?;
                } else if current_kind == Some(InputKind::BiometricCapture) {
                    handle.submit_answer(CAPTURE_DONE).await?;
                }
            }
        }
    }

    let snapshot = handle.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot.profile)?);
    Ok(())
}

fn print_prompt(message: &Message) {
    println!("AI: {}", message.content);

    let choices = message
        .input_config
        .as_ref()
        .and_then(|c| c.get("options").or_else(|| c.get("tags")))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" / ")
        });

    match (message.input_kind, choices) {
        (Some(InputKind::MultiSelect), Some(choices)) => {
            println!("  [choose any, comma separated] {choices}");
        }
        (Some(_), Some(choices)) => println!("  [{choices}]"),
        (Some(InputKind::BiometricCapture), None) => println!("  [press Enter to record]"),
        (Some(InputKind::ConfirmCard), None) => println!("  [type anything to confirm]"),
        _ => {}
    }
}
