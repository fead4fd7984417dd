//! Runtime for executing flows
//!
//! One executor task per engine owns the run state. Callers interact through
//! a [`FlowHandle`]: commands go in over an mpsc channel, state comes out as
//! a `watch` snapshot plus a broadcast stream of [`FlowEvent`]s.

mod executor;
mod ids;
mod message;


pub use ids::{IdSource, SequentialIds};
pub use message::{Message, Role};

use crate::config::EngineSettings;
use crate::flow::{FlowDefinition, Profile};
use crate::state_machine::{CompletionReason, Event, FlowContext, FlowState};
use executor::FlowRuntime;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("Flow engine has stopped")]
    Closed,
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Events sent to subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    MessageAppended { message: Message },
    StateChange { state: FlowState },
    Completed { reason: CompletionReason },
}

/// Read-only view of a run for the rendering layer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowSnapshot {
    pub state: FlowState,
    pub messages: Vec<Message>,
    pub profile: Profile,
    /// The AI is composing its next message
    pub is_typing: bool,
    pub is_complete: bool,
    pub current_step_id: Option<String>,
}

impl FlowSnapshot {
    /// The most recent AI message, whose input kind the caller should render
    #[must_use]
    pub fn latest_ai_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_ai())
    }

    #[must_use]
    pub fn awaiting_input(&self) -> bool {
        matches!(self.state, FlowState::AwaitingInput { .. })
    }
}

/// Builder for a flow engine
pub struct FlowEngine {
    definition: FlowDefinition,
    settings: EngineSettings,
    ids: Arc<dyn IdSource>,
}

impl FlowEngine {
    #[must_use]
    pub fn new(definition: FlowDefinition) -> Self {
        Self {
            definition,
            settings: EngineSettings::default(),
            ids: SequentialIds::global(),
        }
    }

    #[must_use]
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use `ids` instead of the process-wide counter
    #[must_use]
    pub fn ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Spawn the executor on the current tokio runtime.
    ///
    /// The engine stays idle until [`FlowHandle::start`]. It stops once every
    /// handle has been dropped.
    #[must_use]
    pub fn spawn(self) -> FlowHandle {
        let context = FlowContext::new(self.definition, self.settings);
        let (event_tx, event_rx) = mpsc::channel(COMMAND_BUFFER);
        let (broadcast_tx, _) = broadcast::channel(EVENT_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(FlowSnapshot::default());

        let runtime = FlowRuntime::new(
            context,
            self.ids,
            event_rx,
            broadcast_tx.clone(),
            snapshot_tx,
        );
        tokio::spawn(runtime.run());

        FlowHandle {
            event_tx,
            broadcast_tx,
            snapshot_rx,
        }
    }
}

/// Handle to interact with a running engine
#[derive(Clone)]
pub struct FlowHandle {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<FlowEvent>,
    snapshot_rx: watch::Receiver<FlowSnapshot>,
}

impl FlowHandle {
    /// Start, or restart, the flow from its initial step
    ///
    /// # Errors
    ///
    /// [`EngineError::Closed`] if the engine task has stopped.
    pub async fn start(&self) -> Result<(), EngineError> {
        self.send(Event::Start).await
    }

    /// Submit the user's answer for the current step.
    ///
    /// Dropped without error when no step is waiting for input or an earlier
    /// answer is still being processed.
    ///
    /// # Errors
    ///
    /// [`EngineError::Closed`] if the engine task has stopped.
    pub async fn submit_answer(&self, answer: impl Into<String>) -> Result<(), EngineError> {
        self.send(Event::SubmitAnswer {
            answer: answer.into(),
        })
        .await
    }

    async fn send(&self, event: Event) -> Result<(), EngineError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| EngineError::Closed)
    }

    #[must_use]
    pub fn snapshot(&self) -> FlowSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<FlowSnapshot> {
        self.snapshot_rx.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Wait until `predicate` holds for the published snapshot
    ///
    /// # Errors
    ///
    /// [`EngineError::Timeout`] if it does not hold within `timeout`, or
    /// [`EngineError::Closed`] if the engine stops first.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&FlowSnapshot) -> bool,
        timeout: Duration,
    ) -> Result<FlowSnapshot, EngineError> {
        let mut rx = self.snapshot_rx.clone();
        let result = tokio::time::timeout(timeout, rx.wait_for(predicate)).await;
        match result {
            Ok(Ok(snapshot)) => Ok((*snapshot).clone()),
            Ok(Err(_)) => Err(EngineError::Closed),
            Err(_) => Err(EngineError::Timeout(timeout)),
        }
    }
}
