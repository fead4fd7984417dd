//! Flow runtime executor

use super::ids::IdSource;
use super::message::Message;
use super::{FlowEvent, FlowSnapshot};

use crate::flow::{interpolate, Profile};
use crate::state_machine::{
    transition, CompletionReason, Effect, Event, FlowContext, FlowState, TimerKind,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// A scheduled continuation that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerFired {
    pub ticket: u64,
    pub kind: TimerKind,
}

/// The one continuation allowed to be outstanding
#[derive(Debug)]
struct PendingTimer {
    ticket: u64,
    kind: TimerKind,
    token: CancellationToken,
}

/// Owns one flow run: state, transcript and profile
pub(crate) struct FlowRuntime {
    context: FlowContext,
    state: FlowState,
    messages: Vec<Message>,
    profile: Profile,
    ids: Arc<dyn IdSource>,
    event_rx: mpsc::Receiver<Event>,
    timer_tx: mpsc::UnboundedSender<TimerFired>,
    timer_rx: mpsc::UnboundedReceiver<TimerFired>,
    broadcast_tx: broadcast::Sender<FlowEvent>,
    snapshot_tx: watch::Sender<FlowSnapshot>,
    pending: Option<PendingTimer>,
    next_ticket: u64,
}

impl FlowRuntime {
    pub(crate) fn new(
        context: FlowContext,
        ids: Arc<dyn IdSource>,
        event_rx: mpsc::Receiver<Event>,
        broadcast_tx: broadcast::Sender<FlowEvent>,
        snapshot_tx: watch::Sender<FlowSnapshot>,
    ) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            context,
            state: FlowState::Idle,
            messages: Vec::new(),
            profile: Profile::new(),
            ids,
            event_rx,
            timer_tx,
            timer_rx,
            broadcast_tx,
            snapshot_tx,
            pending: None,
            next_ticket: 1,
        }
    }

    pub(crate) async fn run(mut self) {
        tracing::info!(
            initial_step = %self.context.definition.initial_step_id,
            steps = self.context.definition.steps().len(),
            "Starting flow runtime"
        );

        // Process events in a loop until every handle is gone
        loop {
            tokio::select! {
                biased;

                event = self.event_rx.recv() => match event {
                    Some(event) => self.process_event(event),
                    None => break,
                },
                Some(fired) = self.timer_rx.recv() => self.handle_timer(fired),
            }
        }

        self.cancel_pending();
        tracing::info!("Flow runtime stopped");
    }

    /// Feed a fired timer to the state machine unless it has been superseded.
    ///
    /// A timer can fire and queue its event just before a restart cancels it,
    /// so the ticket is checked in addition to the cancellation token.
    pub(crate) fn handle_timer(&mut self, fired: TimerFired) {
        let current = self
            .pending
            .as_ref()
            .is_some_and(|p| p.ticket == fired.ticket && !p.token.is_cancelled());
        if current {
            self.pending = None;
            self.process_event(Event::Timer { kind: fired.kind });
        } else {
            tracing::debug!(ticket = fired.ticket, kind = ?fired.kind, "Dropping stale timer");
        }
    }

    pub(crate) fn process_event(&mut self, event: Event) {
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                // Rejected input is a silent no-op for the caller
                tracing::debug!(state = self.state.kind(), reason = %e, "Event dropped");
                return;
            }
        };

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        tracing::debug!(
            from = old_state.kind(),
            to = self.state.kind(),
            step_id = ?self.state.step_id(),
            "Transition"
        );

        for effect in result.effects {
            self.execute_effect(effect);
        }

        if old_state != self.state {
            let _ = self.broadcast_tx.send(FlowEvent::StateChange {
                state: self.state.clone(),
            });
        }
        self.publish_snapshot();
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::CancelPending => self.cancel_pending(),

            Effect::ResetRun => {
                self.messages.clear();
                self.profile.clear();
            }

            Effect::StoreField { key, value } => {
                self.profile.insert(key, value);
            }

            Effect::AppendUserMessage { content } => {
                let message = Message::user(self.ids.next_id(), content);
                self.append(message);
            }

            Effect::AppendAiMessage { step_id } => {
                let Some(step) = self.context.definition.get(&step_id) else {
                    tracing::warn!(%step_id, "Cannot compose message for unknown step");
                    return;
                };
                let content = interpolate(&step.template, &self.profile);
                let message = Message::ai(self.ids.next_id(), step, content);
                self.append(message);
            }

            Effect::ScheduleTimer { kind, delay } => self.schedule(kind, delay),

            Effect::NotifyCompleted { reason } => {
                match &reason {
                    CompletionReason::Finished { step_id } => {
                        tracing::info!(%step_id, "Flow complete");
                    }
                    CompletionReason::UnresolvedStep { step_id } => {
                        tracing::warn!(%step_id, "Step not found, ending flow");
                    }
                }
                let _ = self.broadcast_tx.send(FlowEvent::Completed { reason });
            }
        }
    }

    fn append(&mut self, message: Message) {
        tracing::debug!(message_id = message.id, role = ?message.role, "Appending message");
        self.messages.push(message.clone());
        let _ = self.broadcast_tx.send(FlowEvent::MessageAppended { message });
    }

    /// Spawn a cancellable sleep that reports back on the timer channel.
    /// Always replaces the outstanding timer.
    fn schedule(&mut self, kind: TimerKind, delay: Duration) {
        self.cancel_pending();

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let timer_tx = self.timer_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = cancelled.cancelled() => {}

                () = tokio::time::sleep(delay) => {
                    let _ = timer_tx.send(TimerFired { ticket, kind });
                }
            }
        });

        tracing::debug!(ticket, ?kind, ?delay, "Scheduled timer");
        self.pending = Some(PendingTimer {
            ticket,
            kind,
            token,
        });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(ticket = pending.ticket, kind = ?pending.kind, "Cancelling timer");
            pending.token.cancel();
        }
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(FlowSnapshot {
            state: self.state.clone(),
            messages: self.messages.clone(),
            profile: self.profile.clone(),
            is_typing: self.state.is_typing(),
            is_complete: self.state.is_complete(),
            current_step_id: self.state.step_id().map(String::from),
        });
    }

    #[cfg(test)]
    pub(crate) fn pending_ticket(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &FlowState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn messages(&self) -> &[Message] {
        &self.messages
    }
}
