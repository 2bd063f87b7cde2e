use std::sync::PoisonError;

use shared::domain::{Message, MessageId, Role, Source};
use tracing::{debug, info, warn};

use crate::{config::BackendUnavailablePolicy, view, ControllerEvent, DocQaController, SlotGuard};

pub const APOLOGY_TEXT: &str =
    "Sorry, I couldn't get an answer to that question. Please try again.";
pub const OFFLINE_TEXT: &str = "The document service is unreachable right now, so this question could not be answered from your documents. Ask again once the backend is back online.";
pub const TYPING_TEXT: &str = "Thinking...";

#[derive(Debug, Default)]
pub(crate) struct ChatState {
    history: Vec<Message>,
    typing: Option<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyInput,
    NotReady,
    TurnInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing was appended and no request was issued.
    Rejected(RejectReason),
    Answered { message_id: MessageId },
    Failed { message_id: MessageId },
}

/// Holds the single turn slot. Dropping it removes the typing placeholder (if
/// still shown), frees the slot and re-enables submission, on every exit path.
/// The slot is released only through its own guard, and before the new
/// submission state is published.
struct TurnGuard<'a> {
    controller: &'a DocQaController,
    slot: Option<SlotGuard<'a>>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.controller.remove_typing_placeholder();
        drop(self.slot.take());
        self.controller.publish_submission_state();
    }
}

impl DocQaController {
    /// Persisted history, oldest first. Never contains the typing placeholder.
    pub fn history(&self) -> Vec<Message> {
        self.chat_state().history.clone()
    }

    pub fn typing_placeholder(&self) -> Option<Message> {
        self.chat_state().typing.clone()
    }

    pub async fn submit_message(&self, input: &str) -> TurnOutcome {
        let query = input.trim();
        if query.is_empty() {
            return TurnOutcome::Rejected(RejectReason::EmptyInput);
        }
        if !self.status().is_ready() {
            debug!("submission ignored: backend not ready");
            return TurnOutcome::Rejected(RejectReason::NotReady);
        }
        let Some(slot) = SlotGuard::try_acquire(&self.turn_in_flight) else {
            debug!("submission ignored: a turn is already in flight");
            return TurnOutcome::Rejected(RejectReason::TurnInFlight);
        };
        let turn = TurnGuard {
            controller: self,
            slot: Some(slot),
        };
        self.publish_submission_state();

        self.append_message(Role::User, query.to_string(), Vec::new());
        self.emit(ControllerEvent::InputCleared);
        self.insert_typing_placeholder();

        let result = self.backend.query(query).await;
        self.remove_typing_placeholder();

        let outcome = match result {
            Ok(answer) => {
                info!(sources = answer.sources.len(), "query answered");
                let message_id = self.append_message(Role::Assistant, answer.text, answer.sources);
                TurnOutcome::Answered { message_id }
            }
            Err(err) => {
                warn!(error = %err, code = ?err.code(), "query failed");
                let text = match self.settings.on_backend_unavailable {
                    BackendUnavailablePolicy::SurfaceError => APOLOGY_TEXT,
                    BackendUnavailablePolicy::Degrade => OFFLINE_TEXT,
                };
                let message_id = self.append_message(Role::Assistant, text.to_string(), Vec::new());
                TurnOutcome::Failed { message_id }
            }
        };

        drop(turn);
        outcome
    }

    fn chat_state(&self) -> std::sync::MutexGuard<'_, ChatState> {
        self.chat.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append_message(&self, role: Role, text: String, sources: Vec<Source>) -> MessageId {
        let message = Message {
            id: self.allocate_message_id(),
            role,
            text,
            sources,
            timestamp: self.clock.now(),
        };
        let id = message.id;
        let html = view::render_message(&message);
        self.chat_state().history.push(message.clone());
        self.emit(ControllerEvent::MessageAppended { message, html });
        id
    }

    fn insert_typing_placeholder(&self) {
        let placeholder = Message {
            id: self.allocate_message_id(),
            role: Role::Assistant,
            text: TYPING_TEXT.to_string(),
            sources: Vec::new(),
            timestamp: self.clock.now(),
        };
        self.chat_state().typing = Some(placeholder.clone());
        self.emit(ControllerEvent::TypingStarted(placeholder));
    }

    /// Idempotent: only the first call after an insertion emits.
    fn remove_typing_placeholder(&self) {
        let removed = self.chat_state().typing.take();
        if let Some(placeholder) = removed {
            self.emit(ControllerEvent::TypingStopped(placeholder.id));
        }
    }
}

#[cfg(test)]
#[path = "tests/chat_tests.rs"]
mod tests;
