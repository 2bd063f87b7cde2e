use std::sync::{Arc, PoisonError};

use shared::domain::{SystemState, SystemStatus, ToastKind};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{ControllerEvent, DocQaController, SlotGuard};

const READY_MESSAGE: &str = "System ready";
const INITIALIZING_MESSAGE: &str = "Backend is initializing...";

impl DocQaController {
    /// One status request. Updates the indicator and the submission gate.
    /// Callers outside the monitor go through `recheck_status`, so two checks
    /// never overlap.
    pub(crate) async fn check_status(&self) -> SystemState {
        let next = match self.backend.status().await {
            Ok(response) if response.is_ready() => {
                SystemStatus::ready(response.reason().unwrap_or(READY_MESSAGE))
            }
            Ok(response) => {
                debug!(status = %response.status, "backend not ready yet");
                SystemStatus::initializing(response.reason().unwrap_or(INITIALIZING_MESSAGE))
            }
            Err(err) => {
                warn!(error = %err, code = ?err.code(), "status check failed");
                SystemStatus::error(err.user_message("Status check"))
            }
        };

        let state = next.state;
        let text = next.message.clone();
        let previous = self.set_status(next);
        // Only entering Error is announced; repeated failed polls stay quiet.
        if state == SystemState::Error && previous != SystemState::Error {
            self.notifications.push(text, ToastKind::Error).await;
        }
        state
    }

    /// Polls until the backend is ready or a check fails. Only one monitor
    /// runs at a time; a second caller returns the current state at once.
    pub async fn run_readiness_monitor(&self) -> SystemState {
        let Some(_running) = SlotGuard::try_acquire(&self.monitor_running) else {
            debug!("readiness monitor already running");
            return self.status().state;
        };

        loop {
            match self.check_status().await {
                SystemState::Ready => {
                    info!("backend ready");
                    return SystemState::Ready;
                }
                SystemState::Initializing => {
                    self.clock.sleep(self.settings.status_retry_delay).await;
                }
                SystemState::Error if self.settings.retry_status_on_error => {
                    self.clock.sleep(self.settings.status_retry_delay).await;
                }
                SystemState::Error => return SystemState::Error,
            }
        }
    }

    pub fn spawn_readiness_monitor(self: &Arc<Self>) -> JoinHandle<SystemState> {
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.run_readiness_monitor().await })
    }

    /// Explicit user re-trigger after an Error. No-op once Ready.
    pub fn recheck_status(self: &Arc<Self>) -> Option<JoinHandle<SystemState>> {
        if self.status().is_ready() {
            return None;
        }
        Some(self.spawn_readiness_monitor())
    }

    /// Returns the state that was replaced.
    fn set_status(&self, status: SystemStatus) -> SystemState {
        let previous = {
            let mut guard = self.status.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, status.clone()).state
        };
        self.emit(ControllerEvent::StatusChanged(status));
        self.publish_submission_state();
        previous
    }
}

#[cfg(test)]
#[path = "tests/readiness_tests.rs"]
mod tests;
