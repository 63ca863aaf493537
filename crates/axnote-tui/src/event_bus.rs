use tokio::sync::broadcast;

use crate::AppEvent;
use crate::error::ErrorSeverity;

/// A failure surfaced to the user in the status line.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub message: String,
    pub severity: ErrorSeverity,
}

/// Broadcast fan-out from the state manager to whoever is drawing or
/// logging. Send never blocks; a receiver that lags simply misses stale
/// redraw triggers.
#[derive(Debug)]
pub struct EventBus {
    event_tx: broadcast::Sender<AppEvent>,
    error_tx: broadcast::Sender<ErrorEvent>,
}

/// Convenience struct to help with the initialization of [`EventBus`].
#[derive(Clone, Copy)]
pub struct EventBusCaps {
    pub event_cap: usize,
    pub error_cap: usize,
}

impl Default for EventBusCaps {
    fn default() -> Self {
        Self {
            event_cap: 256,
            error_cap: 256,
        }
    }
}

impl EventBus {
    pub fn new(caps: EventBusCaps) -> Self {
        Self {
            event_tx: broadcast::channel(caps.event_cap).0,
            error_tx: broadcast::channel(caps.error_cap).0,
        }
    }

    pub fn send(&self, event: AppEvent) {
        let _ = self.event_tx.send(event); // ignore receiver count
    }

    pub fn send_error(&self, message: impl Into<String>, severity: ErrorSeverity) {
        let message = message.into();
        tracing::debug!(target: "axnote_tui::event_bus", %message, "error event");
        let _ = self.error_tx.send(ErrorEvent { message, severity });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<ErrorEvent> {
        self.error_tx.subscribe()
    }
}
