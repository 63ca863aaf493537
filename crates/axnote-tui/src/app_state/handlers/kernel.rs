//! Handlers for kernel lifecycle state.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::AppEvent;
use crate::app_state::commands::LifecycleOp;
use crate::app_state::core::AppState;
use crate::error::ErrorSeverity;
use crate::event_bus::EventBus;
use crate::executor::KernelRequest;

/// Forward a lifecycle request to the kernel manager. Start, restart, and
/// shutdown share one busy flag so their triggers are disabled while any of
/// them is in flight; the status probe never blocks and is never blocked.
pub async fn lifecycle(
    state: &Arc<AppState>,
    kernel_tx: &mpsc::Sender<KernelRequest>,
    op: LifecycleOp,
) {
    if op != LifecycleOp::Status {
        let mut system = state.system.write().await;
        if system.lifecycle_busy {
            return;
        }
        system.lifecycle_busy = true;
    }
    let _ = kernel_tx.send(KernelRequest::Lifecycle { op }).await;
}

/// Apply a lifecycle result. The busy flag is cleared on every exit path.
///
/// A successful restart clears every cell's output immediately. A reply for
/// an execution that was already in flight across the restart is not
/// suppressed, so it may repopulate its cell's output afterwards; the
/// service exposes no kernel generation to fence such replies with.
pub async fn finish_lifecycle(
    state: &Arc<AppState>,
    event_bus: &EventBus,
    op: LifecycleOp,
    result: Result<bool, String>,
) {
    {
        let mut system = state.system.write().await;
        if op != LifecycleOp::Status {
            system.lifecycle_busy = false;
        }
        match &result {
            Ok(alive) => system.kernel_alive = *alive,
            // A failed probe means nobody is listening; a failed control
            // call leaves the last known liveness in place.
            Err(_) if op == LifecycleOp::Status => system.kernel_alive = false,
            Err(_) => {}
        }
    }

    match result {
        Ok(alive) => {
            if op == LifecycleOp::Restart {
                state.notebook.write().await.clear_outputs();
                event_bus.send(AppEvent::NotebookUpdated);
            }
            event_bus.send(AppEvent::KernelStatus { alive });
        }
        Err(message) => {
            event_bus.send_error(
                format!("kernel {}: {message}", op.name()),
                ErrorSeverity::Error,
            );
        }
    }
}
