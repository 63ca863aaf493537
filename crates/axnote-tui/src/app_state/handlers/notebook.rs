//! Handlers for document and cell mutations.

use std::sync::Arc;

use axnote_core::{CellType, FocusTarget, OutputState, normalize};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::ack;
use crate::AppEvent;
use crate::app_state::commands::ExecOutcome;
use crate::app_state::core::AppState;
use crate::event_bus::EventBus;
use crate::executor::KernelRequest;
use crate::markup;

pub async fn enter_edit(state: &Arc<AppState>, event_bus: &EventBus, index: usize) {
    state.notebook.write().await.enter_edit(index);
    event_bus.send(AppEvent::NotebookUpdated);
}

pub async fn exit_edit_to_output(state: &Arc<AppState>, event_bus: &EventBus, index: usize) {
    state.notebook.write().await.exit_edit_to_output(index);
    event_bus.send(AppEvent::NotebookUpdated);
}

pub async fn toggle_type(state: &Arc<AppState>, event_bus: &EventBus, index: usize) {
    state.notebook.write().await.toggle_type(index);
    event_bus.send(AppEvent::NotebookUpdated);
}

pub async fn cut(state: &Arc<AppState>, event_bus: &EventBus, index: usize) {
    state.notebook.write().await.cut(index);
    event_bus.send(AppEvent::NotebookUpdated);
}

pub async fn insert_before(state: &Arc<AppState>, event_bus: &EventBus, index: usize) {
    state.notebook.write().await.insert_before(index);
    event_bus.send(AppEvent::NotebookUpdated);
}

pub async fn insert_after(state: &Arc<AppState>, event_bus: &EventBus, index: usize) {
    state.notebook.write().await.insert_after(index);
    event_bus.send(AppEvent::NotebookUpdated);
}

pub async fn update_source(state: &Arc<AppState>, event_bus: &EventBus, index: usize, source: String) {
    if let Some(cell) = state.notebook.write().await.document.get_mut(index) {
        cell.source = source;
    }
    event_bus.send(AppEvent::NotebookUpdated);
}

pub async fn add_cell(state: &Arc<AppState>, event_bus: &EventBus) {
    state.notebook.write().await.add_cell();
    event_bus.send(AppEvent::NotebookUpdated);
}

pub async fn set_focus(state: &Arc<AppState>, event_bus: &EventBus, target: FocusTarget) {
    state.notebook.write().await.set_focus(target);
    event_bus.send(AppEvent::NotebookUpdated);
}

pub async fn set_toolbars_reachable(state: &Arc<AppState>, event_bus: &EventBus, reachable: bool) {
    state.notebook.write().await.set_toolbars_reachable(reachable);
    event_bus.send(AppEvent::NotebookUpdated);
}

/// Execute one cell.
///
/// No-ops (still acknowledged) when the cell is gone, mid-flight, or has an
/// empty source. Prose renders synchronously right here; code marks the cell
/// busy and hands the request to the kernel manager, which reports back with
/// [`ExecOutcome`]. Either way `done` fires exactly once.
pub async fn execute_cell(
    state: &Arc<AppState>,
    event_bus: &EventBus,
    kernel_tx: &mpsc::Sender<KernelRequest>,
    index: usize,
    done: Option<oneshot::Sender<()>>,
) {
    let mut session = state.notebook.write().await;
    let Some(cell) = session.document.get(index) else {
        ack(done);
        return;
    };
    if cell.is_busy() {
        ack(done);
        return;
    }
    let source = cell.source.trim().to_string();
    if source.is_empty() {
        ack(done);
        return;
    }

    match cell.cell_type {
        CellType::Prose => {
            let normalized = normalize::normalize_prose(&source);
            let result = markup::render_prose(&normalized).map_err(|err| err.to_string());
            session.finish_prose(index, result);
            drop(session);
            event_bus.send(AppEvent::NotebookUpdated);
            ack(done);
        }
        CellType::Code => {
            let run_id = Uuid::new_v4();
            session.begin_run(index, run_id);
            drop(session);
            event_bus.send(AppEvent::NotebookUpdated);
            if kernel_tx
                .send(KernelRequest::Execute {
                    run_id,
                    code: source,
                    done,
                })
                .await
                .is_err()
            {
                // Kernel manager is gone; clear the marker so the trigger is
                // not left stuck. Its `done`, if any, went down with the
                // channel, which only happens at shutdown.
                state
                    .notebook
                    .write()
                    .await
                    .finish_run(run_id, OutputState::Empty);
            }
        }
    }
}

/// Land an execution reply on whichever cell the request is still attached
/// to; a reply whose cell has vanished is dropped.
pub async fn finish_execution(
    state: &Arc<AppState>,
    event_bus: &EventBus,
    run_id: Uuid,
    outcome: ExecOutcome,
    done: Option<oneshot::Sender<()>>,
) {
    let output = match outcome {
        ExecOutcome::Output(text) => OutputState::Rendered { text },
        ExecOutcome::Failure {
            name,
            message,
            trace,
        } => OutputState::Error {
            name,
            message,
            trace,
        },
    };
    let landed = state.notebook.write().await.finish_run(run_id, output);
    if !landed {
        tracing::debug!(%run_id, "dropping execution reply for a cell that no longer exists");
    }
    event_bus.send(AppEvent::NotebookUpdated);
    ack(done);
}
