use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::trace_span;

use super::commands::StateCommand;
use super::core::AppState;
use super::handlers;
use crate::EventBus;
use crate::executor::KernelRequest;

/// The single writer of shared state. Every mutation arrives here as a
/// [`StateCommand`]; kernel work is forwarded to the kernel manager and its
/// completions come back through the same channel.
pub async fn state_manager(
    state: Arc<AppState>,
    mut cmd_rx: mpsc::Receiver<StateCommand>,
    kernel_tx: mpsc::Sender<KernelRequest>,
    event_bus: Arc<EventBus>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let span = trace_span!("processing", cmd = %cmd.discriminant());
        let _enter = span.enter();

        match cmd {
            StateCommand::ExecuteCell { index, done } => {
                handlers::notebook::execute_cell(&state, &event_bus, &kernel_tx, index, done).await;
            }
            StateCommand::EnterEdit { index } => {
                handlers::notebook::enter_edit(&state, &event_bus, index).await;
            }
            StateCommand::ExitEditToOutput { index } => {
                handlers::notebook::exit_edit_to_output(&state, &event_bus, index).await;
            }
            StateCommand::ToggleCellType { index } => {
                handlers::notebook::toggle_type(&state, &event_bus, index).await;
            }
            StateCommand::CutCell { index } => {
                handlers::notebook::cut(&state, &event_bus, index).await;
            }
            StateCommand::InsertBefore { index } => {
                handlers::notebook::insert_before(&state, &event_bus, index).await;
            }
            StateCommand::InsertAfter { index } => {
                handlers::notebook::insert_after(&state, &event_bus, index).await;
            }
            StateCommand::UpdateSource { index, source } => {
                handlers::notebook::update_source(&state, &event_bus, index, source).await;
            }
            StateCommand::AddCell => {
                handlers::notebook::add_cell(&state, &event_bus).await;
            }
            StateCommand::RunAll => {
                let _ = kernel_tx.send(KernelRequest::RunAll).await;
            }
            StateCommand::NewNotebook => {
                handlers::session::new_notebook(&state, &event_bus).await;
            }
            StateCommand::SaveNotebook => {
                handlers::session::save(&state, &event_bus).await;
            }
            StateCommand::OpenNotebook { path } => {
                handlers::session::open(&state, &event_bus, path).await;
            }
            StateCommand::ReloadNotebook => {
                handlers::session::reload(&state, &event_bus).await;
            }
            StateCommand::SetFocus { target } => {
                handlers::notebook::set_focus(&state, &event_bus, target).await;
            }
            StateCommand::SetToolbarsReachable { reachable } => {
                handlers::notebook::set_toolbars_reachable(&state, &event_bus, reachable).await;
            }
            StateCommand::Kernel { op } => {
                handlers::kernel::lifecycle(&state, &kernel_tx, op).await;
            }
            StateCommand::FinishExecution {
                run_id,
                outcome,
                done,
            } => {
                handlers::notebook::finish_execution(&state, &event_bus, run_id, outcome, done)
                    .await;
            }
            StateCommand::FinishLifecycle { op, result } => {
                handlers::kernel::finish_lifecycle(&state, &event_bus, op, result).await;
            }
        }
    }
}
