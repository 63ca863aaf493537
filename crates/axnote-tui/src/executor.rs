//! Kernel manager: the execution coordinator subsystem.
//!
//! Owns the [`KernelClient`] and performs every call to the execution
//! service. Requests arrive from the state manager; completions go back to
//! it as [`StateCommand`]s so all state mutation stays in one place. Each
//! execute request runs in its own task: nothing limits concurrent requests
//! across different cells, only the per-cell trigger disable prevents
//! re-triggering one cell mid-flight. There is no cancellation; an in-flight
//! request always runs to a completion command.

use std::sync::Arc;

use axnote_kernel::{KernelClient, KernelError};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::app_state::commands::{ExecOutcome, LifecycleOp, StateCommand};
use crate::app_state::core::AppState;

/// Requests the state manager forwards to the kernel manager.
#[derive(Debug)]
pub enum KernelRequest {
    Execute {
        run_id: Uuid,
        code: String,
        done: Option<oneshot::Sender<()>>,
    },
    RunAll,
    Lifecycle {
        op: LifecycleOp,
    },
}

pub async fn kernel_manager(
    mut req_rx: mpsc::Receiver<KernelRequest>,
    state: Arc<AppState>,
    cmd_tx: mpsc::Sender<StateCommand>,
    client: KernelClient,
) {
    while let Some(request) = req_rx.recv().await {
        match request {
            KernelRequest::Execute { run_id, code, done } => {
                tokio::spawn(execute_one(client.clone(), cmd_tx.clone(), run_id, code, done));
            }
            KernelRequest::RunAll => {
                tokio::spawn(run_all(Arc::clone(&state), cmd_tx.clone()));
            }
            KernelRequest::Lifecycle { op } => {
                tokio::spawn(lifecycle(client.clone(), cmd_tx.clone(), op));
            }
        }
    }
}

/// One request round-trip. Every path, success or failure, ends in a
/// `FinishExecution` command, which is what re-enables the cell's trigger.
async fn execute_one(
    client: KernelClient,
    cmd_tx: mpsc::Sender<StateCommand>,
    run_id: Uuid,
    code: String,
    done: Option<oneshot::Sender<()>>,
) {
    let outcome = match client.execute(&code).await {
        Ok(output) => ExecOutcome::Output(output.text()),
        Err(KernelError::Execution(failure)) => {
            let trace =
                (!failure.traceback.is_empty()).then(|| failure.traceback.join("\n"));
            ExecOutcome::Failure {
                name: failure.ename,
                message: failure.evalue,
                trace,
            }
        }
        Err(err) => ExecOutcome::Failure {
            name: "Error".to_string(),
            message: err.to_string(),
            trace: None,
        },
    };
    let _ = cmd_tx
        .send(StateCommand::FinishExecution {
            run_id,
            outcome,
            done,
        })
        .await;
}

/// Execute every cell strictly in sequence order, awaiting each completion
/// before starting the next. A failure lands in that cell's output and the
/// sweep continues with the remaining cells.
async fn run_all(state: Arc<AppState>, cmd_tx: mpsc::Sender<StateCommand>) {
    let mut index = 0;
    loop {
        // Re-read the length each step; cells can move while a request is in
        // flight.
        let len = state.notebook.read().await.document.len();
        if index >= len {
            break;
        }
        let (done_tx, done_rx) = oneshot::channel();
        if cmd_tx
            .send(StateCommand::ExecuteCell {
                index,
                done: Some(done_tx),
            })
            .await
            .is_err()
        {
            break;
        }
        let _ = done_rx.await;
        index += 1;
    }
}

async fn lifecycle(client: KernelClient, cmd_tx: mpsc::Sender<StateCommand>, op: LifecycleOp) {
    let result = match op {
        LifecycleOp::Start => client.start().await.map(|_| true),
        LifecycleOp::Restart => client.restart().await.map(|_| true),
        LifecycleOp::Shutdown => client.shutdown().await.map(|_| false),
        LifecycleOp::Status => client.status().await,
    };
    let _ = cmd_tx
        .send(StateCommand::FinishLifecycle {
            op,
            result: result.map_err(|err| err.to_string()),
        })
        .await;
}
