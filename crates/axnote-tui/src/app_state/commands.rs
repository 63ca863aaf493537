use std::path::PathBuf;

use axnote_core::FocusTarget;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Kernel lifecycle operations forwarded to the kernel manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    Start,
    Restart,
    Shutdown,
    Status,
}

impl LifecycleOp {
    pub fn name(self) -> &'static str {
        match self {
            LifecycleOp::Start => "start",
            LifecycleOp::Restart => "restart",
            LifecycleOp::Shutdown => "shutdown",
            LifecycleOp::Status => "status",
        }
    }
}

/// Result of one code execution, as applied to the cell's output region.
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    Output(String),
    Failure {
        name: String,
        message: String,
        trace: Option<String>,
    },
}

/// Every mutation of the shared state, as a message to the state manager.
///
/// `done` senders, where present, are acknowledged on every exit path of the
/// command, success or failure; "run all" relies on that to sequence cells.
#[derive(Debug)]
pub enum StateCommand {
    // Cell scope.
    ExecuteCell {
        index: usize,
        done: Option<oneshot::Sender<()>>,
    },
    EnterEdit {
        index: usize,
    },
    ExitEditToOutput {
        index: usize,
    },
    ToggleCellType {
        index: usize,
    },
    CutCell {
        index: usize,
    },
    InsertBefore {
        index: usize,
    },
    InsertAfter {
        index: usize,
    },
    UpdateSource {
        index: usize,
        source: String,
    },

    // Document scope.
    AddCell,
    RunAll,
    NewNotebook,
    SaveNotebook,
    OpenNotebook {
        path: PathBuf,
    },
    /// Re-open the notebook from the path it was last opened from or saved
    /// to.
    ReloadNotebook,

    // Focus and reachability.
    SetFocus {
        target: FocusTarget,
    },
    SetToolbarsReachable {
        reachable: bool,
    },

    // Kernel plumbing.
    Kernel {
        op: LifecycleOp,
    },
    FinishExecution {
        run_id: Uuid,
        outcome: ExecOutcome,
        done: Option<oneshot::Sender<()>>,
    },
    FinishLifecycle {
        op: LifecycleOp,
        result: Result<bool, String>,
    },
}

impl StateCommand {
    pub fn discriminant(&self) -> &'static str {
        use StateCommand::*;
        match self {
            ExecuteCell { .. } => "ExecuteCell",
            EnterEdit { .. } => "EnterEdit",
            ExitEditToOutput { .. } => "ExitEditToOutput",
            ToggleCellType { .. } => "ToggleCellType",
            CutCell { .. } => "CutCell",
            InsertBefore { .. } => "InsertBefore",
            InsertAfter { .. } => "InsertAfter",
            UpdateSource { .. } => "UpdateSource",
            AddCell => "AddCell",
            RunAll => "RunAll",
            NewNotebook => "NewNotebook",
            SaveNotebook => "SaveNotebook",
            OpenNotebook { .. } => "OpenNotebook",
            ReloadNotebook => "ReloadNotebook",
            SetFocus { .. } => "SetFocus",
            SetToolbarsReachable { .. } => "SetToolbarsReachable",
            Kernel { .. } => "Kernel",
            FinishExecution { .. } => "FinishExecution",
            FinishLifecycle { .. } => "FinishLifecycle",
        }
    }
}
