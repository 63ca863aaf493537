use std::path::PathBuf;

use axnote_core::Session;
use tokio::sync::RwLock;

/// The one shared-state object for the whole session. All mutation happens
/// in the state-manager task; other tasks hold read guards briefly and never
/// cache what they read across an await.
#[derive(Debug)]
pub struct AppState {
    pub notebook: NotebookState,
    pub system: SystemState,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            notebook: NotebookState::new(Session::new()),
            system: SystemState::default(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}

#[derive(Debug)]
pub struct NotebookState(pub RwLock<Session>);

impl NotebookState {
    pub fn new(session: Session) -> Self {
        NotebookState(RwLock::new(session))
    }
}

impl std::ops::Deref for NotebookState {
    type Target = RwLock<Session>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct SystemState(pub RwLock<SystemStatus>);

impl std::ops::Deref for SystemState {
    type Target = RwLock<SystemStatus>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default, Clone)]
pub struct SystemStatus {
    /// Last known liveness of the execution kernel.
    pub kernel_alive: bool,
    /// A lifecycle request (start/restart/shutdown) is in flight; its
    /// triggers are disabled until it completes.
    pub lifecycle_busy: bool,
    /// Where the current notebook was opened from or last saved to.
    pub notebook_path: Option<PathBuf>,
}
