//! axnote: a keyboard-first notebook client for the terminal.
//!
//! Architecture: one `state_manager` task is the single writer of shared
//! state, driven by [`StateCommand`] messages; the `kernel_manager` subsystem
//! owns every call to the execution service and reports completions back as
//! commands; the [`app::App`] task owns the terminal and translates key
//! presses, via the chord keymap, into commands. Redraw triggers and
//! user-visible errors fan out over the [`EventBus`].

pub mod app;
pub mod app_state;
pub mod error;
pub mod event_bus;
pub mod executor;
pub mod file_man;
pub mod markup;
pub mod tracing_setup;
pub mod user_config;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

use axnote_kernel::KernelClient;
use tokio::sync::mpsc;
use url::Url;

use app::App;
use app_state::{AppState, LifecycleOp, StateCommand, state_manager};
use executor::{KernelRequest, kernel_manager};
pub use event_bus::{ErrorEvent, EventBus, EventBusCaps};
use user_config::UserConfig;

/// Events fanned out to the UI (and anything else listening).
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Document, focus, or clipboard changed; redraw.
    NotebookUpdated,
    KernelStatus { alive: bool },
    NotebookLoaded { name: String },
    NotebookSaved { path: PathBuf },
}

pub async fn try_main() -> color_eyre::Result<()> {
    let config = UserConfig::load();
    // Keybinding overrides and the service URL are validated here, at
    // configuration time; a bad descriptor never reaches live dispatch.
    let keymap = config.keymap()?;
    let base = Url::parse(&config.kernel.base_url)?;
    let client = KernelClient::new(base);

    let event_bus = Arc::new(EventBus::new(EventBusCaps::default()));
    let state = Arc::new(AppState::new());
    let (cmd_tx, cmd_rx) = mpsc::channel::<StateCommand>(1024);
    let (kernel_tx, kernel_rx) = mpsc::channel::<KernelRequest>(64);

    tokio::spawn(state_manager(
        Arc::clone(&state),
        cmd_rx,
        kernel_tx,
        Arc::clone(&event_bus),
    ));
    tokio::spawn(kernel_manager(
        kernel_rx,
        Arc::clone(&state),
        cmd_tx.clone(),
        client,
    ));

    if config.kernel.autostart {
        cmd_tx
            .send(StateCommand::Kernel {
                op: LifecycleOp::Start,
            })
            .await?;
    } else {
        cmd_tx
            .send(StateCommand::Kernel {
                op: LifecycleOp::Status,
            })
            .await?;
    }

    if let Some(path) = std::env::args().nth(1) {
        cmd_tx
            .send(StateCommand::OpenNotebook { path: path.into() })
            .await?;
    }

    let terminal = ratatui::init();
    let app = App::new(Arc::clone(&state), cmd_tx, &event_bus, keymap);
    let result = app.run(terminal).await;
    ratatui::restore();
    result
}
