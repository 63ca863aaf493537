//! Handlers for whole-notebook operations: new, save, open.

use std::path::PathBuf;
use std::sync::Arc;

use axnote_core::{FocusTarget, normalize, session::UNTITLED};

use crate::AppEvent;
use crate::app_state::core::AppState;
use crate::error::ErrorSeverity;
use crate::event_bus::EventBus;
use crate::file_man;
use crate::markup;

pub async fn new_notebook(state: &Arc<AppState>, event_bus: &EventBus) {
    state.notebook.write().await.new_notebook();
    state.system.write().await.notebook_path = None;
    event_bus.send(AppEvent::NotebookUpdated);
}

/// Save to the path the notebook came from, or to its name in the working
/// directory for a notebook that has never touched disk.
pub async fn save(state: &Arc<AppState>, event_bus: &EventBus) {
    let (document, name) = {
        let session = state.notebook.read().await;
        (session.document.clone(), session.name.clone())
    };
    let path = state
        .system
        .read()
        .await
        .notebook_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(&name));

    match file_man::save_notebook(&document, &path).await {
        Ok(()) => {
            state.system.write().await.notebook_path = Some(path.clone());
            event_bus.send(AppEvent::NotebookSaved { path });
        }
        Err(err) => {
            event_bus.send_error(format!("save failed: {err}"), ErrorSeverity::Error);
        }
    }
}

/// Open a notebook file. The file is parsed in full before the live session
/// is touched, so a malformed file leaves the current document intact. A
/// successful load replaces everything, renders every restored prose cell so
/// it reads immediately, and lands focus on the first cell's output region.
pub async fn open(state: &Arc<AppState>, event_bus: &EventBus, path: PathBuf) {
    let document = match file_man::load_notebook(&path).await {
        Ok(document) => document,
        Err(err) => {
            event_bus.send_error(format!("open failed: {err}"), ErrorSeverity::Error);
            return;
        }
    };

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNTITLED.to_string());

    {
        let mut session = state.notebook.write().await;
        session.load(document, name.clone());
        for index in session.prose_indices() {
            let source = session
                .document
                .get(index)
                .expect("prose index in range")
                .source
                .trim()
                .to_string();
            if source.is_empty() {
                continue;
            }
            let normalized = normalize::normalize_prose(&source);
            let result = markup::render_prose(&normalized).map_err(|err| err.to_string());
            session.finish_prose(index, result);
        }
        if !session.document.is_empty() {
            session.set_focus(FocusTarget::output(0));
        }
    }

    state.system.write().await.notebook_path = Some(path);
    event_bus.send(AppEvent::NotebookLoaded { name });
    event_bus.send(AppEvent::NotebookUpdated);
}

pub async fn reload(state: &Arc<AppState>, event_bus: &EventBus) {
    let path = state.system.read().await.notebook_path.clone();
    match path {
        Some(path) => open(state, event_bus, path).await,
        None => event_bus.send_error(
            "no notebook file to reload; save or open one first",
            ErrorSeverity::Warning,
        ),
    }
}
