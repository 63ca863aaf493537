//! The interactive shell: one task that owns the terminal, translates input
//! into commands for the state manager, and redraws from shared state on
//! every event. Text being edited lives in a local buffer (the shared cell
//! source is updated when the edit is committed), everything else is read
//! fresh from [`AppState`] each pass.

pub mod input;
pub mod view;

use std::sync::Arc;

use axnote_core::{CellAction, DocumentAction, FocusTarget, Key, KeyChord, Keymap, Region};
use color_eyre::Result;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::{broadcast, mpsc};

use crate::AppEvent;
use crate::app_state::{AppState, LifecycleOp, StateCommand};
use crate::error::{ErrorExt, ResultExt};
use crate::event_bus::{ErrorEvent, EventBus};
use view::{EditView, Hit, LayoutMap, Notice, Snapshot};

/// Local buffer for the cell being edited. Keystrokes land here first and
/// reach shared state on commit; the cursor is a byte offset on a char
/// boundary.
#[derive(Debug)]
struct EditBuffer {
    index: usize,
    text: String,
    cursor: usize,
    dirty: bool,
}

impl EditBuffer {
    fn insert(&mut self, ch: char) {
        self.text.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        self.dirty = true;
    }

    fn insert_str(&mut self, text: &str) {
        self.text.insert_str(self.cursor, text);
        self.cursor += text.len();
        self.dirty = true;
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(at, _)| at)
    }

    fn backspace(&mut self) {
        if let Some(at) = self.prev_boundary() {
            self.text.remove(at);
            self.cursor = at;
            self.dirty = true;
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.text.len() {
            self.text.remove(self.cursor);
            self.dirty = true;
        }
    }

    fn left(&mut self) {
        if let Some(at) = self.prev_boundary() {
            self.cursor = at;
        }
    }

    fn right(&mut self) {
        if let Some(ch) = self.text[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    /// Byte range of the line containing `at`.
    fn line_bounds(&self, at: usize) -> (usize, usize) {
        let start = self.text[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let end = self.text[at..]
            .find('\n')
            .map(|i| at + i)
            .unwrap_or(self.text.len());
        (start, end)
    }

    fn vertical(&mut self, down: bool) {
        let (start, end) = self.line_bounds(self.cursor);
        let column = self.text[start..self.cursor].chars().count();
        let target_start = if down {
            if end >= self.text.len() {
                return;
            }
            end + 1
        } else {
            if start == 0 {
                return;
            }
            self.line_bounds(start - 1).0
        };
        let (target_start, target_end) = self.line_bounds(target_start);
        self.cursor = self.text[target_start..target_end]
            .char_indices()
            .nth(column)
            .map(|(at, _)| target_start + at)
            .unwrap_or(target_end);
    }

    fn home(&mut self) {
        self.cursor = self.line_bounds(self.cursor).0;
    }

    fn end(&mut self) {
        self.cursor = self.line_bounds(self.cursor).1;
    }
}

pub struct App {
    running: bool,
    state: Arc<AppState>,
    cmd_tx: mpsc::Sender<StateCommand>,
    event_rx: broadcast::Receiver<AppEvent>,
    error_rx: broadcast::Receiver<ErrorEvent>,
    keymap: Keymap,
    edit: Option<EditBuffer>,
    help_open: bool,
    notice: Option<Notice>,
    scroll: u16,
    layout: LayoutMap,
}

impl App {
    pub fn new(
        state: Arc<AppState>,
        cmd_tx: mpsc::Sender<StateCommand>,
        event_bus: &EventBus,
        keymap: Keymap,
    ) -> Self {
        App {
            running: false,
            state,
            cmd_tx,
            event_rx: event_bus.subscribe(),
            error_rx: event_bus.subscribe_errors(),
            keymap,
            edit: None,
            help_open: false,
            notice: None,
            scroll: 0,
            layout: LayoutMap::default(),
        }
    }

    pub async fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        self.running = true;
        let _ = execute!(std::io::stdout(), EnableMouseCapture).log_warning();
        let mut events = crossterm::event::EventStream::new();

        while self.running {
            self.draw(&mut terminal).await?;
            tokio::select! {
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(event)) => self.on_crossterm_event(event).await,
                    Some(Err(err)) => err.log_warning(),
                    None => self.running = false,
                },
                app_event = self.event_rx.recv() => match app_event {
                    Ok(event) => self.on_app_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => self.running = false,
                },
                error_event = self.error_rx.recv() => match error_event {
                    Ok(event) => {
                        self.notice = Some(Notice { text: event.message, is_error: true });
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => self.running = false,
                },
            }
        }

        let _ = execute!(std::io::stdout(), DisableMouseCapture).log_warning();
        Ok(())
    }

    async fn draw(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let snapshot = self.snapshot().await;
        let keymap = self.keymap.clone();
        let mut layout = LayoutMap::default();
        terminal.draw(|frame| {
            layout = view::render(frame, &snapshot, &keymap);
        })?;
        self.scroll = layout.scroll;
        self.layout = layout;
        Ok(())
    }

    async fn snapshot(&self) -> Snapshot {
        let session = self.state.notebook.read().await.clone();
        let system = self.state.system.read().await.clone();
        Snapshot {
            session,
            system,
            edit: self.edit.as_ref().map(|edit| EditView {
                index: edit.index,
                text: edit.text.clone(),
                cursor: edit.cursor,
            }),
            help_open: self.help_open,
            notice: self.notice.clone(),
            scroll: self.scroll,
        }
    }

    async fn on_crossterm_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key).await,
            Event::Mouse(mouse) => self.on_mouse_event(mouse).await,
            _ => {}
        }
    }

    /// True while keyboard focus is inside the editing cell's source region.
    async fn focus_in_edit_source(&self) -> bool {
        let session = self.state.notebook.read().await;
        match session.focus() {
            FocusTarget::Cell {
                index,
                region: Region::Source,
            } => session
                .document
                .get(index)
                .is_some_and(axnote_core::Cell::is_editing),
            _ => false,
        }
    }

    async fn on_key_event(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.running = false;
            return;
        }
        if self.help_open {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')
            ) {
                self.help_open = false;
            }
            return;
        }

        // Inside the editable source region unmodified keys are text entry,
        // including the bare enter that inserts a literal newline; only
        // escape and modified chords reach dispatch from here.
        if self.focus_in_edit_source().await
            && !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            && key.code != KeyCode::Esc
        {
            self.on_edit_key(key);
            return;
        }

        let Some(chord) = input::chord_for(&key) else {
            self.on_navigation_key(key).await;
            return;
        };

        let (current, focus, document_empty) = {
            let session = self.state.notebook.read().await;
            (
                session.current_cell(),
                session.focus(),
                session.document.is_empty(),
            )
        };

        // Enter on the end placeholder presses the add-cell control.
        if chord == KeyChord::bare(Key::Enter) && focus == FocusTarget::EndPlaceholder {
            self.perform_document_action(DocumentAction::AddCell).await;
            return;
        }

        if let Some(action) = self.keymap.cell_action(&chord) {
            if let Some(index) = current {
                self.perform_cell_action(action, index).await;
                return;
            }
            // An empty document still accepts a paste; anchor it at the
            // start.
            if document_empty
                && matches!(action, CellAction::InsertBefore | CellAction::InsertAfter)
            {
                self.commit_edit().await;
                let _ = self
                    .cmd_tx
                    .send(StateCommand::InsertBefore { index: 0 })
                    .await;
                return;
            }
        }

        if let Some(action) = self.keymap.document_action(&chord) {
            self.perform_document_action(action).await;
            return;
        }

        // Unmatched chords fall through to default input handling.
        self.on_navigation_key(key).await;
    }

    fn on_edit_key(&mut self, key: KeyEvent) {
        let Some(edit) = &mut self.edit else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => edit.insert(c),
            KeyCode::Enter => edit.insert('\n'),
            KeyCode::Tab => edit.insert_str("    "),
            KeyCode::Backspace => edit.backspace(),
            KeyCode::Delete => edit.delete(),
            KeyCode::Left => edit.left(),
            KeyCode::Right => edit.right(),
            KeyCode::Up => edit.vertical(false),
            KeyCode::Down => edit.vertical(true),
            KeyCode::Home => edit.home(),
            KeyCode::End => edit.end(),
            _ => {}
        }
    }

    async fn on_navigation_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.move_cell(-1).await,
            KeyCode::Down => self.move_cell(1).await,
            KeyCode::Tab => self.cycle_focus(true).await,
            KeyCode::BackTab => self.cycle_focus(false).await,
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            _ => {}
        }
    }

    async fn move_cell(&mut self, delta: isize) {
        self.commit_edit().await;
        let (len, current) = {
            let session = self.state.notebook.read().await;
            (session.document.len(), session.focus().cell_index())
        };
        let target = match (current, delta) {
            (Some(index), 1) => {
                if index + 1 < len {
                    FocusTarget::output(index + 1)
                } else {
                    FocusTarget::EndPlaceholder
                }
            }
            (Some(index), _) => FocusTarget::output(index.saturating_sub(1)),
            (None, delta) if delta < 0 && len > 0 => FocusTarget::output(len - 1),
            _ => return,
        };
        let _ = self.cmd_tx.send(StateCommand::SetFocus { target }).await;
    }

    async fn cycle_focus(&mut self, forward: bool) {
        self.commit_edit().await;
        let target = {
            let session = self.state.notebook.read().await;
            if forward {
                session.next_focus()
            } else {
                session.prev_focus()
            }
        };
        let _ = self.cmd_tx.send(StateCommand::SetFocus { target }).await;
    }

    /// Push any pending edit-buffer text into shared state, so commands that
    /// read the cell's source see what is on screen.
    async fn commit_edit(&mut self) {
        if let Some(edit) = &mut self.edit {
            if edit.dirty {
                edit.dirty = false;
                let _ = self
                    .cmd_tx
                    .send(StateCommand::UpdateSource {
                        index: edit.index,
                        source: edit.text.clone(),
                    })
                    .await;
            }
        }
    }

    async fn perform_cell_action(&mut self, action: CellAction, index: usize) {
        self.commit_edit().await;
        let cmd = match action {
            CellAction::Execute => StateCommand::ExecuteCell { index, done: None },
            CellAction::EnterEdit => StateCommand::EnterEdit { index },
            CellAction::ExitEdit => StateCommand::ExitEditToOutput { index },
            CellAction::ToggleType => StateCommand::ToggleCellType { index },
            CellAction::Cut => StateCommand::CutCell { index },
            CellAction::InsertBefore => StateCommand::InsertBefore { index },
            CellAction::InsertAfter => StateCommand::InsertAfter { index },
        };
        let _ = self.cmd_tx.send(cmd).await;
    }

    async fn perform_document_action(&mut self, action: DocumentAction) {
        self.commit_edit().await;
        let cmd = match action {
            DocumentAction::ShowHelp => {
                self.help_open = true;
                return;
            }
            DocumentAction::ToggleToolbars => {
                let reachable = self.state.notebook.read().await.toolbars_reachable();
                StateCommand::SetToolbarsReachable {
                    reachable: !reachable,
                }
            }
            DocumentAction::RunAll => StateCommand::RunAll,
            DocumentAction::AddCell => StateCommand::AddCell,
            DocumentAction::StartKernel => StateCommand::Kernel {
                op: LifecycleOp::Start,
            },
            DocumentAction::RestartKernel => StateCommand::Kernel {
                op: LifecycleOp::Restart,
            },
            DocumentAction::ShutdownKernel => StateCommand::Kernel {
                op: LifecycleOp::Shutdown,
            },
            DocumentAction::SaveNotebook => StateCommand::SaveNotebook,
            DocumentAction::OpenNotebook => StateCommand::ReloadNotebook,
            DocumentAction::NewNotebook => StateCommand::NewNotebook,
        };
        let _ = self.cmd_tx.send(cmd).await;
    }

    /// The click router: toolbar hits perform the control's action, content
    /// hits make the cell current and start editing it, like a click on the
    /// rendered document would.
    async fn on_mouse_event(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let Some(hit) = self.layout.hit(mouse.column, mouse.row) else {
            return;
        };
        self.commit_edit().await;
        match hit {
            Hit::Button { index, action } => self.perform_cell_action(action, index).await,
            Hit::CellContent { index } => {
                let _ = self.cmd_tx.send(StateCommand::EnterEdit { index }).await;
            }
            Hit::AddCell => {
                let _ = self.cmd_tx.send(StateCommand::AddCell).await;
            }
        }
    }

    async fn on_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::NotebookUpdated => self.sync_edit_state().await,
            AppEvent::KernelStatus { .. } => {}
            AppEvent::NotebookSaved { path } => {
                self.notice = Some(Notice {
                    text: format!("Saved {}", path.display()),
                    is_error: false,
                });
            }
            AppEvent::NotebookLoaded { name } => {
                self.notice = Some(Notice {
                    text: format!("Loaded {name}"),
                    is_error: false,
                });
            }
        }
    }

    /// Reconcile the local edit buffer with whichever cell (if any) the
    /// shared state says is editing.
    async fn sync_edit_state(&mut self) {
        let session = self.state.notebook.read().await;
        match session.document.editing_index() {
            Some(index) => {
                let stale = self.edit.as_ref().map(|edit| edit.index) != Some(index);
                if stale {
                    let text = session
                        .document
                        .get(index)
                        .expect("editing index in range")
                        .source
                        .clone();
                    let cursor = text.len();
                    self.edit = Some(EditBuffer {
                        index,
                        text,
                        cursor,
                        dirty: false,
                    });
                }
            }
            None => self.edit = None,
        }
    }
}
