use uuid::Uuid;

use crate::document::{Cell, CellMode, CellType, Document, OutputState};

pub const UNTITLED: &str = "Untitled.ipynb";

/// Focusable sub-region of a cell.
///
/// `Toolbar` stops exist in the sequential navigation order only while
/// toolbars have been made reachable; `Source` only while the cell is in
/// edit mode. This keeps the linear navigation path short for assistive
/// technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Toolbar,
    Source,
    Output,
}

/// Target of keyboard focus inside the notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Cell { index: usize, region: Region },
    /// The add-cell control after the last cell; also where focus lands when
    /// the document empties.
    EndPlaceholder,
}

impl FocusTarget {
    pub fn output(index: usize) -> Self {
        FocusTarget::Cell {
            index,
            region: Region::Output,
        }
    }

    pub fn source(index: usize) -> Self {
        FocusTarget::Cell {
            index,
            region: Region::Source,
        }
    }

    pub fn cell_index(&self) -> Option<usize> {
        match self {
            FocusTarget::Cell { index, .. } => Some(*index),
            FocusTarget::EndPlaceholder => None,
        }
    }
}

/// All interactive session state: the document, the notebook name, the
/// single-slot move clipboard, and keyboard focus.
///
/// The "current cell" is the cell most recently entered by a focus
/// transition that crossed a cell boundary; moving between regions of the
/// same cell does not change it. Crossing a boundary forces the previous
/// current cell out of edit mode, which is what keeps at most one cell
/// editable document-wide.
#[derive(Debug, Clone)]
pub struct Session {
    pub document: Document,
    pub name: String,
    clipboard: Option<Cell>,
    focus: FocusTarget,
    current: Option<usize>,
    toolbars_reachable: bool,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            document: Document::new(),
            name: UNTITLED.to_string(),
            clipboard: None,
            focus: FocusTarget::EndPlaceholder,
            current: None,
            toolbars_reachable: false,
        }
    }

    pub fn focus(&self) -> FocusTarget {
        self.focus
    }

    pub fn current_cell(&self) -> Option<usize> {
        self.current
    }

    pub fn clipboard(&self) -> Option<&Cell> {
        self.clipboard.as_ref()
    }

    pub fn toolbars_reachable(&self) -> bool {
        self.toolbars_reachable
    }

    /// Put toolbar controls back into (or take them out of) the sequential
    /// navigation order.
    pub fn set_toolbars_reachable(&mut self, reachable: bool) {
        self.toolbars_reachable = reachable;
    }

    /// Move focus. A transition into a different cell than the current one
    /// forces the previous current cell out of edit mode.
    pub fn set_focus(&mut self, target: FocusTarget) {
        if let Some(to) = target.cell_index() {
            if to >= self.document.len() {
                return;
            }
            if self.current != Some(to) {
                if let Some(prev) = self.current.and_then(|i| self.document.get_mut(i)) {
                    prev.mode = CellMode::View;
                }
                self.current = Some(to);
            }
        }
        self.focus = target;
    }

    // ------------------------------------------------------------------
    // Cell state machine
    // ------------------------------------------------------------------

    /// Switch a cell into edit mode; no-op when it already is.
    ///
    /// A prose cell showing rendered output drops that output first, which
    /// also hides its edit affordance. Focus lands on the source region.
    pub fn enter_edit(&mut self, index: usize) {
        let Some(cell) = self.document.get_mut(index) else {
            return;
        };
        if cell.is_editing() {
            return;
        }
        if cell.cell_type == CellType::Prose && cell.output.is_rendered() {
            cell.output = OutputState::Empty;
        }
        cell.mode = CellMode::Edit;
        self.set_focus(FocusTarget::source(index));
    }

    /// Hide a cell's editable surface; no-op when it is already viewing.
    pub fn exit_edit(&mut self, index: usize) {
        if let Some(cell) = self.document.get_mut(index) {
            cell.mode = CellMode::View;
        }
    }

    /// Leave edit mode and land on the cell's output region (the escape
    /// binding).
    pub fn exit_edit_to_output(&mut self, index: usize) {
        if index >= self.document.len() {
            return;
        }
        self.exit_edit(index);
        self.set_focus(FocusTarget::output(index));
    }

    /// Flip a cell between code and prose. Only the type tag and its label
    /// change; source and output are untouched.
    pub fn toggle_type(&mut self, index: usize) {
        if let Some(cell) = self.document.get_mut(index) {
            cell.cell_type = cell.cell_type.toggled();
        }
    }

    /// Mark the start of an execution request for a code cell: the previous
    /// output is cleared and the run trigger stays disabled until
    /// [`Session::finish_run`] re-enables it.
    pub fn begin_run(&mut self, index: usize, run_id: Uuid) {
        if let Some(cell) = self.document.get_mut(index) {
            cell.output = OutputState::Empty;
            cell.run = Some(run_id);
        }
    }

    /// Apply a code execution outcome to whichever cell the request is still
    /// attached to, re-enabling its trigger. The cell is looked up by
    /// request id (it may have moved, or been cut onto the clipboard, while
    /// the request was in flight); returns `false` when it is gone entirely
    /// and the reply was dropped.
    pub fn finish_run(&mut self, run_id: Uuid, output: OutputState) -> bool {
        if let Some(index) = self.document.find_run(run_id) {
            let cell = self.document.get_mut(index).expect("index from find_run");
            cell.run = None;
            cell.output = output;
            return true;
        }
        if let Some(cell) = self
            .clipboard
            .as_mut()
            .filter(|cell| cell.run == Some(run_id))
        {
            cell.run = None;
            cell.output = output;
            return true;
        }
        false
    }

    /// Apply a prose render result. Success shows the rendered text and
    /// moves focus to the output region, implicitly leaving edit mode;
    /// failure records the error and leaves focus alone.
    pub fn finish_prose(&mut self, index: usize, result: Result<String, String>) {
        let Some(cell) = self.document.get_mut(index) else {
            return;
        };
        match result {
            Ok(text) => {
                cell.output = OutputState::Rendered { text };
                cell.mode = CellMode::View;
                self.set_focus(FocusTarget::output(index));
            }
            Err(message) => {
                cell.output = OutputState::Error {
                    name: "Error".to_string(),
                    message,
                    trace: None,
                };
            }
        }
    }

    /// Clear every cell's output; used when the execution service restarts.
    ///
    /// NOTE: in-flight `run` markers are left alone on purpose: a reply that
    /// was already in flight when the restart happened will still land in
    /// its cell afterwards. There is no kernel generation tag to drop it
    /// against.
    pub fn clear_outputs(&mut self) {
        for cell in self.document.iter_mut() {
            cell.output = OutputState::Empty;
        }
    }

    // ------------------------------------------------------------------
    // Clipboard / move engine
    // ------------------------------------------------------------------

    /// Remove a cell into the clipboard slot, overwriting any prior
    /// occupant. Focus moves to the successor, else the predecessor, else
    /// the end placeholder when the document empties. Returns the applied
    /// focus target.
    pub fn cut(&mut self, index: usize) -> Option<FocusTarget> {
        let cell = self.document.remove(index)?;
        self.clipboard = Some(cell);
        self.current = match self.current {
            Some(cur) if cur == index => None,
            Some(cur) if cur > index => Some(cur - 1),
            other => other,
        };
        let target = if index < self.document.len() {
            FocusTarget::output(index)
        } else if !self.document.is_empty() {
            FocusTarget::output(index - 1)
        } else {
            FocusTarget::EndPlaceholder
        };
        self.set_focus(target);
        Some(target)
    }

    /// Splice the clipboard cell in front of `index`; no-op when the slot is
    /// empty. Focus lands on the inserted cell's output region and the slot
    /// is cleared: the clipboard moves a cell, it never copies one.
    pub fn insert_before(&mut self, index: usize) -> Option<usize> {
        self.splice(index)
    }

    /// Splice the clipboard cell after `index`; same contract as
    /// [`Session::insert_before`].
    pub fn insert_after(&mut self, index: usize) -> Option<usize> {
        self.splice(index.saturating_add(1))
    }

    fn splice(&mut self, at: usize) -> Option<usize> {
        let cell = self.clipboard.take()?;
        let at = at.min(self.document.len());
        self.document.insert(at, cell);
        if let Some(cur) = self.current {
            if cur >= at {
                self.current = Some(cur + 1);
            }
        }
        self.set_focus(FocusTarget::output(at));
        Some(at)
    }

    // ------------------------------------------------------------------
    // Document-scope operations
    // ------------------------------------------------------------------

    /// Insert a fresh code cell after the current cell, enter edit mode on
    /// it, and focus its source region. Invoked from the end placeholder
    /// (or with no cell current) the new cell goes at the end.
    pub fn add_cell(&mut self) -> usize {
        let at = if self.focus == FocusTarget::EndPlaceholder {
            self.document.len()
        } else {
            match self.current {
                Some(index) => index + 1,
                None => self.document.len(),
            }
        };
        let at = at.min(self.document.len());
        self.document.insert(at, Cell::default());
        self.enter_edit(at);
        at
    }

    /// Replace the whole document; there is no merge with prior state.
    /// Focus lands on the first cell's output region, or the end placeholder
    /// for an empty document. Toolbars leave the navigation order again.
    pub fn load(&mut self, document: Document, name: impl Into<String>) {
        self.document = document;
        self.name = name.into();
        self.current = None;
        self.toolbars_reachable = false;
        self.focus = FocusTarget::EndPlaceholder;
        if !self.document.is_empty() {
            self.set_focus(FocusTarget::output(0));
        }
    }

    /// Discard the document and start over with a single empty code cell in
    /// edit mode.
    pub fn new_notebook(&mut self) {
        self.load(Document::new(), UNTITLED);
        self.add_cell();
    }

    /// Indices of prose cells, for the auto-render pass after a load.
    pub fn prose_indices(&self) -> Vec<usize> {
        self.document
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.cell_type == CellType::Prose)
            .map(|(index, _)| index)
            .collect()
    }

    // ------------------------------------------------------------------
    // Sequential navigation
    // ------------------------------------------------------------------

    /// The sequential keyboard navigation order. Toolbar stops appear only
    /// when toolbars are reachable; a source stop only while its cell is
    /// editing. The end placeholder is always last.
    pub fn tab_order(&self) -> Vec<FocusTarget> {
        let mut order = Vec::with_capacity(self.document.len() * 2 + 1);
        for (index, cell) in self.document.iter().enumerate() {
            if self.toolbars_reachable {
                order.push(FocusTarget::Cell {
                    index,
                    region: Region::Toolbar,
                });
            }
            if cell.is_editing() {
                order.push(FocusTarget::source(index));
            }
            order.push(FocusTarget::output(index));
        }
        order.push(FocusTarget::EndPlaceholder);
        order
    }

    /// The stop after the current focus, wrapping at the end.
    pub fn next_focus(&self) -> FocusTarget {
        let order = self.tab_order();
        let at = self.order_position(&order);
        order[(at + 1) % order.len()]
    }

    /// The stop before the current focus, wrapping at the start.
    pub fn prev_focus(&self) -> FocusTarget {
        let order = self.tab_order();
        let at = self.order_position(&order);
        order[(at + order.len() - 1) % order.len()]
    }

    fn order_position(&self, order: &[FocusTarget]) -> usize {
        order
            .iter()
            .position(|target| *target == self.focus)
            .or_else(|| {
                // A stop can vanish (e.g. source after leaving edit mode);
                // fall back to the owning cell's output stop.
                let index = self.focus.cell_index()?;
                order
                    .iter()
                    .position(|target| *target == FocusTarget::output(index))
            })
            .unwrap_or(order.len() - 1)
    }
}
