use std::borrow::Cow;

use uuid::Uuid;

/// Kind of a notebook cell: executable code or lightweight prose markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellType {
    #[default]
    Code,
    Prose,
}

impl CellType {
    /// Label shown in the cell's type indicator.
    pub fn label(self) -> &'static str {
        match self {
            CellType::Code => "Code",
            CellType::Prose => "Prose",
        }
    }

    /// The other kind; used by the toggle-type action.
    pub fn toggled(self) -> Self {
        match self {
            CellType::Code => CellType::Prose,
            CellType::Prose => CellType::Code,
        }
    }
}

/// Whether a cell currently exposes its editable source region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellMode {
    #[default]
    View,
    Edit,
}

/// State of a cell's output region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputState {
    #[default]
    Empty,
    Rendered {
        text: String,
    },
    Error {
        name: String,
        message: String,
        trace: Option<String>,
    },
}

impl OutputState {
    pub fn is_empty(&self) -> bool {
        matches!(self, OutputState::Empty)
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, OutputState::Rendered { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, OutputState::Error { .. })
    }

    /// Text shown in the output region. An error shows the full trace when
    /// the service supplied one, else `name: message`.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            OutputState::Empty => Cow::Borrowed(""),
            OutputState::Rendered { text } => Cow::Borrowed(text),
            OutputState::Error {
                name,
                message,
                trace,
            } => match trace {
                Some(trace) => Cow::Borrowed(trace.as_str()),
                None => Cow::Owned(format!("{name}: {message}")),
            },
        }
    }
}

/// One cell of a notebook document.
///
/// A cell's position is its index in the owning [`Document`]; cells carry no
/// persistent identity. `run` holds the correlation id of an in-flight
/// execution request and doubles as the disabled state of the cell's run
/// trigger: it is set when a request leaves and cleared on every completion
/// path.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub cell_type: CellType,
    pub source: String,
    pub mode: CellMode,
    pub output: OutputState,
    pub run: Option<Uuid>,
}

impl Cell {
    pub fn new(cell_type: CellType, source: impl Into<String>) -> Self {
        Cell {
            cell_type,
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn code(source: impl Into<String>) -> Self {
        Cell::new(CellType::Code, source)
    }

    pub fn prose(source: impl Into<String>) -> Self {
        Cell::new(CellType::Prose, source)
    }

    pub fn is_editing(&self) -> bool {
        self.mode == CellMode::Edit
    }

    /// True while an execution request for this cell is in flight.
    pub fn is_busy(&self) -> bool {
        self.run.is_some()
    }

    /// The edit affordance is shown only on a prose cell whose output is
    /// currently rendered; entering edit mode hides it again.
    pub fn shows_edit_affordance(&self) -> bool {
        self.cell_type == CellType::Prose && self.output.is_rendered()
    }
}

/// Ordered sequence of cells.
///
/// Cells are addressed by index and adjacency is computed from indices;
/// nothing here depends on a rendered representation of the document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    cells: Vec<Cell>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Document { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Cell> {
        self.cells.get_mut(index)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Cell> {
        self.cells.iter_mut()
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Insert at `index`, clamped to the end of the sequence.
    pub fn insert(&mut self, index: usize, cell: Cell) {
        let index = index.min(self.cells.len());
        self.cells.insert(index, cell);
    }

    /// Remove and return the cell at `index`; `None` when out of range.
    pub fn remove(&mut self, index: usize) -> Option<Cell> {
        if index < self.cells.len() {
            Some(self.cells.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Index of the cell in edit mode, if any. The session keeps this to at
    /// most one cell document-wide.
    pub fn editing_index(&self) -> Option<usize> {
        self.cells.iter().position(Cell::is_editing)
    }

    /// Find the cell an in-flight execution request is attached to.
    pub fn find_run(&self, run_id: Uuid) -> Option<usize> {
        self.cells.iter().position(|cell| cell.run == Some(run_id))
    }
}
