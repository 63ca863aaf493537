//! Persisted notebook interchange codec.
//!
//! The on-disk shape is the slice of the Jupyter notebook schema consumed by
//! the external tooling this client exchanges files with: a `cells` array of
//! `{cell_type, source, metadata, execution_count?, outputs?}` entries plus a
//! fixed envelope (`metadata.kernelspec`, `metadata.language_info`,
//! `nbformat`, `nbformat_minor`). Writing always emits the full envelope;
//! reading is lenient and takes defaults for anything missing or oddly
//! shaped. Parsing a whole file either succeeds into a fresh [`Document`] or
//! fails without producing one, so a failed load can never half-mutate live
//! state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Cell, CellType, Document};

#[derive(Debug, thiserror::Error)]
pub enum NotebookParseError {
    #[error("not a valid notebook document: {0}")]
    Malformed(#[from] serde_json::Error),
}

const CELL_TYPE_CODE: &str = "code";
const CELL_TYPE_MARKDOWN: &str = "markdown";

#[derive(Debug, Serialize)]
pub struct PersistedNotebook {
    cells: Vec<PersistedCell>,
    metadata: NotebookMetadata,
    nbformat: u32,
    nbformat_minor: u32,
}

#[derive(Debug, Serialize)]
struct PersistedCell {
    cell_type: &'static str,
    source: Vec<String>,
    metadata: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    execution_count: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outputs: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct NotebookMetadata {
    kernelspec: KernelSpec,
    language_info: LanguageInfo,
}

#[derive(Debug, Serialize)]
struct KernelSpec {
    display_name: &'static str,
    language: &'static str,
    name: &'static str,
}

#[derive(Debug, Serialize)]
struct LanguageInfo {
    name: &'static str,
    version: &'static str,
}

/// Split a source string into the persisted line array: every line keeps its
/// terminator except the last, so joining the array reproduces the source
/// byte-for-byte, trailing newline included or not.
fn split_source(source: &str) -> Vec<String> {
    let parts: Vec<&str> = source.split('\n').collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i < last {
                format!("{line}\n")
            } else {
                (*line).to_string()
            }
        })
        .collect()
}

fn persist_cell(cell: &Cell) -> PersistedCell {
    let is_code = cell.cell_type == CellType::Code;
    PersistedCell {
        cell_type: match cell.cell_type {
            CellType::Code => CELL_TYPE_CODE,
            CellType::Prose => CELL_TYPE_MARKDOWN,
        },
        source: split_source(&cell.source),
        metadata: serde_json::Map::new(),
        // Code cells carry a placeholder execution count and an empty output
        // list; prose cells carry neither field.
        execution_count: is_code.then_some(None),
        outputs: is_code.then(Vec::new),
    }
}

pub fn to_persisted(document: &Document) -> PersistedNotebook {
    PersistedNotebook {
        cells: document.iter().map(persist_cell).collect(),
        metadata: NotebookMetadata {
            kernelspec: KernelSpec {
                display_name: "Python 3",
                language: "python",
                name: "python3",
            },
            language_info: LanguageInfo {
                name: "python",
                version: "3.11.0",
            },
        },
        nbformat: 4,
        nbformat_minor: 5,
    }
}

pub fn to_json(document: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&to_persisted(document))
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
    #[serde(default)]
    cells: Vec<RawCell>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    #[serde(default)]
    cell_type: Option<String>,
    #[serde(default)]
    source: Value,
}

impl RawCell {
    fn into_cell(self) -> Cell {
        let cell_type = match self.cell_type.as_deref() {
            Some(CELL_TYPE_MARKDOWN) => CellType::Prose,
            // Anything else, including an absent tag, reads as code.
            _ => CellType::Code,
        };
        let source: String = match &self.source {
            Value::Array(lines) => lines.iter().filter_map(Value::as_str).collect(),
            // A source that is not a line array reads as empty.
            _ => String::new(),
        };
        Cell::new(cell_type, source)
    }
}

pub fn from_json(text: &str) -> Result<Document, NotebookParseError> {
    let raw: RawNotebook = serde_json::from_str(text)?;
    Ok(Document::from_cells(
        raw.cells.into_iter().map(RawCell::into_cell).collect(),
    ))
}
