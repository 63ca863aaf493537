//! Chord codec and the two scoped action tables.
//!
//! A chord's textual form writes modifiers in the fixed order `control`,
//! `alt`, `shift` (each word followed by a space) and then the key token:
//! the space bar is the word `space`, Enter is `enter`, Escape is `escape`,
//! and any other key is its single lowercase character. `Display` and
//! `FromStr` are inverse for every chord `Display` can emit.
//!
//! Actions are closed enums so dispatch is matched exhaustively, and each
//! action carries its own help text for the keyboard-help dialog. Bindings
//! are parsed from descriptor text when a [`Keymap`] is built, so a
//! malformed descriptor surfaces at configuration time, never during live
//! dispatch.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeymapError {
    /// A shortcut descriptor without a trailing key token, e.g. `"control"`.
    #[error("`{0}` is not a valid key descriptor; the key must come last, as in `control shift x`")]
    InvalidKeyDescriptor(String),
    /// A keybinding override that names no known action.
    #[error("`{0}` does not name a bindable action")]
    UnknownAction(String),
}

/// A canonical key token: one lowercase character or a named key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Space,
    Escape,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Enter => f.write_str("enter"),
            Key::Space => f.write_str("space"),
            Key::Escape => f.write_str("escape"),
        }
    }
}

/// A modifier-plus-key combination in canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub key: Key,
}

impl KeyChord {
    pub fn bare(key: Key) -> Self {
        KeyChord {
            ctrl: false,
            alt: false,
            shift: false,
            key,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("control ")?;
        }
        if self.alt {
            f.write_str("alt ")?;
        }
        if self.shift {
            f.write_str("shift ")?;
        }
        write!(f, "{}", self.key)
    }
}

fn is_modifier_word(word: &str) -> bool {
    matches!(word, "control" | "ctrl" | "alt" | "shift")
}

impl FromStr for KeyChord {
    type Err = KeymapError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|word| word.to_lowercase())
            .collect();
        let key_word = match words.last() {
            Some(word) if !is_modifier_word(word) => word.as_str(),
            // A bare modifier (or nothing at all) has no trailing key token.
            _ => return Err(KeymapError::InvalidKeyDescriptor(text.to_string())),
        };
        let key = match key_word {
            "enter" => Key::Enter,
            "space" => Key::Space,
            "escape" => Key::Escape,
            word => Key::Char(word.chars().next().expect("split_whitespace word")),
        };
        Ok(KeyChord {
            ctrl: words.iter().any(|w| w == "control" || w == "ctrl"),
            alt: words.iter().any(|w| w == "alt"),
            shift: words.iter().any(|w| w == "shift"),
            key,
        })
    }
}

/// Actions on the document as a whole; these take no cell argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentAction {
    RunAll,
    AddCell,
    ShowHelp,
    StartKernel,
    RestartKernel,
    ShutdownKernel,
    SaveNotebook,
    OpenNotebook,
    NewNotebook,
    ToggleToolbars,
}

impl DocumentAction {
    pub const ALL: [DocumentAction; 10] = [
        DocumentAction::RunAll,
        DocumentAction::AddCell,
        DocumentAction::ShowHelp,
        DocumentAction::StartKernel,
        DocumentAction::RestartKernel,
        DocumentAction::ShutdownKernel,
        DocumentAction::SaveNotebook,
        DocumentAction::OpenNotebook,
        DocumentAction::NewNotebook,
        DocumentAction::ToggleToolbars,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DocumentAction::RunAll => "run-all",
            DocumentAction::AddCell => "add-cell",
            DocumentAction::ShowHelp => "show-help",
            DocumentAction::StartKernel => "start-kernel",
            DocumentAction::RestartKernel => "restart-kernel",
            DocumentAction::ShutdownKernel => "shutdown-kernel",
            DocumentAction::SaveNotebook => "save-notebook",
            DocumentAction::OpenNotebook => "open-notebook",
            DocumentAction::NewNotebook => "new-notebook",
            DocumentAction::ToggleToolbars => "toggle-toolbars",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            DocumentAction::RunAll => "Run all cells in the notebook, in order",
            DocumentAction::AddCell => "Add a new cell after the current cell",
            DocumentAction::ShowHelp => "Show keyboard help",
            DocumentAction::StartKernel => "Start the execution kernel",
            DocumentAction::RestartKernel => "Restart the kernel and clear all outputs",
            DocumentAction::ShutdownKernel => "Shut the kernel down",
            DocumentAction::SaveNotebook => "Save the notebook to disk",
            DocumentAction::OpenNotebook => "Reload the notebook from disk",
            DocumentAction::NewNotebook => "Discard the document and start a new notebook",
            DocumentAction::ToggleToolbars => {
                "Put per-cell toolbar controls back into the keyboard order"
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        DocumentAction::ALL
            .into_iter()
            .find(|action| action.name() == name)
    }
}

/// Actions on the currently focused cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAction {
    Execute,
    EnterEdit,
    ExitEdit,
    ToggleType,
    Cut,
    InsertBefore,
    InsertAfter,
}

impl CellAction {
    pub const ALL: [CellAction; 7] = [
        CellAction::Execute,
        CellAction::EnterEdit,
        CellAction::ExitEdit,
        CellAction::ToggleType,
        CellAction::Cut,
        CellAction::InsertBefore,
        CellAction::InsertAfter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CellAction::Execute => "execute",
            CellAction::EnterEdit => "edit",
            CellAction::ExitEdit => "exit-edit",
            CellAction::ToggleType => "toggle-type",
            CellAction::Cut => "cut",
            CellAction::InsertBefore => "insert-before",
            CellAction::InsertAfter => "insert-after",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            CellAction::Execute => "Execute the current cell",
            CellAction::EnterEdit => "Edit the current cell",
            CellAction::ExitEdit => "Stop editing and focus the cell's output",
            CellAction::ToggleType => "Toggle the cell between code and prose",
            CellAction::Cut => "Remove the current cell onto the clipboard",
            CellAction::InsertBefore => "Insert the clipboard cell before the current cell",
            CellAction::InsertAfter => "Insert the clipboard cell after the current cell",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        CellAction::ALL
            .into_iter()
            .find(|action| action.name() == name)
    }
}

pub const DEFAULT_CELL_BINDINGS: &[(&str, CellAction)] = &[
    ("control enter", CellAction::Execute),
    ("enter", CellAction::EnterEdit),
    ("escape", CellAction::ExitEdit),
    ("control space", CellAction::ToggleType),
    ("control x", CellAction::Cut),
    ("control shift v", CellAction::InsertBefore),
    ("control v", CellAction::InsertAfter),
];

/// The access-key table of the document-wide controls.
pub const DEFAULT_DOCUMENT_BINDINGS: &[(&str, DocumentAction)] = &[
    ("?", DocumentAction::ShowHelp),
    ("alt r", DocumentAction::RunAll),
    ("alt a", DocumentAction::AddCell),
    ("alt k", DocumentAction::StartKernel),
    ("alt shift k", DocumentAction::RestartKernel),
    ("alt q", DocumentAction::ShutdownKernel),
    ("alt s", DocumentAction::SaveNotebook),
    ("alt o", DocumentAction::OpenNotebook),
    ("alt n", DocumentAction::NewNotebook),
    ("control t", DocumentAction::ToggleToolbars),
];

/// The two disjoint binding tables.
#[derive(Debug, Clone)]
pub struct Keymap {
    cell: Vec<(KeyChord, CellAction)>,
    document: Vec<(KeyChord, DocumentAction)>,
}

impl Keymap {
    pub fn from_bindings(
        cell: &[(&str, CellAction)],
        document: &[(&str, DocumentAction)],
    ) -> Result<Self, KeymapError> {
        let cell = cell
            .iter()
            .map(|(descriptor, action)| Ok((descriptor.parse()?, *action)))
            .collect::<Result<_, KeymapError>>()?;
        let document = document
            .iter()
            .map(|(descriptor, action)| Ok((descriptor.parse()?, *action)))
            .collect::<Result<_, KeymapError>>()?;
        Ok(Keymap { cell, document })
    }

    /// The built-in bindings.
    pub fn standard() -> Self {
        Keymap::from_bindings(DEFAULT_CELL_BINDINGS, DEFAULT_DOCUMENT_BINDINGS)
            .expect("default bindings are well-formed")
    }

    pub fn cell_action(&self, chord: &KeyChord) -> Option<CellAction> {
        self.cell
            .iter()
            .find(|(bound, _)| bound == chord)
            .map(|(_, action)| *action)
    }

    pub fn document_action(&self, chord: &KeyChord) -> Option<DocumentAction> {
        self.document
            .iter()
            .find(|(bound, _)| bound == chord)
            .map(|(_, action)| *action)
    }

    /// Re-point an action at a different chord, keeping its position in the
    /// help listing.
    pub fn rebind_cell(&mut self, action: CellAction, chord: KeyChord) {
        for entry in &mut self.cell {
            if entry.1 == action {
                entry.0 = chord;
            }
        }
    }

    pub fn rebind_document(&mut self, action: DocumentAction, chord: KeyChord) {
        for entry in &mut self.document {
            if entry.1 == action {
                entry.0 = chord;
            }
        }
    }

    pub fn cell_bindings(&self) -> &[(KeyChord, CellAction)] {
        &self.cell
    }

    pub fn document_bindings(&self) -> &[(KeyChord, DocumentAction)] {
        &self.document
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Keymap::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_modifiers_and_trailing_key() {
        let chord: KeyChord = "control shift x".parse().unwrap();
        assert!(chord.ctrl);
        assert!(chord.shift);
        assert!(!chord.alt);
        assert_eq!(chord.key, Key::Char('x'));
    }

    #[test]
    fn decode_then_encode_is_identity_for_canonical_texts() {
        for text in [
            "x",
            "enter",
            "space",
            "escape",
            "?",
            "control enter",
            "control space",
            "control x",
            "control shift v",
            "alt shift k",
            "control alt shift z",
        ] {
            let chord: KeyChord = text.parse().unwrap();
            assert_eq!(chord.to_string(), text);
        }
    }

    #[test]
    fn decode_without_trailing_key_fails() {
        for text in ["", "   ", "control", "control shift", "ctrl alt "] {
            assert!(matches!(
                text.parse::<KeyChord>(),
                Err(KeymapError::InvalidKeyDescriptor(_))
            ));
        }
    }

    #[test]
    fn decode_accepts_aliases_and_case() {
        let chord: KeyChord = "Ctrl Shift X".parse().unwrap();
        assert_eq!(chord, KeyChord::bare(Key::Char('x')).ctrl().shift());
        assert_eq!(chord.to_string(), "control shift x");
    }

    #[test]
    fn standard_tables_are_disjoint_and_complete() {
        let keymap = Keymap::standard();
        assert_eq!(keymap.cell_bindings().len(), CellAction::ALL.len());
        for (chord, _) in keymap.cell_bindings() {
            assert_eq!(keymap.document_action(chord), None);
        }
        assert_eq!(
            keymap.cell_action(&"control enter".parse().unwrap()),
            Some(CellAction::Execute)
        );
        assert_eq!(
            keymap.document_action(&"?".parse().unwrap()),
            Some(DocumentAction::ShowHelp)
        );
    }

    #[test]
    fn rebind_replaces_the_chord_in_place() {
        let mut keymap = Keymap::standard();
        let chord: KeyChord = "control r".parse().unwrap();
        keymap.rebind_cell(CellAction::Execute, chord);
        assert_eq!(keymap.cell_action(&chord), Some(CellAction::Execute));
        assert_eq!(keymap.cell_action(&"control enter".parse().unwrap()), None);
    }

    #[test]
    fn action_names_round_trip() {
        for action in CellAction::ALL {
            assert_eq!(CellAction::from_name(action.name()), Some(action));
        }
        for action in DocumentAction::ALL {
            assert_eq!(DocumentAction::from_name(action.name()), Some(action));
        }
    }
}
