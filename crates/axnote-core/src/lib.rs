//! Headless notebook engine for axnote.
//!
//! Everything here is synchronous and presentation-free: the document model,
//! the per-cell state machine, focus tracking, the single-slot move
//! clipboard, the keymap codec with its two action tables, prose
//! normalization, and the persisted-document codec. The TUI crate drives
//! this engine through a single controller task; tests drive it directly.

pub mod document;
pub mod keymap;
pub mod nbformat;
pub mod normalize;
pub mod session;

pub use document::{Cell, CellMode, CellType, Document, OutputState};
pub use keymap::{CellAction, DocumentAction, Key, KeyChord, Keymap, KeymapError};
pub use nbformat::NotebookParseError;
pub use session::{FocusTarget, Region, Session};
