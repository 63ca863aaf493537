//! Notebook file I/O.
//!
//! Saving is atomic: the serialized document goes to a temp file next to the
//! target, is synced, and is renamed into place, so a crash mid-save never
//! leaves a truncated notebook. Loading parses the whole file before
//! anything else happens; a parse failure therefore cannot half-mutate the
//! live session.

use std::path::Path;

use axnote_core::{Document, NotebookParseError, nbformat};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("notebook file error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] NotebookParseError),
    #[error("could not serialize notebook: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub async fn load_notebook(path: &Path) -> Result<Document, FileError> {
    let text = fs::read_to_string(path).await?;
    let document = nbformat::from_json(&text)?;
    info!("loaded notebook from {}", path.display());
    Ok(document)
}

pub async fn save_notebook(document: &Document, path: &Path) -> Result<(), FileError> {
    let json = nbformat::to_json(document)?;

    let mut temp_path = path.to_path_buf();
    temp_path.set_extension("ipynb.tmp");

    let mut temp_file = fs::File::create(&temp_path).await?;
    temp_file.write_all(json.as_bytes()).await?;
    temp_file.sync_all().await?;
    drop(temp_file);

    fs::rename(&temp_path, path).await?;
    info!("saved notebook to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axnote_core::Cell;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trip.ipynb");
        let document = Document::from_cells(vec![Cell::code("print(1)\n"), Cell::prose("# hi")]);

        save_notebook(&document, &path).await.unwrap();
        let loaded = load_notebook(&path).await.unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(0).unwrap().source, "print(1)\n");
        assert_eq!(loaded.get(1).unwrap().source, "# hi");
    }

    #[tokio::test]
    async fn malformed_files_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ipynb");
        fs::write(&path, "{not json").await.unwrap();
        assert!(matches!(
            load_notebook(&path).await,
            Err(FileError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn missing_files_are_io_errors() {
        assert!(matches!(
            load_notebook(Path::new("/nonexistent/nowhere.ipynb")).await,
            Err(FileError::Io(_))
        ));
    }
}
