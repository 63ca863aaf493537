pub mod kernel;
pub mod notebook;
pub mod session;

use tokio::sync::oneshot;

/// Acknowledge a sequenced command. Callers must reach this on every exit
/// path so a "run all" sweep can never stall on a skipped cell.
pub(crate) fn ack(done: Option<oneshot::Sender<()>>) {
    if let Some(tx) = done {
        let _ = tx.send(());
    }
}
