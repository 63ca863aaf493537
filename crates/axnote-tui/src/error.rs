use std::fmt::Debug;

use tracing::{error, warn};

/// Severity of a user-visible failure. Warnings and errors are contained at
/// cell or single-operation granularity; nothing here aborts the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Warning,
    Error,
    Fatal,
}

fn log(severity: ErrorSeverity, err: &dyn Debug) {
    match severity {
        ErrorSeverity::Warning => warn!(target: "axnote_tui::error", "{err:?}"),
        ErrorSeverity::Error | ErrorSeverity::Fatal => {
            error!(target: "axnote_tui::error", "{err:?}")
        }
    }
}

/// Log the error side of a `Result` without consuming it.
pub trait ResultExt {
    fn log_warning(self) -> Self;
    fn log_error(self) -> Self;
}

impl<T, E: Debug> ResultExt for Result<T, E> {
    fn log_warning(self) -> Self {
        if let Err(err) = self.as_ref() {
            log(ErrorSeverity::Warning, err);
        }
        self
    }

    fn log_error(self) -> Self {
        if let Err(err) = self.as_ref() {
            log(ErrorSeverity::Error, err);
        }
        self
    }
}

/// Log an error value directly.
pub trait ErrorExt {
    fn log_warning(&self);
    fn log_error(&self);
}

impl<E: Debug> ErrorExt for E {
    fn log_warning(&self) {
        log(ErrorSeverity::Warning, self);
    }

    fn log_error(&self) {
        log(ErrorSeverity::Error, self);
    }
}
