//! Per-thread record of the most recent failure.
//!
//! Every facade operation returns a [`PersistResult`] carrying the full
//! error. The record kept here is advisory: it mirrors the last failure on
//! the calling thread for diagnostics and for bindings that cannot carry a
//! `Result` across their boundary.

use crate::error::{ErrorKind, PersistError};
use std::cell::RefCell;

/// Snapshot of a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// Kind of the failure.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

/// Returns the last failure recorded on this thread, if any.
#[must_use]
pub fn last_error() -> Option<LastError> {
    LAST_ERROR.with(|e| e.borrow().clone())
}

/// Clears the last failure recorded on this thread.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Records `err` and hands it back, for use in `map_err` and `Err(...)`.
pub(crate) fn fail(err: impl Into<PersistError>) -> PersistError {
    let err = err.into();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(LastError {
            kind: err.kind(),
            message: err.to_string(),
        });
    });
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use persist_driver::DriverError;

    #[test]
    fn fail_records_kind_and_message() {
        clear_last_error();
        assert_eq!(last_error(), None);

        let err = fail(PersistError::invalid_argument("document must be a dict"));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let last = last_error().unwrap();
        assert_eq!(last.kind, ErrorKind::InvalidArgument);
        assert_eq!(last.message, "invalid argument: document must be a dict");

        clear_last_error();
        assert_eq!(last_error(), None);
    }

    #[test]
    fn driver_errors_are_converted_before_recording() {
        let err = fail(DriverError::not_found("users", "7"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(last_error().unwrap().kind, ErrorKind::NotFound);
    }

    #[test]
    fn record_is_per_thread() {
        fail(PersistError::invalid_type("x"));
        let other = std::thread::spawn(last_error).join().unwrap();
        assert_eq!(other, None);
        assert_eq!(last_error().unwrap().kind, ErrorKind::InvalidType);
    }
}
