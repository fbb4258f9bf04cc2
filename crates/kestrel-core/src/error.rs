//! Error types.
//!
//! Two families, split by who is at fault:
//!
//! | Type          | Raised by                       | Recovery                         |
//! |---------------|---------------------------------|----------------------------------|
//! | [`EditError`] | buffer queries and mutations    | caller bug, operation is a no-op |
//! | [`HostError`] | collaborators (fs, clipboard)   | shown to the user as a message   |
//!
//! Malformed key sequences are not errors at all: modes report them through
//! [`InputOutcome::Rejected`](crate::mode::InputOutcome::Rejected). Undo and
//! redo at the ends of history return `None`.

use thiserror::Error;

/// A buffer operation addressed text that does not exist, or tried to
/// change a buffer that refuses changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("{what} {value} is out of range (limit {limit})")]
    OutOfRange {
        what: &'static str,
        value: usize,
        limit: usize,
    },
    #[error("buffer is read-only")]
    InvalidMutation,
}

impl EditError {
    pub(crate) const fn out_of_range(what: &'static str, value: usize, limit: usize) -> Self {
        Self::OutOfRange { what, value, limit }
    }
}

/// Result alias for buffer operations.
pub type Result<T> = std::result::Result<T, EditError>;

/// Failures reported by the editor's collaborators or by editor-level
/// lookups.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("buffer has no file path")]
    NoPath,
    #[error("clipboard: {0}")]
    Clipboard(String),
    #[error("unknown mode: {0}")]
    UnknownMode(String),
    #[error("unknown buffer")]
    UnknownBuffer,
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Result alias for editor and collaborator operations.
pub type HostResult<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_message() {
        let err = EditError::out_of_range("offset", 12, 5);
        assert_eq!(err.to_string(), "offset 12 is out of range (limit 5)");
    }

    #[test]
    fn host_error_wraps_edit_error() {
        let err: HostError = EditError::InvalidMutation.into();
        assert_eq!(err.to_string(), "buffer is read-only");
    }

    #[test]
    fn host_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: HostError = io.into();
        assert!(matches!(err, HostError::Io(_)));
        assert_eq!(err.to_string(), "gone");
    }
}
