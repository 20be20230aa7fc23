use serde::Serialize;
use thiserror::Error;

/// Result alias for catalog operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Stable tag for each failure, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    DuplicateId,
    UnknownBook,
    AlreadyBorrowed,
    NoCopiesAvailable,
    NotBorrowed,
}

impl ErrorKind {
    /// Machine-readable code used in API error bodies.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::DuplicateId => "duplicate_id",
            ErrorKind::UnknownBook => "unknown_book",
            ErrorKind::AlreadyBorrowed => "already_borrowed",
            ErrorKind::NoCopiesAvailable => "no_copies_available",
            ErrorKind::NotBorrowed => "not_borrowed",
        }
    }
}

/// Recoverable failures of catalog operations.
///
/// The `Display` text is the message shown to the person using the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error("All fields are required!")]
    Validation {
        /// Names of the fields that were missing or out of range
        fields: Vec<&'static str>,
    },

    #[error("Book ID already exists!")]
    DuplicateId { id: String },

    #[error("Invalid Book ID!")]
    UnknownBook { id: String },

    #[error("You already borrowed this book!")]
    AlreadyBorrowed { user: String, id: String },

    #[error("No copies available!")]
    NoCopiesAvailable { id: String },

    #[error("This user did not borrow this book.")]
    NotBorrowed { user: String, id: String },
}

impl LibraryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::Validation { .. } => ErrorKind::Validation,
            LibraryError::DuplicateId { .. } => ErrorKind::DuplicateId,
            LibraryError::UnknownBook { .. } => ErrorKind::UnknownBook,
            LibraryError::AlreadyBorrowed { .. } => ErrorKind::AlreadyBorrowed,
            LibraryError::NoCopiesAvailable { .. } => ErrorKind::NoCopiesAvailable,
            LibraryError::NotBorrowed { .. } => ErrorKind::NotBorrowed,
        }
    }
}
