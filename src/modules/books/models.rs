use std::fmt;

use serde::{Deserialize, Serialize};

/// A catalogued title and its copy counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier for the book
    pub id: String,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Copies owned by the library; always at least one
    pub total_copies: u32,
    /// Copies not currently lent out
    pub available_copies: u32,
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | Total: {} | Available: {}",
            self.title, self.author, self.total_copies, self.available_copies
        )
    }
}

/// Request model for adding a book to the catalog.
///
/// Absent fields deserialize to blanks so the catalog reports them as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    /// Title of the book
    #[serde(default)]
    pub title: String,
    /// Author of the book
    #[serde(default)]
    pub author: String,
    /// Unique identifier for the book
    #[serde(default)]
    pub id: String,
    /// Number of copies to add
    #[serde(default)]
    pub total_copies: u32,
}

impl NewBook {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        id: impl Into<String>,
        total_copies: u32,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            id: id.into(),
            total_copies,
        }
    }
}

/// An active lending relationship: `user` currently holds a copy of `book_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BorrowRecord {
    pub user: String,
    pub book_id: String,
}

/// Request model for borrowing or returning a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequest {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub id: String,
}

/// Successful outcome of a catalog mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Human-readable confirmation
    pub message: String,
    /// The book as it stands after the operation
    pub book: Book,
}

/// A borrow record joined with the title it refers to, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub user: String,
    pub book_id: String,
    pub title: String,
}

impl fmt::Display for RecordEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} borrowed {}", self.user, self.title)
    }
}

/// Representation requested by a listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Text,
}

/// Query string for the search endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub format: Format,
}
