//! The catalog itself: books keyed by id plus the active borrow records.

use indexmap::IndexMap;

use super::error::{LibraryError, LibraryResult};
use super::models::{Book, BorrowRecord, NewBook, Receipt, RecordEntry};

/// In-memory catalog with borrow/return tracking.
///
/// Invariant: for every book, `available_copies` equals `total_copies` minus
/// the number of borrow records naming its id. Failed operations leave the
/// catalog untouched.
#[derive(Debug, Default)]
pub struct Library {
    books: IndexMap<String, Book>,
    records: Vec<BorrowRecord>,
}

/// Collect the names of blank fields; whitespace-only counts as blank.
fn missing_fields(fields: &[(&'static str, &str)]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

fn matches(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new title with all of its copies available.
    pub fn add_book(&mut self, book: NewBook) -> LibraryResult<Receipt> {
        let mut missing = missing_fields(&[
            ("title", book.title.as_str()),
            ("author", book.author.as_str()),
            ("id", book.id.as_str()),
        ]);
        if book.total_copies == 0 {
            missing.push("total_copies");
        }
        if !missing.is_empty() {
            return Err(LibraryError::Validation { fields: missing });
        }

        let id = book.id.trim().to_string();
        if self.books.contains_key(&id) {
            return Err(LibraryError::DuplicateId { id });
        }

        let book = Book {
            id: id.clone(),
            title: book.title.trim().to_string(),
            author: book.author.trim().to_string(),
            total_copies: book.total_copies,
            available_copies: book.total_copies,
        };
        tracing::debug!(book_id = %id, copies = book.total_copies, "book added");
        self.books.insert(id, book.clone());

        Ok(Receipt {
            message: "Book added successfully!".to_string(),
            book,
        })
    }

    /// Case-insensitive substring search over titles.
    pub fn search_by_title(&self, query: &str) -> Vec<&Book> {
        let needle = query.to_lowercase();
        self.books
            .values()
            .filter(|book| matches(&book.title, &needle))
            .collect()
    }

    /// Case-insensitive substring search over authors.
    pub fn search_by_author(&self, query: &str) -> Vec<&Book> {
        let needle = query.to_lowercase();
        self.books
            .values()
            .filter(|book| matches(&book.author, &needle))
            .collect()
    }

    /// Lend one copy of `id` to `user`.
    pub fn borrow_book(&mut self, user: &str, id: &str) -> LibraryResult<Receipt> {
        let missing = missing_fields(&[("user", user), ("id", id)]);
        if !missing.is_empty() {
            return Err(LibraryError::Validation { fields: missing });
        }
        let (user, id) = (user.trim(), id.trim());

        let Some(book) = self.books.get_mut(id) else {
            return Err(LibraryError::UnknownBook { id: id.to_string() });
        };

        let record = BorrowRecord {
            user: user.to_string(),
            book_id: id.to_string(),
        };
        if self.records.contains(&record) {
            return Err(LibraryError::AlreadyBorrowed {
                user: record.user,
                id: record.book_id,
            });
        }

        if book.available_copies == 0 {
            return Err(LibraryError::NoCopiesAvailable { id: id.to_string() });
        }

        book.available_copies -= 1;
        self.records.push(record);
        tracing::debug!(
            user,
            book_id = id,
            available = book.available_copies,
            "book borrowed"
        );

        Ok(Receipt {
            message: format!("{} borrowed {}", user, book.title),
            book: book.clone(),
        })
    }

    /// Take back the copy of `id` held by `user`.
    pub fn return_book(&mut self, user: &str, id: &str) -> LibraryResult<Receipt> {
        let missing = missing_fields(&[("user", user), ("id", id)]);
        if !missing.is_empty() {
            return Err(LibraryError::Validation { fields: missing });
        }
        let (user, id) = (user.trim(), id.trim());

        let Some(book) = self.books.get_mut(id) else {
            return Err(LibraryError::UnknownBook { id: id.to_string() });
        };

        let Some(position) = self
            .records
            .iter()
            .position(|record| record.user == user && record.book_id == id)
        else {
            return Err(LibraryError::NotBorrowed {
                user: user.to_string(),
                id: id.to_string(),
            });
        };

        self.records.remove(position);
        book.available_copies += 1;
        tracing::debug!(
            user,
            book_id = id,
            available = book.available_copies,
            "book returned"
        );

        Ok(Receipt {
            message: format!("{} returned {}", user, book.title),
            book: book.clone(),
        })
    }

    /// Look up a single book by id.
    pub fn book(&self, id: &str) -> Option<&Book> {
        self.books.get(id.trim())
    }

    /// Every book, in the order it was added.
    pub fn list_all_books(&self) -> Vec<&Book> {
        self.books.values().collect()
    }

    /// Active borrow records, oldest first.
    pub fn list_borrow_records(&self) -> &[BorrowRecord] {
        &self.records
    }

    /// Borrow records joined with the titles they refer to.
    pub fn record_entries(&self) -> Vec<RecordEntry> {
        self.records
            .iter()
            .filter_map(|record| {
                self.books.get(&record.book_id).map(|book| RecordEntry {
                    user: record.user.clone(),
                    book_id: record.book_id.clone(),
                    title: book.title.clone(),
                })
            })
            .collect()
    }

    /// Plain-text rendering of the catalog and its borrow records.
    pub fn render_listing(&self) -> String {
        let mut out = String::from("Books\n");
        if self.books.is_empty() {
            out.push_str("No books added\n");
        }
        for book in self.books.values() {
            out.push_str(&format!("{}\n", book));
        }

        out.push_str("\nBorrow records\n");
        let entries = self.record_entries();
        if entries.is_empty() {
            out.push_str("No borrow records found\n");
        }
        for entry in entries {
            out.push_str(&format!("{}\n", entry));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

/// Render search results as `{title} | {author} | Available: {n}` lines.
///
/// Search hits omit the total; the full catalog listing carries it.
pub fn render_search(results: &[&Book]) -> String {
    if results.is_empty() {
        return "No books found\n".to_string();
    }
    results
        .iter()
        .map(|book| {
            format!(
                "{} | {} | Available: {}\n",
                book.title, book.author, book.available_copies
            )
        })
        .collect()
}
