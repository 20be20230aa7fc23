pub mod error;
pub mod library;
pub mod models;
pub mod routes;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Module};

pub use error::{ErrorKind, LibraryError, LibraryResult};
pub use library::Library;
pub use routes::SharedLibrary;

use models::NewBook;

/// Books module: owns the catalog and exposes it under `/api/books`.
pub struct BooksModule {
    library: SharedLibrary,
}

impl BooksModule {
    pub fn new() -> Self {
        Self::with_library(Library::new())
    }

    pub fn with_library(library: Library) -> Self {
        Self {
            library: Arc::new(Mutex::new(library)),
        }
    }

    /// Handle to the catalog shared with the HTTP handlers.
    pub fn library(&self) -> SharedLibrary {
        Arc::clone(&self.library)
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let seed = &ctx.settings.catalog.seed;
        {
            let mut library = self
                .library
                .lock()
                .map_err(|_| anyhow!("catalog lock poisoned"))?;

            for book in seed {
                library
                    .add_book(NewBook::new(
                        &book.title,
                        &book.author,
                        &book.id,
                        book.total_copies,
                    ))
                    .with_context(|| format!("failed to seed book '{}'", book.id))?;
            }
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            seeded = seed.len(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.library())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List all books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Every book in insertion order",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Add a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/NewBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Book added",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Receipt" }
                                    }
                                }
                            },
                            "409": error_response("Book ID already exists"),
                            "422": error_response("Missing field or zero copies")
                        }
                    }
                },
                "/search/title": search_path("Search books by title"),
                "/search/author": search_path("Search books by author"),
                "/borrow": loan_path(
                    "Borrow a book",
                    "Already borrowed by this user, or no copies available"
                ),
                "/return": loan_path("Return a book", "This user did not borrow this book"),
                "/records": {
                    "get": {
                        "summary": "List active borrow records",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Borrow records, oldest first",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/RecordEntry" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "/listing": {
                    "get": {
                        "summary": "Plain-text catalog and borrow records",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Unique identifier for the book" },
                            "title": { "type": "string", "description": "Title of the book" },
                            "author": { "type": "string", "description": "Author of the book" },
                            "total_copies": { "type": "integer", "minimum": 1 },
                            "available_copies": { "type": "integer", "minimum": 0 }
                        },
                        "required": ["id", "title", "author", "total_copies", "available_copies"]
                    },
                    "NewBook": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "total_copies": { "type": "integer", "minimum": 1 }
                        },
                        "required": ["id", "title", "author", "total_copies"]
                    },
                    "LoanRequest": {
                        "type": "object",
                        "properties": {
                            "user": { "type": "string", "description": "Borrower name" },
                            "id": { "type": "string", "description": "Book identifier" }
                        },
                        "required": ["user", "id"]
                    },
                    "Receipt": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "book": { "$ref": "#/components/schemas/Book" }
                        },
                        "required": ["message", "book"]
                    },
                    "RecordEntry": {
                        "type": "object",
                        "properties": {
                            "user": { "type": "string" },
                            "book_id": { "type": "string" },
                            "title": { "type": "string" }
                        },
                        "required": ["user", "book_id", "title"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn search_path(summary: &str) -> serde_json::Value {
    serde_json::json!({
        "get": {
            "summary": summary,
            "tags": ["Books"],
            "parameters": [
                {
                    "name": "q",
                    "in": "query",
                    "required": false,
                    "description": "Case-insensitive substring; empty matches everything",
                    "schema": { "type": "string" }
                },
                {
                    "name": "format",
                    "in": "query",
                    "required": false,
                    "schema": { "type": "string", "enum": ["json", "text"] }
                }
            ],
            "responses": {
                "200": {
                    "description": "Matching books",
                    "content": {
                        "application/json": {
                            "schema": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            }
                        },
                        "text/plain": { "schema": { "type": "string" } }
                    }
                }
            }
        }
    })
}

fn loan_path(summary: &str, conflict: &str) -> serde_json::Value {
    serde_json::json!({
        "post": {
            "summary": summary,
            "tags": ["Books"],
            "requestBody": {
                "required": true,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/LoanRequest" }
                    }
                }
            },
            "responses": {
                "200": {
                    "description": "Operation applied",
                    "content": {
                        "application/json": {
                            "schema": { "$ref": "#/components/schemas/Receipt" }
                        }
                    }
                },
                "404": error_response("Invalid Book ID"),
                "409": error_response(conflict),
                "422": error_response("Missing user or book id")
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_kernel::settings::{SeedBook, Settings};

    fn seed(id: &str, copies: u32) -> SeedBook {
        SeedBook {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            id: id.to_string(),
            total_copies: copies,
        }
    }

    #[tokio::test]
    async fn init_seeds_catalog_from_settings() {
        let mut settings = Settings::default();
        settings.catalog.seed = vec![seed("B1", 2), seed("B2", 1)];
        let module = BooksModule::new();

        module.init(&InitCtx { settings: &settings }).await.unwrap();

        let library = module.library();
        let library = library.lock().unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.book("B1").unwrap().available_copies, 2);
    }

    #[tokio::test]
    async fn invalid_seed_aborts_init() {
        let mut settings = Settings::default();
        settings.catalog.seed = vec![seed("B1", 2), seed("B1", 3)];
        let module = BooksModule::new();

        let err = module
            .init(&InitCtx { settings: &settings })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to seed book 'B1'");
        assert_eq!(
            err.root_cause().to_string(),
            "Book ID already exists!"
        );
    }

    #[test]
    fn openapi_fragment_references_known_schemas() {
        let spec = BooksModule::new().openapi().unwrap();
        let schemas = spec["components"]["schemas"].as_object().unwrap();
        for name in ["Book", "NewBook", "LoanRequest", "Receipt", "RecordEntry"] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }
        assert!(spec["paths"]["/borrow"]["post"].is_object());
        assert!(spec["paths"]["/search/author"]["get"].is_object());
    }
}
