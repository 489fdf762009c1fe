pub mod models;
pub mod repository;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{settings::Settings, InitCtx, Migration, Module};
use serde_json::json;

use repository::SqliteBookRepository;
use routes::BooksState;
use validation::ValidationPolicy;

/// Book catalog module: CRUD over the `books` table
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
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
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            store = ?ctx.db.kind(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        routes::router(BooksState {
            repo: Arc::new(SqliteBookRepository::new(ctx.db.pool().clone())),
            validation: ValidationPolicy::from(&ctx.settings.validation),
            pagination: ctx.settings.pagination.clone(),
            base_path: self.mount_path(),
        })
    }

    fn openapi(&self, settings: &Settings) -> Option<serde_json::Value> {
        let pagination = &settings.pagination;
        let policy = ValidationPolicy::from(&settings.validation);

        let text_field = |max_len: Option<usize>| match max_len {
            Some(max) => json!({ "type": "string", "minLength": 1, "maxLength": max }),
            None => json!({ "type": "string", "minLength": 1 }),
        };
        let cover_field = if policy.require_url_cover {
            json!({ "type": "string", "format": "uri" })
        } else {
            json!({ "type": "string", "minLength": 1 })
        };

        let error = json!({
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        });
        let with_description = |description: &str| {
            let mut response = error.clone();
            response["description"] = json!(description);
            response
        };
        let id_param = json!({
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let book_body = json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/BookInput" }
                }
            }
        });
        let book_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/Book" }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "operationId": "GetBooks",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "skip",
                                "in": "query",
                                "required": false,
                                "schema": { "type": "integer", "minimum": 0, "default": 0 }
                            },
                            {
                                "name": "limit",
                                "in": "query",
                                "required": false,
                                "schema": {
                                    "type": "integer",
                                    "minimum": 0,
                                    "maximum": pagination.max_limit,
                                    "default": pagination.default_limit
                                }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "Books in insertion order",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "400": with_description("Malformed query")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "operationId": "CreateBook",
                        "tags": ["Books"],
                        "requestBody": book_body.clone(),
                        "responses": {
                            "201": book_response("Book created"),
                            "400": with_description("Validation error")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "operationId": "GetBook",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "responses": {
                            "200": book_response("The book"),
                            "404": with_description("Book not found")
                        }
                    },
                    "put": {
                        "summary": "Replace a book",
                        "operationId": "UpdateBook",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "requestBody": book_body,
                        "responses": {
                            "204": { "description": "Book updated" },
                            "400": with_description("Validation error"),
                            "404": with_description("Book not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "operationId": "DeleteBook",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "200": book_response("The deleted book"),
                            "404": with_description("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "datePublished": { "type": "string", "format": "date-time" },
                            "coverImage": { "type": "string" }
                        },
                        "required": ["id", "title", "author", "datePublished", "coverImage"]
                    },
                    "BookInput": {
                        "type": "object",
                        "properties": {
                            "title": text_field(policy.max_title_len),
                            "author": text_field(policy.max_author_len),
                            "datePublished": { "type": "string", "format": "date-time" },
                            "coverImage": cover_field
                        },
                        "required": ["title", "author", "datePublished", "coverImage"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                id: "001_init",
                up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id             INTEGER PRIMARY KEY AUTOINCREMENT,
                    title          TEXT NOT NULL CHECK (title <> ''),
                    author         TEXT NOT NULL CHECK (author <> ''),
                    date_published TEXT NOT NULL,
                    cover_image    TEXT NOT NULL CHECK (cover_image <> '')
                );
                "#,
            },
            Migration {
                id: "002_lookup_indexes",
                up: r#"
                CREATE INDEX IF NOT EXISTS idx_books_title  ON books (title);
                CREATE INDEX IF NOT EXISTS idx_books_author ON books (author);
                "#,
            },
        ]
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

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}
