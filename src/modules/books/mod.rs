pub mod handler;
pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_kernel::{InitCtx, Module, TableSchema};
use sqlx::SqlitePool;

use handler::BookHandler;
use repository::{BookRepository, SqlBookRepository, BOOKS_TABLE};

/// Books module: CRUD over the `books` table, mounted at the server root.
pub struct BooksModule {
    handler: Arc<BookHandler>,
}

impl BooksModule {
    pub fn new(repo: Arc<dyn BookRepository>) -> Self {
        Self {
            handler: Arc::new(BookHandler::new(repo)),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    fn base_path(&self) -> String {
        "/".to_string()
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(ctx.db)
            .await
            .context("count stored books")?;

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            stored,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.handler.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn schema(&self) -> Vec<TableSchema> {
        vec![BOOKS_TABLE]
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

/// Create the books module backed by the given pool
pub fn create_module(pool: SqlitePool) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(Arc::new(SqlBookRepository::new(pool))))
}

fn json_body(schema: serde_json::Value) -> serde_json::Value {
    json!({ "content": { "application/json": { "schema": schema } } })
}

fn reply(description: &str, schema: serde_json::Value) -> serde_json::Value {
    let mut response = json_body(schema);
    response["description"] = json!(description);
    response
}

fn openapi_fragment() -> serde_json::Value {
    let error = json!({ "$ref": "#/components/schemas/ErrorResponse" });
    let book = json!({ "$ref": "#/components/schemas/Book" });
    let payload = json!({ "$ref": "#/components/schemas/BookPayload" });
    let count = |key: &str| {
        json!({
            "type": "object",
            "properties": { key: { "type": "integer" } },
            "required": [key]
        })
    };
    let id_param = json!({ "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } });
    let key_param = json!({ "name": "key", "in": "path", "required": true, "schema": { "type": "string" },
        "description": "Record id for GET, ISBN for PUT and DELETE" });

    json!({
        "paths": {
            "/records": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": reply("All books", json!({ "type": "array", "items": book.clone() })),
                        "500": reply("Internal server error", error.clone())
                    }
                }
            },
            "/records/{key}": {
                "parameters": [key_param],
                "get": {
                    "summary": "Get a book by id",
                    "tags": ["Books"],
                    "responses": {
                        "200": reply("The book", book),
                        "400": reply("Invalid id", error.clone()),
                        "404": reply("No such book", error.clone()),
                        "500": reply("Internal server error", error.clone())
                    }
                },
                "put": {
                    "summary": "Update books by ISBN",
                    "tags": ["Books"],
                    "requestBody": json_body(payload.clone()),
                    "responses": {
                        "200": reply("Rows changed, 0 when unchanged", count("updatedCount")),
                        "400": reply("Missing attributes", error.clone()),
                        "404": reply("No book with this ISBN", error.clone()),
                        "500": reply("Internal server error", error.clone())
                    }
                },
                "delete": {
                    "summary": "Delete books by ISBN",
                    "tags": ["Books"],
                    "responses": {
                        "200": reply("Rows deleted", count("deletedCount")),
                        "404": reply("No book with this ISBN", error.clone()),
                        "500": reply("Internal server error", error.clone())
                    }
                }
            },
            "/record": {
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": json_body(payload.clone()),
                    "responses": {
                        "200": reply("Generated id", count("insertedId")),
                        "400": reply("Missing attributes", error.clone()),
                        "500": reply("Internal server error", error.clone())
                    }
                }
            },
            "/record/{id}": {
                "parameters": [id_param],
                "put": {
                    "summary": "Replace a book; the body id selects the row",
                    "tags": ["Books"],
                    "requestBody": json_body(payload.clone()),
                    "responses": {
                        "200": reply("Rows changed, 0 when unknown or unchanged", count("updatedCount")),
                        "400": reply("Missing attributes", error.clone()),
                        "500": reply("Internal server error", error.clone())
                    }
                },
                "delete": {
                    "summary": "Delete a book; the body id selects the row",
                    "tags": ["Books"],
                    "requestBody": json_body(payload),
                    "responses": {
                        "200": reply("Rows deleted", count("deletedCount")),
                        "400": reply("Missing id", error.clone()),
                        "404": reply("No such book", error.clone()),
                        "500": reply("Internal server error", error)
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "name": { "type": "string" },
                        "author": { "type": "string" },
                        "category": { "type": "string" },
                        "publicationYear": { "type": "integer" },
                        "isbn": { "type": "string" }
                    },
                    "required": ["id", "name", "author", "category", "publicationYear", "isbn"]
                },
                "BookPayload": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "name": { "type": "string" },
                        "author": { "type": "string" },
                        "category": { "type": "string" },
                        "publicationYear": { "type": "integer" },
                        "isbn": { "type": "string" }
                    }
                }
            }
        }
    })
}
