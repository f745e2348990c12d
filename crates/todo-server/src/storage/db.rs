//! SQLite document store (embedded, no external dependencies)
//!
//! Every collection shares one `documents` table. Bodies are stored as JSON
//! text and queried with `json_extract`.

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use todo_core::{DocumentStore, Result, TodoError};

const IN_MEMORY: &str = ":memory:";

pub struct SqliteDocumentStore {
    pool: Arc<SqlitePool>,
}

impl SqliteDocumentStore {
    pub async fn new(database_path: &str) -> AnyResult<Self> {
        tracing::info!("Opening SQLite database at: {}", database_path);

        let pool = if database_path == IN_MEMORY {
            // Each in-memory connection is its own database
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
                .await
                .context("Failed to open in-memory SQLite database")?
        } else {
            Self::prepare_directory(database_path).await?;

            let options = SqliteConnectOptions::new()
                .filename(database_path)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await
                .with_context(|| {
                    format!("Failed to connect to SQLite database at: {}", database_path)
                })?
        };

        tracing::info!("SQLite connection established, running migrations...");

        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database initialization complete");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn prepare_directory(database_path: &str) -> AnyResult<()> {
        let parent = std::path::Path::new(database_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty());

        let Some(parent) = parent else {
            return Ok(());
        };

        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;

        // Check if directory is writable
        let test_file = parent.join(".write_test");
        match tokio::fs::write(&test_file, b"test").await {
            Ok(_) => {
                let _ = tokio::fs::remove_file(&test_file).await;
                tracing::info!("Database directory is writable");
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Database directory is not writable: {}: {}",
                parent.display(),
                e
            )),
        }
    }

    async fn run_migrations(pool: &SqlitePool) -> AnyResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

fn store_error(e: sqlx::Error) -> TodoError {
    TodoError::Store(e.to_string())
}

fn parse_body(body: String) -> Result<Value> {
    serde_json::from_str(&body).map_err(|e| TodoError::Store(format!("Corrupt document: {}", e)))
}

fn json_path(field: &str) -> Result<String> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TodoError::Validation(format!("Invalid field name: {}", field)));
    }
    Ok(format!("$.{}", field))
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT body FROM documents WHERE collection = ?1 ORDER BY rowid
            "#,
        )
        .bind(collection)
        .fetch_all(&*self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(|(body,)| parse_body(body)).collect()
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT body FROM documents WHERE collection = ?1 AND id = ?2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(store_error)?;

        row.map(|(body,)| parse_body(body)).transpose()
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT body FROM documents
            WHERE collection = ?1 AND json_extract(body, ?2) = ?3
            ORDER BY rowid
            "#,
        )
        .bind(collection)
        .bind(json_path(field)?)
        .bind(value)
        .fetch_all(&*self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(|(body,)| parse_body(body)).collect()
    }

    async fn insert_one(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(document.to_string())
        .execute(&*self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                TodoError::AlreadyExists(format!("Document {} already exists in {}", id, collection)),
            ),
            Err(e) => Err(store_error(e)),
        }
    }

    async fn replace_one(&self, collection: &str, id: &str, document: Value) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET body = ?1, updated_at = datetime('now')
            WHERE collection = ?2 AND id = ?3
            "#,
        )
        .bind(document.to_string())
        .bind(collection)
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_one(&self, collection: &str, id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents WHERE collection = ?1 AND id = ?2
            "#,
        )
        .bind(collection)
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::new(IN_MEMORY).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = store().await;
        let doc = json!({"id": "t1", "title": "Buy milk", "userId": "u1"});

        store.insert_one("todos", "t1", doc.clone()).await.unwrap();

        assert_eq!(store.find_by_id("todos", "t1").await.unwrap(), Some(doc.clone()));
        assert_eq!(store.find_all("todos").await.unwrap(), vec![doc.clone()]);
        assert_eq!(
            store.find_by_field("todos", "userId", "u1").await.unwrap(),
            vec![doc]
        );
        assert!(store.find_by_field("todos", "userId", "u2").await.unwrap().is_empty());
        assert!(store.find_all("users").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_insert() {
        let store = store().await;
        store
            .insert_one("users", "u1", json!({"id": "u1"}))
            .await
            .unwrap();

        let err = store
            .insert_one("users", "u1", json!({"id": "u1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, TodoError::AlreadyExists(_)));

        // Same id in another collection is fine
        store
            .insert_one("todos", "u1", json!({"id": "u1"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_replace_and_delete_report_matches() {
        let store = store().await;
        store
            .insert_one("todos", "t1", json!({"id": "t1", "title": "a"}))
            .await
            .unwrap();

        assert!(store
            .replace_one("todos", "t1", json!({"id": "t1", "title": "b"}))
            .await
            .unwrap());
        assert_eq!(
            store.find_by_id("todos", "t1").await.unwrap().unwrap()["title"],
            "b"
        );
        assert!(!store
            .replace_one("todos", "missing", json!({"id": "missing"}))
            .await
            .unwrap());

        assert!(store.delete_one("todos", "t1").await.unwrap());
        assert!(!store.delete_one("todos", "t1").await.unwrap());
        assert_eq!(store.find_by_id("todos", "t1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_odd_field_names() {
        let store = store().await;
        let err = store
            .find_by_field("todos", "a') OR 1=1 --", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, TodoError::Validation(_)));
    }
}
