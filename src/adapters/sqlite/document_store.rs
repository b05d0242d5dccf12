//! SQLite adapter for the document store.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{from_json, parse_datetime, parse_optional_datetime, to_json};
use crate::domain::errors::CoreResult;
use crate::domain::models::Document;
use crate::domain::ports::DocumentStore;

#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    source_id: String,
    external_id: String,
    title: String,
    mime_type: String,
    content: String,
    metadata: String,
    created_at: String,
    updated_at: String,
    indexed_at: Option<String>,
}

fn row_to_document(row: DocumentRow) -> CoreResult<Document> {
    Ok(Document {
        id: row.id,
        source_id: row.source_id,
        external_id: row.external_id,
        title: row.title,
        mime_type: row.mime_type,
        content: row.content,
        metadata: from_json(&row.metadata)?,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
        indexed_at: parse_optional_datetime(row.indexed_at)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn upsert(&self, document: &Document) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO documents
             (id, source_id, external_id, title, mime_type, content, metadata,
              created_at, updated_at, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (id) DO UPDATE SET
               source_id = excluded.source_id,
               external_id = excluded.external_id,
               title = excluded.title,
               mime_type = excluded.mime_type,
               content = excluded.content,
               metadata = excluded.metadata,
               updated_at = excluded.updated_at,
               indexed_at = excluded.indexed_at",
        )
        .bind(&document.id)
        .bind(&document.source_id)
        .bind(&document.external_id)
        .bind(&document.title)
        .bind(&document.mime_type)
        .bind(&document.content)
        .bind(to_json(&document.metadata)?)
        .bind(document.created_at.to_rfc3339())
        .bind(document.updated_at.to_rfc3339())
        .bind(document.indexed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_document).transpose()
    }

    async fn get_by_external_id(
        &self,
        source_id: &str,
        external_id: &str,
    ) -> CoreResult<Option<Document>> {
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT * FROM documents WHERE source_id = ?1 AND external_id = ?2")
                .bind(source_id)
                .bind(external_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(row_to_document).transpose()
    }

    async fn list_by_source(&self, source_id: &str) -> CoreResult<Vec<Document>> {
        let rows: Vec<DocumentRow> =
            sqlx::query_as("SELECT * FROM documents WHERE source_id = ? ORDER BY external_id")
                .bind(source_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(row_to_document).collect()
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_source(&self, source_id: &str) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE source_id = ?")
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> CoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
