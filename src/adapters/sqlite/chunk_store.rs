//! SQLite adapter for the chunk store.
//!
//! Embeddings are stored as JSON float arrays; the search engine keeps its
//! own copy, so this column only feeds re-indexing.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{from_json, to_json};
use crate::domain::errors::CoreResult;
use crate::domain::models::Chunk;
use crate::domain::ports::ChunkStore;

#[derive(Clone)]
pub struct SqliteChunkStore {
    pool: SqlitePool,
}

impl SqliteChunkStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ChunkRow {
    id: String,
    document_id: String,
    source_id: String,
    content: String,
    position: i64,
    start_char: i64,
    end_char: i64,
    embedding: Option<String>,
}

fn row_to_chunk(row: ChunkRow) -> CoreResult<Chunk> {
    Ok(Chunk {
        id: row.id,
        document_id: row.document_id,
        source_id: row.source_id,
        content: row.content,
        position: row.position as usize,
        start_char: row.start_char as usize,
        end_char: row.end_char as usize,
        embedding: row.embedding.as_deref().map(from_json).transpose()?,
    })
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn upsert_batch(&self, chunks: &[Chunk]) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            let embedding = chunk.embedding.as_ref().map(to_json).transpose()?;
            sqlx::query(
                "INSERT INTO chunks
                 (id, document_id, source_id, content, position, start_char, end_char, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (id) DO UPDATE SET
                   content = excluded.content,
                   position = excluded.position,
                   start_char = excluded.start_char,
                   end_char = excluded.end_char,
                   embedding = excluded.embedding",
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(&chunk.source_id)
            .bind(&chunk.content)
            .bind(chunk.position as i64)
            .bind(chunk.start_char as i64)
            .bind(chunk.end_char as i64)
            .bind(embedding)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<Chunk>> {
        let row: Option<ChunkRow> = sqlx::query_as("SELECT * FROM chunks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_chunk).transpose()
    }

    async fn list_by_document(&self, document_id: &str) -> CoreResult<Vec<Chunk>> {
        let rows: Vec<ChunkRow> =
            sqlx::query_as("SELECT * FROM chunks WHERE document_id = ? ORDER BY position")
                .bind(document_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(row_to_chunk).collect()
    }

    async fn delete_by_document(&self, document_id: &str) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_source(&self, source_id: &str) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE source_id = ?")
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> CoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
