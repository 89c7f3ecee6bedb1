use crate::embedding::{cosine_similarity, Embedder};
use anima_core::{
    DesireRecord, DesireStatus, Embedding, MemoryRecord, MemoryStore, OpinionRecord, Scored,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// SQLite-backed vector store.
///
/// Each record is kept as JSON next to its bincode-encoded embedding.
/// Similarity search is brute-force cosine over the table, which is ample
/// for the few thousand opinions a single assistant accumulates.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) pool: Pool<Sqlite>,
    embedder: Arc<dyn Embedder>,
}

impl SqliteStore {
    /// Open (or create) a database file. `":memory:"` gives a private
    /// in-memory database.
    pub async fn new<P: AsRef<Path>>(db_path: P, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = db_path.as_ref();
        let (options, max_connections) = if path.as_os_str() == ":memory:" {
            // Every connection would get its own in-memory database.
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .context("Invalid in-memory SQLite URL")?;
            (options, 1)
        } else {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            (options, 4)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool, embedder };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                subject TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                record_json TEXT NOT NULL,
                embedding BLOB
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create memories table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS opinions (
                id TEXT PRIMARY KEY,
                subject TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                record_json TEXT NOT NULL,
                embedding BLOB
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create opinions table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS desires (
                id TEXT PRIMARY KEY,
                opinion_id TEXT NOT NULL,
                label TEXT NOT NULL,
                status TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                record_json TEXT NOT NULL,
                embedding BLOB
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create desires table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_desires_status ON desires(status)")
            .execute(&self.pool)
            .await
            .context("Failed to create desires status index")?;

        Ok(())
    }

    /// Use the caller's embedding when present, otherwise compute one.
    fn embedding_for(&self, existing: &Embedding, text: &str) -> Result<Embedding> {
        if existing.is_empty() {
            self.embedder.embed(text)
        } else {
            Ok(existing.clone())
        }
    }

    /// Score every row of `table` against `query`, best first.
    async fn search_table<T>(&self, table: &str, query: &str, top_k: usize) -> Result<Vec<Scored<T>>>
    where
        T: DeserializeOwned + WithEmbedding,
    {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = self
            .embedder
            .embed(query)
            .context("Failed to embed search query")?;

        let rows = sqlx::query(&format!("SELECT record_json, embedding FROM {}", table))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to scan {}", table))?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Option<Vec<u8>> = row.get("embedding");
            let Some(blob) = blob else { continue };
            let embedding = match bincode::deserialize::<Vec<f32>>(&blob) {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Skipping {} row with corrupt embedding: {}", table, e);
                    continue;
                }
            };
            let similarity = cosine_similarity(&query_embedding, &embedding);
            let json: String = row.get("record_json");
            let mut record: T = serde_json::from_str(&json)
                .with_context(|| format!("Failed to decode {} record", table))?;
            record.set_embedding(embedding);
            scored.push(Scored { record, similarity });
        }

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn get_by_id<T>(&self, table: &str, id: Uuid) -> Result<Option<T>>
    where
        T: DeserializeOwned + WithEmbedding,
    {
        let row = sqlx::query(&format!(
            "SELECT record_json, embedding FROM {} WHERE id = ?",
            table
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load {} {}", table, id))?;

        match row {
            Some(row) => {
                let json: String = row.get("record_json");
                let mut record: T = serde_json::from_str(&json)?;
                let blob: Option<Vec<u8>> = row.get("embedding");
                if let Some(blob) = blob {
                    match bincode::deserialize::<Vec<f32>>(&blob) {
                        Ok(embedding) => record.set_embedding(embedding),
                        Err(e) => tracing::warn!(
                            "{} {} has a corrupt embedding; it will be re-embedded on the next write: {}",
                            table,
                            id,
                            e
                        ),
                    }
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub async fn memory_count(&self) -> Result<i64> {
        self.count("memories").await
    }

    pub async fn opinion_count(&self) -> Result<i64> {
        self.count("opinions").await
    }

    pub async fn desire_count(&self) -> Result<i64> {
        self.count("desires").await
    }

    async fn count(&self, table: &str) -> Result<i64> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Every opinion, most recently revised first.
    pub async fn all_opinions(&self) -> Result<Vec<OpinionRecord>> {
        let rows = sqlx::query("SELECT record_json FROM opinions ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list opinions")?;
        rows.into_iter()
            .map(|row| {
                let json: String = row.get("record_json");
                serde_json::from_str(&json).context("Failed to decode opinion")
            })
            .collect()
    }
}

/// Records keep their embedding out of the JSON column.
trait WithEmbedding {
    fn set_embedding(&mut self, embedding: Embedding);
}

impl WithEmbedding for MemoryRecord {
    fn set_embedding(&mut self, embedding: Embedding) {
        self.embedding = embedding;
    }
}

impl WithEmbedding for OpinionRecord {
    fn set_embedding(&mut self, embedding: Embedding) {
        self.embedding = embedding;
    }
}

impl WithEmbedding for DesireRecord {
    fn set_embedding(&mut self, embedding: Embedding) {
        self.embedding = embedding;
    }
}

/// JSON form of a record with the embedding stripped.
fn json_without_embedding<T: Serialize + Clone + WithEmbedding>(record: &T) -> Result<String> {
    let mut stripped = record.clone();
    stripped.set_embedding(Vec::new());
    serde_json::to_string(&stripped).context("Failed to encode record")
}

fn encode_embedding(embedding: &Embedding) -> Result<Vec<u8>> {
    bincode::serialize(embedding).context("Failed to serialize embedding")
}

#[async_trait]
impl MemoryStore for SqliteStore {
    async fn store_memory(&self, memory: &MemoryRecord) -> Result<()> {
        let embedding = self.embedding_for(&memory.embedding, &memory.content)?;
        sqlx::query(
            "INSERT OR IGNORE INTO memories (id, content, subject, timestamp, record_json, embedding)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(memory.id.to_string())
        .bind(&memory.content)
        .bind(memory.subject.as_str())
        .bind(memory.timestamp.timestamp_millis())
        .bind(json_without_embedding(memory)?)
        .bind(encode_embedding(&embedding)?)
        .execute(&self.pool)
        .await
        .context("Failed to store memory")?;
        Ok(())
    }

    async fn search_memories(&self, query: &str, top_k: usize) -> Result<Vec<Scored<MemoryRecord>>> {
        self.search_table("memories", query, top_k).await
    }

    async fn search_opinions(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Scored<OpinionRecord>>> {
        self.search_table("opinions", query, top_k).await
    }

    async fn get_opinion(&self, id: Uuid) -> Result<Option<OpinionRecord>> {
        self.get_by_id("opinions", id).await
    }

    async fn upsert_opinion(&self, opinion: &OpinionRecord) -> Result<()> {
        let embedding = self.embedding_for(&opinion.embedding, opinion.embedding_text())?;
        sqlx::query(
            "INSERT INTO opinions (id, subject, updated_at, record_json, embedding)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                subject = excluded.subject,
                updated_at = excluded.updated_at,
                record_json = excluded.record_json,
                embedding = excluded.embedding",
        )
        .bind(opinion.id.to_string())
        .bind(&opinion.subject)
        .bind(opinion.updated_at.timestamp_millis())
        .bind(json_without_embedding(opinion)?)
        .bind(encode_embedding(&embedding)?)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert opinion {}", opinion.id))?;
        Ok(())
    }

    async fn delete_opinion(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM opinions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete opinion {}", id))?;
        Ok(())
    }

    async fn search_desires(&self, query: &str, top_k: usize) -> Result<Vec<Scored<DesireRecord>>> {
        self.search_table("desires", query, top_k).await
    }

    async fn get_desire(&self, id: Uuid) -> Result<Option<DesireRecord>> {
        self.get_by_id("desires", id).await
    }

    async fn upsert_desire(&self, desire: &DesireRecord) -> Result<()> {
        let embedding = self.embedding_for(&desire.embedding, desire.embedding_text())?;
        sqlx::query(
            "INSERT INTO desires (id, opinion_id, label, status, updated_at, record_json, embedding)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                label = excluded.label,
                status = excluded.status,
                updated_at = excluded.updated_at,
                record_json = excluded.record_json,
                embedding = excluded.embedding",
        )
        .bind(desire.id.to_string())
        .bind(desire.opinion_id.to_string())
        .bind(&desire.label)
        .bind(desire.status.as_str())
        .bind(desire.updated_at.timestamp_millis())
        .bind(json_without_embedding(desire)?)
        .bind(encode_embedding(&embedding)?)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert desire {}", desire.id))?;
        Ok(())
    }

    async fn desires_with_status(&self, status: DesireStatus) -> Result<Vec<DesireRecord>> {
        let rows = sqlx::query(
            "SELECT record_json FROM desires WHERE status = ? ORDER BY updated_at ASC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list desires by status")?;

        rows.into_iter()
            .map(|row| {
                let json: String = row.get("record_json");
                serde_json::from_str(&json).context("Failed to decode desire")
            })
            .collect()
    }
}
