//! SQLite search backend: records table with embedding BLOBs, FTS5 table as
//! the text index and brute-force similarity as the vector index.

use async_trait::async_trait;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::traits::search::{SearchBackend, Similarity, TextIndexSpec, VectorIndexSpec};
use docagent_core::types::{IndexedRecord, SearchHit};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Mutex;

const VECTOR_KIND: &str = "vectorSearch";
const TEXT_KIND: &str = "search";

pub struct SqliteBackend {
    conn: Mutex<Connection>,
    /// Records table; the FTS table is `<table>_fts`.
    table: String,
}

fn db_err(e: rusqlite::Error) -> DocAgentError {
    DocAgentError::Search(e.to_string())
}

/// `docs_` plus the collection name mapped to `[A-Za-z0-9_]`. The prefix
/// keeps keywords and leading digits out of bare SQL identifiers.
fn table_name(collection: &str) -> String {
    let name: String = collection
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("docs_{name}")
}

fn to_blob(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn from_blob(b: &[u8]) -> Vec<f32> {
    b.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Build an FTS5 query matching any of the words in `query`.
fn fts_query(query: &str) -> Option<String> {
    let cleaned: String = query
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let terms: Vec<String> = cleaned
        .split_whitespace()
        .map(|t| format!("\"{t}\""))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

fn to_hit(text: String, metadata: &str, embedding: &[u8], score: f32) -> SearchHit {
    let mut meta: Map<String, Value> = serde_json::from_str(metadata).unwrap_or_default();
    meta.insert(
        "embedding".into(),
        Value::Array(from_blob(embedding).into_iter().map(Value::from).collect()),
    );
    SearchHit {
        text,
        metadata: meta,
        score,
    }
}

impl SqliteBackend {
    pub fn open(path: &Path, collection: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        Self::init(conn, collection)
    }

    pub fn open_in_memory(collection: &str) -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?, collection)
    }

    fn init(conn: Connection, collection: &str) -> Result<Self> {
        let table = table_name(collection);
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS search_indexes (
                collection TEXT NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                definition TEXT NOT NULL,
                PRIMARY KEY (collection, kind)
            );",
        )
        .map_err(db_err)?;
        let backend = Self {
            conn: Mutex::new(conn),
            table,
        };
        backend.create_records_table()?;
        Ok(backend)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DocAgentError::Search(format!("lock poisoned: {e}")))
    }

    fn create_records_table(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {t} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{{}}',
                embedding BLOB NOT NULL
            );",
            t = self.table
        ))
        .map_err(db_err)
    }

    fn index_definition(conn: &Connection, collection: &str, kind: &str) -> Result<Option<Value>> {
        let def: Option<String> = conn
            .query_row(
                "SELECT definition FROM search_indexes WHERE collection = ?1 AND kind = ?2",
                params![collection, kind],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        Ok(def.and_then(|d| serde_json::from_str(&d).ok()))
    }

    fn vector_spec(&self, conn: &Connection) -> Result<VectorIndexSpec> {
        let def = Self::index_definition(conn, &self.table, VECTOR_KIND)?.ok_or_else(|| {
            DocAgentError::Search(format!("No vector index on collection '{}'", self.table))
        })?;
        serde_json::from_value(def).map_err(DocAgentError::from)
    }
}

#[async_trait]
impl SearchBackend for SqliteBackend {
    async fn drop_collection(&self) -> Result<()> {
        {
            let conn = self.lock()?;
            conn.execute_batch(&format!(
                "DROP TABLE IF EXISTS {t}_fts; DROP TABLE IF EXISTS {t};",
                t = self.table
            ))
            .map_err(db_err)?;
            conn.execute(
                "DELETE FROM search_indexes WHERE collection = ?1",
                params![self.table],
            )
            .map_err(db_err)?;
        }
        tracing::info!("🗑️ Dropped collection '{}'", self.table);
        self.create_records_table()
    }

    async fn insert_records(&self, records: &[IndexedRecord]) -> Result<usize> {
        let mut conn = self.lock()?;
        let has_fts = Self::index_definition(&conn, &self.table, TEXT_KIND)?.is_some();
        let tx = conn.transaction().map_err(db_err)?;
        for record in records {
            let mut doc = record.to_document();
            doc.remove("text");
            doc.remove("embedding");
            tx.execute(
                &format!(
                    "INSERT INTO {} (text, metadata, embedding) VALUES (?1, ?2, ?3)",
                    self.table
                ),
                params![record.text, Value::Object(doc).to_string(), to_blob(&record.embedding)],
            )
            .map_err(db_err)?;
            if has_fts {
                let id = tx.last_insert_rowid();
                tx.execute(
                    &format!("INSERT INTO {}_fts (rowid, text) VALUES (?1, ?2)", self.table),
                    params![id, record.text],
                )
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        tracing::debug!("💾 Inserted {} records into '{}'", records.len(), self.table);
        Ok(records.len())
    }

    async fn create_vector_index(&self, spec: &VectorIndexSpec) -> Result<()> {
        if spec.dimensions == 0 {
            return Err(DocAgentError::Search("Vector index needs dimensions > 0".into()));
        }
        if spec.path != "embedding" {
            return Err(DocAgentError::Search(format!(
                "Unsupported vector path '{}' (only 'embedding')",
                spec.path
            )));
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO search_indexes (collection, name, kind, definition) VALUES (?1, ?2, ?3, ?4)",
            params![self.table, spec.name, VECTOR_KIND, serde_json::to_string(spec)?],
        )
        .map_err(db_err)?;
        tracing::info!(
            "🧭 Vector index '{}' ready ({} dims, {})",
            spec.name,
            spec.dimensions,
            spec.similarity.as_str()
        );
        Ok(())
    }

    async fn create_text_index(&self, spec: &TextIndexSpec) -> Result<()> {
        if spec.field != "text" {
            return Err(DocAgentError::Search(format!(
                "Unsupported text field '{}' (only 'text')",
                spec.field
            )));
        }
        let conn = self.lock()?;
        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {t}_fts;
             CREATE VIRTUAL TABLE {t}_fts USING fts5(text, tokenize='unicode61');
             INSERT INTO {t}_fts (rowid, text) SELECT id, text FROM {t};",
            t = self.table
        ))
        .map_err(db_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO search_indexes (collection, name, kind, definition) VALUES (?1, ?2, ?3, ?4)",
            params![self.table, spec.name, TEXT_KIND, serde_json::to_string(spec)?],
        )
        .map_err(db_err)?;
        tracing::info!("🔎 Full-text index '{}' ready on '{}'", spec.name, spec.field);
        Ok(())
    }

    async fn similarity_search(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let conn = self.lock()?;
        let spec = self.vector_spec(&conn)?;
        if embedding.len() != spec.dimensions {
            return Err(DocAgentError::Search(format!(
                "Query vector has {} dimensions, index '{}' expects {}",
                embedding.len(),
                spec.name,
                spec.dimensions
            )));
        }

        let mut stmt = conn
            .prepare(&format!("SELECT text, metadata, embedding FROM {}", self.table))
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(db_err)?;

        let similarity: Similarity = spec.similarity;
        let mut hits = Vec::new();
        for row in rows {
            let (text, metadata, blob) = row.map_err(db_err)?;
            let vector = from_blob(&blob);
            if vector.len() != spec.dimensions {
                continue;
            }
            let score = similarity.score(embedding, &vector);
            hits.push(to_hit(text, &metadata, &blob, score));
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn text_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let conn = self.lock()?;
        if Self::index_definition(&conn, &self.table, TEXT_KIND)?.is_none() {
            return Err(DocAgentError::Search(format!(
                "No full-text index on collection '{}'",
                self.table
            )));
        }
        let Some(fts) = fts_query(query) else {
            return Ok(Vec::new());
        };

        let mut stmt = conn
            .prepare(&format!(
                "SELECT r.text, r.metadata, r.embedding, -bm25({t}_fts) AS score
                 FROM {t}_fts JOIN {t} r ON r.id = {t}_fts.rowid
                 WHERE {t}_fts MATCH ?1
                 ORDER BY bm25({t}_fts)
                 LIMIT ?2",
                t = self.table
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![fts, k as i64], |row| {
                Ok(to_hit(
                    row.get(0)?,
                    &row.get::<_, String>(1)?,
                    &row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, f64>(3)? as f32,
                ))
            })
            .map_err(db_err)?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(db_err)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |r| r.get(0))
            .map_err(db_err)?;
        Ok(n as usize)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
