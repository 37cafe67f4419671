//! SQLite checkpoint store. One row per (thread, step), messages as JSON.

use async_trait::async_trait;
use docagent_core::error::{DocAgentError, Result};
use docagent_core::traits::checkpoint::{Checkpoint, Checkpointer, GraphNode};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteCheckpointer {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> DocAgentError {
    DocAgentError::Checkpoint(e.to_string())
}

impl SqliteCheckpointer {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path).map_err(db_err)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT NOT NULL,
                step INTEGER NOT NULL,
                next_node TEXT NOT NULL,
                messages TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (thread_id, step)
            );
            CREATE INDEX IF NOT EXISTS idx_checkpoints_created ON checkpoints(created_at);",
        )
        .map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DocAgentError::Checkpoint(format!("lock poisoned: {e}")))
    }

    #[cfg(test)]
    fn step_count(&self, thread_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM checkpoints WHERE thread_id = ?1",
                params![thread_id],
                |r| r.get(0),
            )
            .map_err(db_err)?;
        Ok(n as usize)
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO checkpoints (thread_id, step, next_node, messages, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                checkpoint.thread_id,
                checkpoint.step as i64,
                checkpoint.next.as_str(),
                serde_json::to_string(&checkpoint.messages)?,
                checkpoint.created_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        tracing::debug!(
            "💾 Checkpoint {}#{} (next: {}, {} messages)",
            checkpoint.thread_id,
            checkpoint.step,
            checkpoint.next,
            checkpoint.messages.len()
        );
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT step, next_node, messages, created_at FROM checkpoints
                 WHERE thread_id = ?1 ORDER BY step DESC LIMIT 1",
                params![thread_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        let Some((step, next, messages, created_at)) = row else {
            return Ok(None);
        };
        let next = GraphNode::parse(&next)
            .ok_or_else(|| DocAgentError::Checkpoint(format!("Unknown node '{next}' in checkpoint")))?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|d| d.with_timezone(&chrono::Utc))
            .map_err(|e| DocAgentError::Checkpoint(format!("Bad checkpoint timestamp: {e}")))?;

        Ok(Some(Checkpoint {
            thread_id: thread_id.to_string(),
            step: step as u64,
            next,
            messages: serde_json::from_str(&messages)?,
            created_at,
        }))
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT thread_id FROM checkpoints GROUP BY thread_id ORDER BY MAX(created_at) DESC, thread_id",
            )
            .map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(db_err)?;
        rows.collect::<std::result::Result<Vec<String>, _>>()
            .map_err(db_err)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM checkpoints WHERE thread_id = ?1", params![thread_id])
            .map_err(db_err)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
