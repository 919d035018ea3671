//! SQLite vector store for entries and their passages
//!
//! One connection behind a mutex. Passages are keyed by `(group_id, ordinal)`
//! and cascade-deleted with their owning entry.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{CanonicalEntry, EntrySummary, Passage, StoreStats, StoredPassage};

use super::codec::{decode_vector, encode_vector};

const DIMENSIONS_KEY: &str = "dimensions";

/// SQLite-backed vector store
#[derive(Clone)]
pub struct VectorStore {
    conn: Arc<Mutex<Connection>>,
    dimensions: usize,
}

impl VectorStore {
    /// Create or open the store at the given path
    ///
    /// Fails with a configuration error if the file was created with a
    /// different vector dimension.
    pub fn open<P: AsRef<Path>>(path: P, dimensions: usize) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Internal(format!("Failed to open database {}: {}", path.display(), e)))?;

        let store = Self::from_connection(conn, dimensions)?;
        info!(path = %path.display(), dims = dimensions, "Vector store opened");
        Ok(store)
    }

    /// Create an in-memory store
    pub fn in_memory(dimensions: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Internal(format!("Failed to open in-memory database: {}", e)))?;
        Self::from_connection(conn, dimensions)
    }

    fn from_connection(conn: Connection, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::config("vector dimensions must be > 0"));
        }
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            dimensions,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run schema migrations and stamp the vector dimension
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            PRAGMA temp_store=MEMORY;
            "#,
        )
        .map_err(|e| Error::Internal(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                unique_id TEXT PRIMARY KEY,
                full_text TEXT NOT NULL,
                index_text TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS passages (
                group_id TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                text TEXT NOT NULL,
                vector_json TEXT NOT NULL,
                PRIMARY KEY (group_id, ordinal),
                FOREIGN KEY (group_id) REFERENCES entries(unique_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_passages_group_id ON passages(group_id);

            CREATE TABLE IF NOT EXISTS store_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| Error::Internal(format!("Failed to create tables: {}", e)))?;

        let stamped: Option<String> = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = ?1",
                params![DIMENSIONS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match stamped {
            None => {
                conn.execute(
                    "INSERT INTO store_meta (key, value) VALUES (?1, ?2)",
                    params![DIMENSIONS_KEY, self.dimensions.to_string()],
                )?;
            }
            Some(value) => {
                let existing: usize = value.parse().map_err(|_| {
                    Error::config(format!("store_meta has an invalid dimension: {}", value))
                })?;
                if existing != self.dimensions {
                    return Err(Error::config(format!(
                        "store holds {}-dimensional vectors but {} were configured",
                        existing, self.dimensions
                    )));
                }
            }
        }

        debug!("Database migrations complete");
        Ok(())
    }

    /// Stamped vector dimension
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Run a store operation on the blocking thread pool
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&VectorStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    // ==================== Entries ====================

    /// Insert or replace an entry
    ///
    /// Passages survive while the index text is unchanged; when it changes
    /// they are dropped in the same transaction so the entry is picked up by
    /// the next backfill instead of answering with stale text.
    pub fn put_entry(&self, entry: &CanonicalEntry) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Internal(format!("Failed to begin transaction: {}", e)))?;

        let previous: Option<String> = tx
            .query_row(
                "SELECT index_text FROM entries WHERE unique_id = ?1",
                params![entry.unique_id],
                |row| row.get(0),
            )
            .optional()?;

        upsert_entry(&tx, entry)?;
        if previous.is_some_and(|text| text != entry.index_text) {
            tx.execute("DELETE FROM passages WHERE group_id = ?1", params![entry.unique_id])?;
            debug!(unique_id = %entry.unique_id, "Index text changed, passages dropped");
        }

        tx.commit()
            .map_err(|e| Error::Internal(format!("Failed to commit transaction: {}", e)))?;
        Ok(())
    }

    /// Upsert an entry and replace its passages as one transaction
    pub fn put_entry_with_passages(
        &self,
        entry: &CanonicalEntry,
        passages: &[Passage],
    ) -> Result<usize> {
        let encoded = self.encode_passages(&entry.unique_id, passages)?;

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Internal(format!("Failed to begin transaction: {}", e)))?;

        upsert_entry(&tx, entry)?;
        replace_group(&tx, &entry.unique_id, passages, &encoded)?;

        tx.commit()
            .map_err(|e| Error::Internal(format!("Failed to commit transaction: {}", e)))?;

        debug!(unique_id = %entry.unique_id, passages = passages.len(), "Entry and passages written");
        Ok(passages.len())
    }

    /// Get an entry by id
    pub fn get_entry(&self, unique_id: &str) -> Result<Option<CanonicalEntry>> {
        let conn = self.conn.lock();

        let entry = conn
            .query_row(
                "SELECT unique_id, full_text, index_text FROM entries WHERE unique_id = ?1",
                params![unique_id],
                |row| {
                    Ok(CanonicalEntry {
                        unique_id: row.get(0)?,
                        full_text: row.get(1)?,
                        index_text: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(entry)
    }

    /// Delete an entry and, by cascade, its passages
    pub fn delete_entry(&self, unique_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM entries WHERE unique_id = ?1", params![unique_id])?;
        Ok(deleted > 0)
    }

    /// Page through entries, newest first
    pub fn list_entries(&self, limit: usize, offset: usize) -> Result<Vec<EntrySummary>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            r#"
            SELECT e.unique_id, e.index_text, e.created_at, e.updated_at,
                   (SELECT COUNT(*) FROM passages p WHERE p.group_id = e.unique_id)
            FROM entries e
            ORDER BY e.rowid DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64, offset as i64], |row| {
            let created_at: String = row.get(2)?;
            let updated_at: String = row.get(3)?;
            let passage_count: i64 = row.get(4)?;
            Ok(EntrySummary {
                unique_id: row.get(0)?,
                index_text: row.get(1)?,
                passage_count: passage_count as usize,
                created_at: parse_timestamp(&created_at),
                updated_at: parse_timestamp(&updated_at),
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Total entries
    pub fn count_entries(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Entries that own no passages yet
    pub fn entries_without_passages(&self) -> Result<Vec<CanonicalEntry>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            r#"
            SELECT unique_id, full_text, index_text FROM entries e
            WHERE NOT EXISTS (SELECT 1 FROM passages p WHERE p.group_id = e.unique_id)
            ORDER BY e.rowid
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(CanonicalEntry {
                unique_id: row.get(0)?,
                full_text: row.get(1)?,
                index_text: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ==================== Passages ====================

    /// Replace every passage of a group in one transaction
    ///
    /// Ordinals are assigned from the slice position.
    pub fn put_passages(&self, group_id: &str, passages: &[Passage]) -> Result<usize> {
        let encoded = self.encode_passages(group_id, passages)?;

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Internal(format!("Failed to begin transaction: {}", e)))?;

        let owner_exists: bool = tx
            .query_row(
                "SELECT 1 FROM entries WHERE unique_id = ?1",
                params![group_id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !owner_exists {
            return Err(Error::not_found(format!("entry {}", group_id)));
        }

        replace_group(&tx, group_id, passages, &encoded)?;

        tx.commit()
            .map_err(|e| Error::Internal(format!("Failed to commit transaction: {}", e)))?;

        debug!(group_id, passages = passages.len(), "Passages written");
        Ok(passages.len())
    }

    /// Check dimensions and encode vectors before any lock is taken
    fn encode_passages(&self, group_id: &str, passages: &[Passage]) -> Result<Vec<String>> {
        if let Some(bad) = passages.iter().find(|p| p.vector.len() != self.dimensions) {
            return Err(Error::config(format!(
                "vector for group {} has {} dimensions, store has {}",
                group_id,
                bad.vector.len(),
                self.dimensions
            )));
        }

        passages.iter().map(|p| encode_vector(&p.vector)).collect()
    }

    /// Remove every passage of a group, keeping the entry
    pub fn delete_group(&self, group_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM passages WHERE group_id = ?1", params![group_id])?;
        Ok(deleted)
    }

    /// Every stored passage, ordered by `(group_id, ordinal)`
    ///
    /// Rows whose vector cannot be decoded are logged and skipped.
    pub fn fetch_all_vectors(&self) -> Result<Vec<StoredPassage>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT group_id, ordinal, text, vector_json FROM passages ORDER BY group_id, ordinal",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut passages = Vec::new();
        for row in rows {
            let (group_id, ordinal, text, vector_json) = row?;
            match decode_vector(&group_id, ordinal, &vector_json, self.dimensions) {
                Ok(vector) => passages.push(StoredPassage {
                    group_id,
                    ordinal: ordinal as u32,
                    text,
                    vector,
                }),
                Err(e) => warn!(error = %e, "Skipping corrupt passage"),
            }
        }

        Ok(passages)
    }

    /// Passage count for one group
    pub fn passage_count(&self, group_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passages WHERE group_id = ?1",
            params![group_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Store counters
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();

        let (entries, entries_with_passages, passages): (i64, i64, i64) = conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM entries),
                (SELECT COUNT(DISTINCT group_id) FROM passages),
                (SELECT COUNT(*) FROM passages)
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(StoreStats {
            entries: entries as usize,
            entries_with_passages: entries_with_passages as usize,
            passages: passages as usize,
            dimensions: self.dimensions,
        })
    }
}

fn upsert_entry(conn: &Connection, entry: &CanonicalEntry) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        r#"
        INSERT INTO entries (unique_id, full_text, index_text, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        ON CONFLICT(unique_id) DO UPDATE SET
            full_text = excluded.full_text,
            index_text = excluded.index_text,
            updated_at = excluded.updated_at
        "#,
        params![entry.unique_id, entry.full_text, entry.index_text, now],
    )?;
    Ok(())
}

/// Ordinals are assigned from the slice position
fn replace_group(
    conn: &Connection,
    group_id: &str,
    passages: &[Passage],
    encoded: &[String],
) -> Result<()> {
    conn.execute("DELETE FROM passages WHERE group_id = ?1", params![group_id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO passages (group_id, ordinal, text, vector_json) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (ordinal, (passage, vector_json)) in passages.iter().zip(encoded).enumerate() {
        stmt.execute(params![group_id, ordinal as i64, passage.text, vector_json])?;
    }
    Ok(())
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(d) => d.with_timezone(&Utc),
        Err(e) => {
            warn!(raw, error = %e, "Unparsable stored timestamp, using now");
            Utc::now()
        }
    }
}

#[cfg(test)]
impl VectorStore {
    /// Write a raw vector column, bypassing the codec
    fn put_raw_passage(&self, group_id: &str, ordinal: i64, vector_json: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO passages (group_id, ordinal, text, vector_json) VALUES (?1, ?2, 'raw', ?3)",
            params![group_id, ordinal, vector_json],
        )?;
        Ok(())
    }
}
