//! SQLite-backed document pipeline
//!
//! This module provides the default [`DocumentPipeline`]: fetched documents
//! are upserted into a `documents` table keyed by URL, deletion notices
//! remove the row and `optimize` compacts the database.

use crate::processor::{Document, DocumentPipeline, PipelineCommand};
use crate::{FrontierError, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = "
-- One row per emitted document
CREATE TABLE IF NOT EXISTS documents (
    url TEXT PRIMARY KEY,
    title TEXT,
    text TEXT NOT NULL,
    anchors TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    hotspot INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_documents_hotspot ON documents(hotspot);
";

/// A document row as stored
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
    /// Anchor texts, one per line
    pub anchors: String,
    /// RFC 3339
    pub fetched_at: String,
    pub hotspot: bool,
}

/// Default downstream pipeline writing documents to SQLite
pub struct SqliteDocumentSink {
    conn: Mutex<Connection>,
}

impl SqliteDocumentSink {
    /// Opens or creates the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        Self::with_connection(conn)
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FrontierError::Pipeline(format!("Failed to lock database: {}", e)))
    }

    pub fn document_count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn get(&self, url: &str) -> Result<Option<StoredDocument>> {
        let conn = self.lock()?;
        let doc = conn
            .query_row(
                "SELECT url, title, text, anchors, fetched_at, hotspot FROM documents WHERE url = ?1",
                params![url],
                |row| {
                    Ok(StoredDocument {
                        url: row.get(0)?,
                        title: row.get(1)?,
                        text: row.get(2)?,
                        anchors: row.get(3)?,
                        fetched_at: row.get(4)?,
                        hotspot: row.get::<_, i64>(5)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(doc)
    }

    fn delete(&self, url: &str) -> Result<()> {
        let removed = self
            .lock()?
            .execute("DELETE FROM documents WHERE url = ?1", params![url])?;
        tracing::debug!("Deleted {} ({} rows)", url, removed);
        Ok(())
    }
}

fn format_timestamp(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

#[async_trait]
impl DocumentPipeline for SqliteDocumentSink {
    async fn process(&self, doc: &Document) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO documents (url, title, text, anchors, fetched_at, hotspot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                text = excluded.text,
                anchors = excluded.anchors,
                fetched_at = excluded.fetched_at,
                hotspot = excluded.hotspot",
            params![
                doc.url,
                doc.title,
                doc.text,
                doc.anchors.join("\n"),
                format_timestamp(doc.fetched_at),
                doc.hotspot as i64,
            ],
        )?;
        Ok(())
    }

    async fn apply_command(&self, command: PipelineCommand, doc: Option<&Document>) -> Result<()> {
        match command {
            PipelineCommand::Delete => match doc {
                Some(doc) => self.delete(&doc.url),
                None => Err(FrontierError::Pipeline(
                    "delete command without a document".to_string(),
                )),
            },
            PipelineCommand::Optimize => {
                tracing::info!("Optimizing document database");
                self.lock()?.execute_batch("VACUUM;")?;
                Ok(())
            }
        }
    }
}
