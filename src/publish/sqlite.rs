//! SQLite publisher
//!
//! Stores articles in a local database. Re-publishing an article link updates
//! the stored row, so repeated sweeps over the same feed are idempotent.

use crate::publish::schema::initialize_schema;
use crate::publish::{PublishResult, Publisher};
use crate::state::Article;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct SqlitePublisher {
    conn: Mutex<Connection>,
}

impl SqlitePublisher {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path) -> PublishResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> PublishResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn upsert(&self, article: &Article) -> PublishResult<()> {
        self.conn().execute(
            "INSERT INTO articles
                (id, url, title, summary, content, source_name, source_url, category, published_at, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                content = excluded.content,
                category = excluded.category,
                published_at = excluded.published_at,
                crawled_at = excluded.crawled_at",
            params![
                article.id.to_string(),
                article.url,
                article.title,
                article.summary,
                article.content,
                article.source_name,
                article.source_url,
                article.category,
                article.published_at.to_rfc3339(),
                article.crawled_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Number of stored articles
    pub fn count_articles(&self) -> PublishResult<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Stored articles per category, most common first
    pub fn count_by_category(&self) -> PublishResult<Vec<(String, u64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM articles GROUP BY category ORDER BY COUNT(*) DESC, category",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Latest stats row for a worker: (sources processed, articles published)
    pub fn latest_stats(&self, worker_id: &str) -> PublishResult<Option<(u64, u64)>> {
        use rusqlite::OptionalExtension;

        let row = self
            .conn()
            .query_row(
                "SELECT sources_processed, articles_published FROM crawler_stats
                 WHERE worker_id = ?1 ORDER BY id DESC LIMIT 1",
                params![worker_id],
                |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
            )
            .optional()?;
        Ok(row)
    }
}

#[async_trait]
impl Publisher for SqlitePublisher {
    async fn publish_one(&self, article: &Article) -> bool {
        match self.upsert(article) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to store article '{}': {}", article.url, e);
                false
            }
        }
    }

    async fn report_stats(
        &self,
        worker_id: &str,
        sources_processed: u64,
        articles_published: u64,
    ) -> PublishResult<()> {
        self.conn().execute(
            "INSERT INTO crawler_stats (worker_id, sources_processed, articles_published, reported_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                worker_id,
                sources_processed as i64,
                articles_published as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}
