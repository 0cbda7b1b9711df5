//! SQLite schema for the local article store

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Published articles, one row per article link
CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    summary TEXT NOT NULL,
    content TEXT NOT NULL,
    source_name TEXT NOT NULL,
    source_url TEXT NOT NULL,
    category TEXT NOT NULL,
    published_at TEXT NOT NULL,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source_url);
CREATE INDEX IF NOT EXISTS idx_articles_category ON articles(category);
CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published_at);

-- Stats reported by workers after each sweep
CREATE TABLE IF NOT EXISTS crawler_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    worker_id TEXT NOT NULL,
    sources_processed INTEGER NOT NULL,
    articles_published INTEGER NOT NULL,
    reported_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawler_stats_worker ON crawler_stats(worker_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Gets the current schema version
pub fn get_schema_version() -> u32 {
    1
}
