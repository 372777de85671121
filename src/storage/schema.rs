//! Database schema definitions
//!
//! This module contains the SQL schema for the Spindle store: the
//! `webpages` collection and the `crawl_tasks` collection, both keyed by
//! URL, with the secondary indexes the managers query against.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Persisted page records, keyed by URL.
-- List and map fields are stored as JSON text.
CREATE TABLE IF NOT EXISTS webpages (
    url TEXT PRIMARY KEY,
    redirected INTEGER NOT NULL DEFAULT 0,
    redirect_url TEXT,
    title TEXT,
    meta_description TEXT,
    text_content TEXT,
    extracted_urls TEXT NOT NULL DEFAULT '[]',
    image_data TEXT NOT NULL DEFAULT '[]',
    metadata TEXT NOT NULL DEFAULT '{}',
    last_fetched TEXT
);

CREATE INDEX IF NOT EXISTS idx_webpages_url_fetched ON webpages(url, last_fetched);
CREATE INDEX IF NOT EXISTS idx_webpages_redirect ON webpages(redirect_url);

-- Frontier work, keyed by URL.
CREATE TABLE IF NOT EXISTS crawl_tasks (
    url TEXT PRIMARY KEY,
    status TEXT NOT NULL DEFAULT 'pending',
    attempts INTEGER NOT NULL DEFAULT 0,
    last_attempted TEXT,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawl_tasks_status ON crawl_tasks(status, url);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
