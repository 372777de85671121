//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage
//! trait. Page list/map fields are serialized to JSON columns; every bulk
//! operation runs in a transaction but remains idempotent per document,
//! so replaying a batch after a partial failure is safe.

use crate::model::{CrawlTask, Page, TaskStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::SpindleError;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

/// Raw page row before JSON columns are decoded
struct PageRow {
    url: String,
    redirected: bool,
    redirect_url: Option<String>,
    title: Option<String>,
    meta_description: Option<String>,
    text_content: Option<String>,
    extracted_urls: String,
    image_data: String,
    metadata: String,
    last_fetched: Option<String>,
}

const PAGE_COLUMNS: &str = "url, redirected, redirect_url, title, meta_description, \
     text_content, extracted_urls, image_data, metadata, last_fetched";

fn read_page_row(row: &Row<'_>) -> rusqlite::Result<PageRow> {
    Ok(PageRow {
        url: row.get(0)?,
        redirected: row.get::<_, i64>(1)? != 0,
        redirect_url: row.get(2)?,
        title: row.get(3)?,
        meta_description: row.get(4)?,
        text_content: row.get(5)?,
        extracted_urls: row.get(6)?,
        image_data: row.get(7)?,
        metadata: row.get(8)?,
        last_fetched: row.get(9)?,
    })
}

fn decode_page(raw: PageRow) -> StorageResult<Page> {
    Ok(Page {
        url: raw.url,
        redirected: raw.redirected,
        redirect_url: raw.redirect_url,
        title: raw.title,
        meta_description: raw.meta_description,
        text_content: raw.text_content,
        extracted_urls: serde_json::from_str(&raw.extracted_urls)?,
        image_data: serde_json::from_str(&raw.image_data)?,
        metadata: serde_json::from_str(&raw.metadata)?,
        last_fetched: raw.last_fetched,
    })
}

impl SqliteStorage {
    /// Opens or creates the store at the given path
    pub fn new(path: &Path) -> Result<Self, SpindleError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory store (tests and tooling)
    pub fn new_in_memory() -> Result<Self, SpindleError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl Storage for SqliteStorage {
    // ===== Task Management =====

    fn pending_tasks(&self, limit: usize) -> StorageResult<Vec<CrawlTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, status, attempts, last_attempted, error_message
             FROM crawl_tasks WHERE status = 'pending' ORDER BY url LIMIT ?1",
        )?;

        let tasks = stmt
            .query_map(params![limit as i64], |row| {
                Ok(CrawlTask {
                    url: row.get(0)?,
                    status: TaskStatus::from_db_string(&row.get::<_, String>(1)?)
                        .unwrap_or(TaskStatus::Pending),
                    attempts: row.get(2)?,
                    last_attempted: row.get(3)?,
                    error_message: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    fn task_exists(&self, url: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawl_tasks WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert_new_tasks(&mut self, urls: &[String]) -> StorageResult<usize> {
        if urls.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut created = 0;
        {
            // INSERT OR IGNORE absorbs both in-batch duplicates and races
            // with a concurrently inserted task for the same URL.
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO crawl_tasks (url, status, attempts)
                 SELECT ?1, 'pending', 0
                 WHERE NOT EXISTS (
                     SELECT 1 FROM webpages WHERE url = ?1 OR redirect_url = ?1
                 )",
            )?;

            for url in urls {
                created += stmt.execute(params![url])?;
            }
        }
        tx.commit()?;

        Ok(created)
    }

    fn remove_tasks(&mut self, urls: &[String]) -> StorageResult<usize> {
        if urls.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM crawl_tasks WHERE url = ?1")?;
            for url in urls {
                removed += stmt.execute(params![url])?;
            }
        }
        tx.commit()?;

        Ok(removed)
    }

    fn count_tasks(&self, status: Option<TaskStatus>) -> StorageResult<u64> {
        let count: i64 = match status {
            Some(status) => self.conn.query_row(
                "SELECT COUNT(*) FROM crawl_tasks WHERE status = ?1",
                params![status.to_db_string()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM crawl_tasks", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    // ===== Page Management =====

    fn page_exists(&self, url: &str) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM webpages WHERE url = ?1 OR redirect_url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<Page>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM webpages WHERE url = ?1", PAGE_COLUMNS),
                params![url],
                read_page_row,
            )
            .optional()?;

        raw.map(decode_page).transpose()
    }

    fn upsert_pages(&mut self, pages: &[Page]) -> StorageResult<()> {
        if pages.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO webpages (url, redirected, redirect_url, title,
                     meta_description, text_content, extracted_urls, image_data,
                     metadata, last_fetched)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(url) DO UPDATE SET
                     redirected = excluded.redirected,
                     redirect_url = excluded.redirect_url,
                     title = excluded.title,
                     meta_description = excluded.meta_description,
                     text_content = excluded.text_content,
                     extracted_urls = excluded.extracted_urls,
                     image_data = excluded.image_data,
                     metadata = excluded.metadata,
                     last_fetched = excluded.last_fetched",
            )?;

            for page in pages {
                stmt.execute(params![
                    page.url,
                    page.redirected as i64,
                    page.redirect_url,
                    page.title,
                    page.meta_description,
                    page.text_content,
                    serde_json::to_string(&page.extracted_urls)?,
                    serde_json::to_string(&page.image_data)?,
                    serde_json::to_string(&page.metadata)?,
                    page.last_fetched,
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM webpages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Image Sizing Support =====

    fn pages_with_unsized_images(
        &self,
        after_url: Option<&str>,
        limit: usize,
    ) -> StorageResult<Vec<Page>> {
        // serde_json writes Option::None compactly, so an unsized image
        // always contains this exact substring. The decoded check below
        // stays authoritative.
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM webpages
             WHERE url > ?1 AND image_data LIKE '%\"file_size\":null%'
             ORDER BY url LIMIT ?2",
            PAGE_COLUMNS
        ))?;

        let rows = stmt
            .query_map(
                params![after_url.unwrap_or(""), limit as i64],
                read_page_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut pages = Vec::new();
        for raw in rows {
            let page = decode_page(raw)?;
            if page.image_data.iter().any(|img| img.file_size.is_none()) {
                pages.push(page);
            }
        }

        Ok(pages)
    }

    fn update_image_sizing(
        &mut self,
        page_url: &str,
        image_url: &str,
        file_size: u64,
        format: Option<&str>,
    ) -> StorageResult<()> {
        let Some(mut page) = self.get_page(page_url)? else {
            return Ok(());
        };

        let mut touched = false;
        for image in &mut page.image_data {
            if image.url == image_url {
                image.file_size = Some(file_size);
                image.format = format.map(str::to_string);
                touched = true;
            }
        }

        if touched {
            self.conn.execute(
                "UPDATE webpages SET image_data = ?1 WHERE url = ?2",
                params![serde_json::to_string(&page.image_data)?, page_url],
            )?;
        }

        Ok(())
    }
}
