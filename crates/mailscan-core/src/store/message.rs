//! Message record storage repository.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::model::{MailRecord, MessageStats, SearchPage};
use crate::Result;

/// Keyed upsert/search/delete store for message records.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Inserts a record, replacing any record with the same `external_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn upsert(&self, record: &MailRecord) -> Result<()>;

    /// Substring search over sender, subject and title, newest first.
    ///
    /// `page` is 1-based; values below 1 are treated as 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn search(&self, query: &str, page: u32, page_size: u32) -> Result<SearchPage>;

    /// Looks up one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn get(&self, external_id: &str) -> Result<Option<MailRecord>>;

    /// Deletes a record. Returns whether a record was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn delete(&self, external_id: &str) -> Result<bool>;

    /// Returns store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn stats(&self) -> Result<MessageStats>;
}

/// `SQLite`-backed [`MessageStore`].
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                message_id TEXT PRIMARY KEY,
                sender TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL DEFAULT '',
                subject TEXT NOT NULL DEFAULT '',
                link TEXT NOT NULL DEFAULT '',
                folder TEXT NOT NULL DEFAULT '',
                timestamp TEXT,
                snippet TEXT NOT NULL DEFAULT '',
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_messages_folder ON messages(folder)",
            "CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_messages_title ON messages(title)",
        ] {
            sqlx::query(index).execute(&self.pool).await?;
        }

        Ok(())
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn record_from_row(row: &SqliteRow) -> Option<MailRecord> {
    let created_at = parse_time(&row.get::<String, _>("created_at"))?;
    let timestamp = row
        .get::<Option<String>, _>("timestamp")
        .as_deref()
        .and_then(parse_time);

    Some(MailRecord {
        external_id: row.get("message_id"),
        sender: row.get("sender"),
        subject: row.get("subject"),
        title: row.get("title"),
        link: row.get("link"),
        source_folder: row.get("folder"),
        timestamp,
        snippet: row.get("snippet"),
        is_read: row.get::<bool, _>("is_read"),
        created_at,
    })
}

/// Escapes `LIKE` wildcards so the query matches literally.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn upsert(&self, record: &MailRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO messages
                (message_id, sender, title, subject, link, folder, timestamp,
                 snippet, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(message_id) DO UPDATE SET
                sender = excluded.sender,
                title = excluded.title,
                subject = excluded.subject,
                link = excluded.link,
                folder = excluded.folder,
                timestamp = excluded.timestamp,
                snippet = excluded.snippet,
                is_read = excluded.is_read,
                created_at = excluded.created_at
            ",
        )
        .bind(&record.external_id)
        .bind(&record.sender)
        .bind(&record.title)
        .bind(&record.subject)
        .bind(&record.link)
        .bind(&record.source_folder)
        .bind(record.timestamp.as_ref().map(format_time))
        .bind(&record.snippet)
        .bind(record.is_read)
        .bind(format_time(&record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search(&self, query: &str, page: u32, page_size: u32) -> Result<SearchPage> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let pattern = like_pattern(query.trim());
        let offset = i64::from(page - 1) * i64::from(page_size);

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM messages
            WHERE title LIKE ?1 ESCAPE '\' OR subject LIKE ?1 ESCAPE '\' OR sender LIKE ?1 ESCAPE '\'
            ",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r"
            SELECT message_id, sender, title, subject, link, folder, timestamp,
                   snippet, is_read, created_at
            FROM messages
            WHERE title LIKE ?1 ESCAPE '\' OR subject LIKE ?1 ESCAPE '\' OR sender LIKE ?1 ESCAPE '\'
            ORDER BY timestamp DESC, message_id ASC
            LIMIT ?2 OFFSET ?3
            ",
        )
        .bind(&pattern)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = u64::try_from(total).unwrap_or_default();
        let total_pages = u32::try_from(total.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX);

        Ok(SearchPage {
            records: rows.iter().filter_map(record_from_row).collect(),
            total,
            page,
            page_size,
            total_pages,
        })
    }

    async fn get(&self, external_id: &str) -> Result<Option<MailRecord>> {
        let row = sqlx::query(
            r"
            SELECT message_id, sender, title, subject, link, folder, timestamp,
                   snippet, is_read, created_at
            FROM messages
            WHERE message_id = ?
            ",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(record_from_row))
    }

    async fn delete(&self, external_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE message_id = ?")
            .bind(external_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> Result<MessageStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(MessageStats {
            total_count: u64::try_from(total).unwrap_or_default(),
        })
    }
}
