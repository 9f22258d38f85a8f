//! Extracted article storage repository.
//!
//! Articles are stored as JSON documents keyed by the caller's article id.

use async_trait::async_trait;
use chrono::SecondsFormat;
use mailscan_extract::ExtractionResult;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::warn;

use super::model::{ArticleStats, StoredArticle};
use crate::Result;

/// Keyed store for extracted article bodies.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Stores an extraction result under `id`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    async fn put(&self, id: &str, url: &str, result: &ExtractionResult) -> Result<StoredArticle>;

    /// Loads an article.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn get(&self, id: &str) -> Result<Option<StoredArticle>>;

    /// Returns whether an article is stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Lists stored article ids in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn list_ids(&self) -> Result<Vec<String>>;

    /// Deletes an article. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Returns store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn stats(&self) -> Result<ArticleStats>;
}

/// `SQLite`-backed [`ArticleStore`].
#[derive(Debug, Clone)]
pub struct ArticleRepository {
    pool: SqlitePool,
}

impl ArticleRepository {
    /// Create a new repository with the given database path.
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

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS articles (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                imported_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ArticleStore for ArticleRepository {
    async fn put(&self, id: &str, url: &str, result: &ExtractionResult) -> Result<StoredArticle> {
        let article = StoredArticle::new(id, url, result);
        let data = serde_json::to_string(&article)?;

        sqlx::query(
            r"
            INSERT INTO articles (id, data, imported_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                data = excluded.data,
                imported_at = excluded.imported_at
            ",
        )
        .bind(&article.id)
        .bind(&data)
        .bind(article.imported_at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .execute(&self.pool)
        .await?;

        Ok(article)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredArticle>> {
        let row = sqlx::query("SELECT data FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let data: String = row.get("data");
        match serde_json::from_str(&data) {
            Ok(article) => Ok(Some(article)),
            Err(e) => {
                warn!(id, ?e, "Stored article is unreadable");
                Err(e.into())
            }
        }
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM articles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> Result<ArticleStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(ArticleStats {
            total_count: u64::try_from(total).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailscan_extract::ContentKind;

    fn result(title: &str) -> ExtractionResult {
        ExtractionResult {
            title: title.to_string(),
            body_html: format!("<p>{title} body</p>"),
            content_kind: ContentKind::Html,
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let repo = ArticleRepository::in_memory().await.unwrap();
        repo.put("a1", "https://dev.to/x/post", &result("Post"))
            .await
            .unwrap();

        let article = repo.get("a1").await.unwrap().unwrap();
        assert_eq!(article.title, "Post");
        assert_eq!(article.domain, "dev.to");
        assert_eq!(article.body_html, "<p>Post body</p>");
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let repo = ArticleRepository::in_memory().await.unwrap();
        repo.put("a1", "https://x.example/1", &result("Old"))
            .await
            .unwrap();
        repo.put("a1", "https://x.example/1", &result("New"))
            .await
            .unwrap();

        assert_eq!(repo.stats().await.unwrap().total_count, 1);
        assert_eq!(repo.get("a1").await.unwrap().unwrap().title, "New");
    }

    #[tokio::test]
    async fn test_exists_list_delete() {
        let repo = ArticleRepository::in_memory().await.unwrap();
        for id in ["b", "a", "c"] {
            repo.put(id, "https://x.example/", &result(id)).await.unwrap();
        }

        assert!(repo.exists("a").await.unwrap());
        assert!(!repo.exists("z").await.unwrap());
        assert_eq!(repo.list_ids().await.unwrap(), vec!["a", "b", "c"]);

        assert!(repo.delete("b").await.unwrap());
        assert!(!repo.delete("b").await.unwrap());
        assert_eq!(repo.list_ids().await.unwrap(), vec!["a", "c"]);
        assert_eq!(repo.stats().await.unwrap().total_count, 2);
    }
}
