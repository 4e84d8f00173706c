use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use nr_core::{
    Article, ArticleStatus, ArticleStore, BrandVoice, BrandVoiceStore, ContentStore, Error,
    ReformattedContent, Result, Storage, User, UserStore,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use crate::merge_existing;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        doc TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        doc TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_articles_owner ON articles (owner_id, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS brand_voices (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        name TEXT NOT NULL,
        doc TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contents (
        id TEXT PRIMARY KEY,
        article_id TEXT NOT NULL,
        platform TEXT NOT NULL,
        created_at TEXT NOT NULL,
        doc TEXT NOT NULL,
        UNIQUE (article_id, platform)
    )
    "#,
];

fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| Error::Database(format!("{}: {}", context, e))
}

fn to_doc<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn from_doc<T: DeserializeOwned>(doc: &str) -> Result<T> {
    Ok(serde_json::from_str(doc)?)
}

fn status_str(status: ArticleStatus) -> Result<String> {
    Ok(serde_json::to_value(status)?.as_str().unwrap_or_default().to_string())
}

/// Document-style SQLite backend: one JSON document per row, with the
/// fields used for lookups mirrored into indexed columns.
pub struct SQLiteStorage {
    pool: SqlitePool,
    db_path: Option<PathBuf>,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let mut storage = Self::connect_with(options).await?;
        storage.db_path = Some(db_path.to_path_buf());
        Ok(storage)
    }

    /// Connects to a `sqlite:` URL such as `sqlite://newsroom.db`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_error("Invalid database URL"))?
            .create_if_missing(true);
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self { pool, db_path: None })
    }

    pub fn get_db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl Storage for SQLiteStorage {
    fn backend_name(&self) -> &str {
        "sqlite"
    }
}

#[async_trait]
impl UserStore for SQLiteStorage {
    async fn create_user(&self, user: &User) -> Result<()> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(Error::Conflict(format!("email {} is already registered", user.email)));
        }
        sqlx::query("INSERT INTO users (id, email, password_hash, created_at, doc) VALUES (?, ?, ?, ?, ?)")
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.created_at.to_rfc3339())
            .bind(to_doc(user)?)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    Error::Conflict(format!("email {} is already registered", user.email))
                }
                other => Error::Database(format!("Failed to store user: {}", other)),
            })?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<(String, String)> = sqlx::query_as("SELECT doc, password_hash FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load user"))?;
        row.map(|(doc, hash)| {
            let mut user: User = from_doc(&doc)?;
            user.password_hash = hash;
            Ok::<_, Error>(user)
        })
        .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<(String, String)> = sqlx::query_as("SELECT doc, password_hash FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find user"))?;
        row.map(|(doc, hash)| {
            let mut user: User = from_doc(&doc)?;
            user.password_hash = hash;
            Ok::<_, Error>(user)
        })
        .transpose()
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query("UPDATE users SET email = ?, password_hash = ?, doc = ? WHERE id = ?")
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(to_doc(user)?)
            .bind(user.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update user"))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("User"));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT doc, password_hash FROM users ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list users"))?;
        rows.into_iter()
            .map(|(doc, hash)| {
                let mut user: User = from_doc(&doc)?;
                user.password_hash = hash;
                Ok::<_, Error>(user)
            })
            .collect()
    }
}

#[async_trait]
impl ArticleStore for SQLiteStorage {
    async fn create_article(&self, article: &Article) -> Result<()> {
        sqlx::query("INSERT INTO articles (id, owner_id, status, created_at, doc) VALUES (?, ?, ?, ?, ?)")
            .bind(article.id.to_string())
            .bind(article.owner_id.to_string())
            .bind(status_str(article.status)?)
            .bind(article.created_at.to_rfc3339())
            .bind(to_doc(article)?)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to store article"))?;
        Ok(())
    }

    async fn get_article(&self, id: Uuid) -> Result<Option<Article>> {
        let doc: Option<String> = sqlx::query_scalar("SELECT doc FROM articles WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load article"))?;
        doc.map(|d| from_doc(&d)).transpose()
    }

    async fn list_articles(&self, owner: Option<Uuid>, status: Option<ArticleStatus>) -> Result<Vec<Article>> {
        let status = status.map(status_str).transpose()?;
        let docs: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT doc FROM articles
            WHERE (?1 IS NULL OR owner_id = ?1) AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner.map(|o| o.to_string()))
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list articles"))?;
        docs.iter().map(|d| from_doc(d)).collect()
    }

    async fn update_article(&self, article: &Article) -> Result<()> {
        let result = sqlx::query("UPDATE articles SET status = ?, doc = ? WHERE id = ?")
            .bind(status_str(article.status)?)
            .bind(to_doc(article)?)
            .bind(article.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update article"))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Article"));
        }
        Ok(())
    }

    async fn begin_processing(&self, article: &Article) -> Result<bool> {
        let processing = status_str(ArticleStatus::Processing)?;
        let result = sqlx::query("UPDATE articles SET status = ?, doc = ? WHERE id = ? AND status != ?")
            .bind(status_str(article.status)?)
            .bind(to_doc(article)?)
            .bind(article.id.to_string())
            .bind(&processing)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to claim article"))?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM articles WHERE id = ?")
            .bind(article.id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load article"))?;
        match exists {
            Some(_) => Ok(false),
            None => Err(Error::not_found("Article")),
        }
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete article"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BrandVoiceStore for SQLiteStorage {
    async fn create_brand_voice(&self, voice: &BrandVoice) -> Result<()> {
        sqlx::query("INSERT INTO brand_voices (id, owner_id, name, doc) VALUES (?, ?, ?, ?)")
            .bind(voice.id.to_string())
            .bind(voice.owner_id.to_string())
            .bind(&voice.name)
            .bind(to_doc(voice)?)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to store brand voice"))?;
        Ok(())
    }

    async fn get_brand_voice(&self, id: Uuid) -> Result<Option<BrandVoice>> {
        let doc: Option<String> = sqlx::query_scalar("SELECT doc FROM brand_voices WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load brand voice"))?;
        doc.map(|d| from_doc(&d)).transpose()
    }

    async fn list_brand_voices(&self, owner: Option<Uuid>) -> Result<Vec<BrandVoice>> {
        let docs: Vec<String> = sqlx::query_scalar(
            "SELECT doc FROM brand_voices WHERE (?1 IS NULL OR owner_id = ?1) ORDER BY name",
        )
        .bind(owner.map(|o| o.to_string()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list brand voices"))?;
        docs.iter().map(|d| from_doc(d)).collect()
    }

    async fn update_brand_voice(&self, voice: &BrandVoice) -> Result<()> {
        let result = sqlx::query("UPDATE brand_voices SET name = ?, doc = ? WHERE id = ?")
            .bind(&voice.name)
            .bind(to_doc(voice)?)
            .bind(voice.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update brand voice"))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Brand voice"));
        }
        Ok(())
    }

    async fn delete_brand_voice(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM brand_voices WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete brand voice"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ContentStore for SQLiteStorage {
    async fn upsert_content(&self, content: &ReformattedContent) -> Result<ReformattedContent> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT doc FROM contents WHERE article_id = ? AND platform = ?")
                .bind(content.article_id.to_string())
                .bind(content.platform.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to load content"))?;

        let stored = match existing {
            Some(doc) => merge_existing(&from_doc(&doc)?, content),
            None => content.clone(),
        };

        sqlx::query(
            r#"
            INSERT INTO contents (id, article_id, platform, created_at, doc)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (article_id, platform) DO UPDATE SET doc = excluded.doc
            "#,
        )
        .bind(stored.id.to_string())
        .bind(stored.article_id.to_string())
        .bind(stored.platform.as_str())
        .bind(stored.created_at.to_rfc3339())
        .bind(to_doc(&stored)?)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to store content"))?;

        Ok(stored)
    }

    async fn get_content(&self, id: Uuid) -> Result<Option<ReformattedContent>> {
        let doc: Option<String> = sqlx::query_scalar("SELECT doc FROM contents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to load content"))?;
        doc.map(|d| from_doc(&d)).transpose()
    }

    async fn list_content_for_article(&self, article_id: Uuid) -> Result<Vec<ReformattedContent>> {
        let docs: Vec<String> =
            sqlx::query_scalar("SELECT doc FROM contents WHERE article_id = ? ORDER BY created_at")
                .bind(article_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to list content"))?;
        docs.iter().map(|d| from_doc(d)).collect()
    }

    async fn update_content(&self, content: &ReformattedContent) -> Result<()> {
        let result = sqlx::query("UPDATE contents SET doc = ? WHERE id = ?")
            .bind(to_doc(content)?)
            .bind(content.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update content"))?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Content"));
        }
        Ok(())
    }

    async fn delete_content_for_article(&self, article_id: Uuid) -> Result<usize> {
        let result = sqlx::query("DELETE FROM contents WHERE article_id = ?")
            .bind(article_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete content"))?;
        Ok(result.rows_affected() as usize)
    }
}
