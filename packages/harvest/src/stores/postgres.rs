//! Postgres-backed post backlog.
//!
//! The merge SQL enforces the fill-if-empty rule in one statement: every
//! guarded column keeps its existing value unless that value is NULL (or
//! an empty string/array), so a patch can only fill gaps, never erase.
//! Each call is its own commit; a crash mid-batch loses at most the
//! in-flight record's progress.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::error::Result;
use crate::store::PostStore;
use crate::types::{PendingPost, PostPatch, PostRecord};

/// Postgres store over a shared connection pool.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool (reporting queries go straight
    /// to it).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the schema if it does not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                url TEXT PRIMARY KEY,
                lastmod TIMESTAMPTZ,

                title TEXT,
                author TEXT,
                published_at TIMESTAMPTZ,
                tags TEXT[],

                group_name TEXT,
                system_name TEXT,
                campaign_name TEXT,

                duration_seconds INTEGER,
                duration_source TEXT,
                download_url TEXT,
                file_size_bytes BIGINT,
                youtube_urls TEXT[],

                extract_attempts INTEGER NOT NULL DEFAULT 0,
                last_extract_error TEXT,
                extracted_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_lastmod ON posts (lastmod DESC NULLS LAST)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_extracted_at ON posts (extracted_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl PostStore for PostgresStore {
    async fn upsert_discovered(&self, url: &str, lastmod: Option<DateTime<Utc>>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (url, lastmod)
            VALUES ($1, $2)
            ON CONFLICT (url) DO UPDATE
              SET lastmod = excluded.lastmod
            "#,
        )
        .bind(url)
        .bind(lastmod)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn select_pending(&self, limit: usize) -> Result<Vec<PendingPost>> {
        let rows = sqlx::query(
            r#"
            SELECT url, lastmod
            FROM posts
            WHERE extracted_at IS NULL
              AND (
                duration_seconds IS NULL
                OR tags IS NULL OR cardinality(tags) = 0
                OR author IS NULL OR author = ''
                OR group_name IS NULL OR group_name = ''
                OR system_name IS NULL OR system_name = ''
                OR campaign_name IS NULL OR campaign_name = ''
              )
            ORDER BY lastmod DESC NULLS LAST
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| PendingPost {
                url: r.get("url"),
                lastmod: r.get("lastmod"),
            })
            .collect())
    }

    async fn apply_patch(&self, url: &str, patch: &PostPatch) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts
            SET title = COALESCE(NULLIF(title, ''), NULLIF($2::text, '')),
                author = COALESCE(NULLIF(author, ''), NULLIF($3::text, '')),
                published_at = COALESCE(published_at, $4::timestamptz),
                tags = COALESCE(NULLIF(tags, '{}'::text[]), $5::text[]),

                group_name = COALESCE(NULLIF(group_name, ''), NULLIF($6::text, '')),
                system_name = COALESCE(NULLIF(system_name, ''), NULLIF($7::text, '')),
                campaign_name = COALESCE(NULLIF(campaign_name, ''), NULLIF($8::text, '')),

                duration_seconds = COALESCE(duration_seconds, $9::int),
                duration_source = CASE
                    WHEN duration_seconds IS NULL AND $9::int IS NOT NULL THEN $10::text
                    ELSE duration_source
                END,

                download_url = COALESCE(NULLIF(download_url, ''), NULLIF($11::text, '')),
                file_size_bytes = COALESCE(file_size_bytes, $12::bigint),
                youtube_urls = COALESCE(NULLIF(youtube_urls, '{}'::text[]), $13::text[]),

                extracted_at = now(),
                extract_attempts = extract_attempts + 1,
                last_extract_error = NULL
            WHERE url = $1
            "#,
        )
        .bind(url)
        .bind(&patch.title)
        .bind(&patch.author)
        .bind(patch.published_at)
        .bind(&patch.tags)
        .bind(&patch.group_name)
        .bind(&patch.system_name)
        .bind(&patch.campaign_name)
        .bind(patch.duration_seconds)
        .bind(&patch.duration_source)
        .bind(&patch.download_url)
        .bind(patch.file_size_bytes)
        .bind(&patch.youtube_urls)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_error(&self, url: &str, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts
            SET extracted_at = now(),
                extract_attempts = extract_attempts + 1,
                last_extract_error = left($2, 2000)
            WHERE url = $1
            "#,
        )
        .bind(url)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<PostRecord>> {
        let row = sqlx::query(
            r#"
            SELECT url, lastmod, title, author, published_at, tags,
                   group_name, system_name, campaign_name,
                   duration_seconds, duration_source, download_url,
                   file_size_bytes, youtube_urls,
                   extract_attempts, last_extract_error, extracted_at
            FROM posts
            WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| PostRecord {
            url: r.get("url"),
            lastmod: r.get("lastmod"),
            title: r.get("title"),
            author: r.get("author"),
            published_at: r.get("published_at"),
            tags: r.get("tags"),
            group_name: r.get("group_name"),
            system_name: r.get("system_name"),
            campaign_name: r.get("campaign_name"),
            duration_seconds: r.get("duration_seconds"),
            duration_source: r.get("duration_source"),
            download_url: r.get("download_url"),
            file_size_bytes: r.get("file_size_bytes"),
            youtube_urls: r.get("youtube_urls"),
            extract_attempts: r.get("extract_attempts"),
            last_extract_error: r.get("last_extract_error"),
            extracted_at: r.get("extracted_at"),
        }))
    }
}
