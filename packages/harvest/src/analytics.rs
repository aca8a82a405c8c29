//! Read-only aggregate reports over the harvested backlog.
//!
//! Posts tagged as journals or blog entries are excluded from runtime
//! totals so written content doesn't pollute the audio numbers, and the
//! per-dimension reports count only session-like posts (URL contains
//! `session-<digits>`).

use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::Result;

/// Tags that mark non-audio content, matched case-insensitively.
const EXCLUDED_TAGS_SQL: &str = "('journal','journals','blog','blogs')";

/// Headline totals for the whole backlog.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatsSummary {
    pub total_posts: i32,
    pub with_duration: i32,
    pub missing_duration: i32,

    pub total_seconds_all: i64,
    pub total_seconds_sessions: i64,

    pub total_hours_all: f64,
    pub total_hours_sessions: f64,
}

/// Hours + item count for one group/author/system/campaign.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HoursRow {
    pub name: String,
    pub hours: f64,
    pub items: i32,
}

/// Session count + hours for one system.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CountRow {
    pub name: String,
    pub sessions: i32,
    pub hours: f64,
}

/// Hours + session count for a (group, second dimension) pair.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PairRow {
    pub group_name: String,
    pub name: String,
    pub hours: f64,
    pub sessions: i32,
}

/// A session-like post still missing its duration.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MissingDurationRow {
    pub url: String,
    pub title: Option<String>,
    pub group_name: Option<String>,
}

pub async fn summary(pool: &PgPool) -> Result<StatsSummary> {
    let sql = format!(
        r#"
        WITH excluded AS (
          SELECT url
          FROM posts
          WHERE EXISTS (
            SELECT 1
            FROM unnest(coalesce(tags, ARRAY[]::text[])) t(tag)
            WHERE lower(t.tag) IN {EXCLUDED_TAGS_SQL}
          )
        )
        SELECT
          count(*)::int AS total_posts,

          count(*) FILTER (
            WHERE url NOT IN (SELECT url FROM excluded)
              AND duration_seconds IS NOT NULL
          )::int AS with_duration,

          count(*) FILTER (
            WHERE url NOT IN (SELECT url FROM excluded)
              AND duration_seconds IS NULL
          )::int AS missing_duration,

          coalesce(sum(duration_seconds) FILTER (
            WHERE url NOT IN (SELECT url FROM excluded)
          ), 0)::bigint AS total_seconds_all,

          coalesce(sum(duration_seconds) FILTER (
            WHERE url ~* 'session-[0-9]+'
          ), 0)::bigint AS total_seconds_sessions,

          coalesce(sum(duration_seconds) FILTER (
            WHERE url NOT IN (SELECT url FROM excluded)
          ) / 3600.0, 0)::float AS total_hours_all,

          coalesce(sum(duration_seconds) FILTER (
            WHERE url ~* 'session-[0-9]+'
          ) / 3600.0, 0)::float AS total_hours_sessions
        FROM posts
        "#
    );

    Ok(sqlx::query_as::<_, StatsSummary>(&sql)
        .fetch_one(pool)
        .await?)
}

pub async fn top_groups_by_hours(pool: &PgPool, limit: i64) -> Result<Vec<HoursRow>> {
    top_by_hours(pool, "group_name", limit).await
}

pub async fn top_authors_by_hours(pool: &PgPool, limit: i64) -> Result<Vec<HoursRow>> {
    top_by_hours(pool, "author", limit).await
}

pub async fn top_systems_by_hours(pool: &PgPool, limit: i64) -> Result<Vec<HoursRow>> {
    top_by_hours(pool, "system_name", limit).await
}

/// Hours per value of one column, sessions only, unknowns bucketed.
async fn top_by_hours(pool: &PgPool, column: &str, limit: i64) -> Result<Vec<HoursRow>> {
    let sql = format!(
        r#"
        SELECT
          coalesce({column}, '(unknown)') AS name,
          (sum(duration_seconds) / 3600.0)::float AS hours,
          count(*)::int AS items
        FROM posts
        WHERE duration_seconds IS NOT NULL
          AND url ~* 'session-[0-9]+'
        GROUP BY 1
        ORDER BY hours DESC
        LIMIT $1
        "#
    );

    Ok(sqlx::query_as::<_, HoursRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

pub async fn top_systems_by_count(pool: &PgPool, limit: i64) -> Result<Vec<CountRow>> {
    let sql = r#"
        SELECT
          coalesce(system_name, '(unknown)') AS name,
          count(*)::int AS sessions,
          (sum(duration_seconds) / 3600.0)::float AS hours
        FROM posts
        WHERE duration_seconds IS NOT NULL
          AND url ~* 'session-[0-9]+'
        GROUP BY 1
        ORDER BY sessions DESC
        LIMIT $1
    "#;

    Ok(sqlx::query_as::<_, CountRow>(sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

pub async fn top_campaigns_by_hours(pool: &PgPool, limit: i64) -> Result<Vec<HoursRow>> {
    let sql = r#"
        SELECT
          campaign_name AS name,
          (sum(duration_seconds) / 3600.0)::float AS hours,
          count(*)::int AS items
        FROM posts
        WHERE duration_seconds IS NOT NULL
          AND url ~* 'session-[0-9]+'
          AND campaign_name IS NOT NULL
          AND campaign_name <> ''
        GROUP BY 1
        ORDER BY hours DESC
        LIMIT $1
    "#;

    Ok(sqlx::query_as::<_, HoursRow>(sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

pub async fn top_group_system_pairs(pool: &PgPool, limit: i64) -> Result<Vec<PairRow>> {
    let sql = r#"
        SELECT
          coalesce(group_name, '(unknown)') AS group_name,
          coalesce(system_name, '(unknown)') AS name,
          (sum(duration_seconds) / 3600.0)::float AS hours,
          count(*)::int AS sessions
        FROM posts
        WHERE duration_seconds IS NOT NULL
          AND url ~* 'session-[0-9]+'
        GROUP BY 1, 2
        ORDER BY hours DESC
        LIMIT $1
    "#;

    Ok(sqlx::query_as::<_, PairRow>(sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

pub async fn top_group_campaign_pairs(pool: &PgPool, limit: i64) -> Result<Vec<PairRow>> {
    let sql = r#"
        SELECT
          coalesce(group_name, '(unknown)') AS group_name,
          campaign_name AS name,
          (sum(duration_seconds) / 3600.0)::float AS hours,
          count(*)::int AS sessions
        FROM posts
        WHERE duration_seconds IS NOT NULL
          AND url ~* 'session-[0-9]+'
          AND campaign_name IS NOT NULL
          AND campaign_name <> ''
        GROUP BY 1, 2
        ORDER BY hours DESC
        LIMIT $1
    "#;

    Ok(sqlx::query_as::<_, PairRow>(sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

/// Session-like posts missing a duration, newest first. These are the
/// posts worth a manual look.
pub async fn missing_duration_urls(pool: &PgPool, limit: i64) -> Result<Vec<MissingDurationRow>> {
    let sql = r#"
        SELECT url, title, group_name
        FROM posts
        WHERE duration_seconds IS NULL
          AND url ~* 'session-[0-9]+'
        ORDER BY lastmod DESC NULLS LAST
        LIMIT $1
    "#;

    Ok(sqlx::query_as::<_, MissingDurationRow>(sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}
