use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::classification::Label;
use crate::store::models::{
    Article, ArticleChanges, ArticleStats, NewArticle, Owner, SourceSummary,
};

const ARTICLE_COLUMNS: &str =
    "id, title, content, source, url, label, score, confidence, owner_id, created_at, updated_at";

pub(crate) struct PgArticles;

impl PgArticles {
    pub async fn insert(pool: &PgPool, article: NewArticle) -> Result<Article> {
        let now = Utc::now();
        let score = article.score.map(i32::try_from).transpose()?;

        let row = sqlx::query(&format!(
            r"
            INSERT INTO news_articles
                (id, title, content, source, url, label, score, confidence, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {ARTICLE_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.source)
        .bind(&article.url)
        .bind(article.label.as_str())
        .bind(score)
        .bind(article.confidence)
        .bind(article.owner.user_id())
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to insert news article")?;

        article_from_row(&row)
    }

    pub async fn list(pool: &PgPool, owner: Owner) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {ARTICLE_COLUMNS}
            FROM news_articles
            WHERE owner_id IS NOT DISTINCT FROM $1
            ORDER BY created_at DESC
            "
        ))
        .bind(owner.user_id())
        .fetch_all(pool)
        .await
        .context("failed to list news articles")?;

        rows.iter().map(article_from_row).collect()
    }

    pub async fn find(pool: &PgPool, owner: Owner, id: Uuid) -> Result<Option<Article>> {
        let row = sqlx::query(&format!(
            r"
            SELECT {ARTICLE_COLUMNS}
            FROM news_articles
            WHERE id = $1 AND owner_id IS NOT DISTINCT FROM $2
            "
        ))
        .bind(id)
        .bind(owner.user_id())
        .fetch_optional(pool)
        .await
        .context("failed to fetch news article")?;

        row.as_ref().map(article_from_row).transpose()
    }

    pub async fn update(
        pool: &PgPool,
        owner: Owner,
        id: Uuid,
        changes: ArticleChanges,
    ) -> Result<Option<Article>> {
        let row = sqlx::query(&format!(
            r"
            UPDATE news_articles SET
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                source = CASE WHEN $5 THEN $6 ELSE source END,
                url = CASE WHEN $7 THEN $8 ELSE url END,
                label = COALESCE($9, label),
                score = CASE WHEN $9 IS NULL THEN score ELSE NULL END,
                confidence = CASE WHEN $9 IS NULL THEN confidence ELSE NULL END,
                updated_at = $10
            WHERE id = $1 AND owner_id IS NOT DISTINCT FROM $2
            RETURNING {ARTICLE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(owner.user_id())
        .bind(changes.title)
        .bind(changes.content)
        .bind(changes.source.is_some())
        .bind(changes.source.flatten())
        .bind(changes.url.is_some())
        .bind(changes.url.flatten())
        .bind(changes.label.map(Label::as_str))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
        .context("failed to update news article")?;

        row.as_ref().map(article_from_row).transpose()
    }

    pub async fn delete(pool: &PgPool, owner: Owner, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM news_articles
            WHERE id = $1 AND owner_id IS NOT DISTINCT FROM $2
            ",
        )
        .bind(id)
        .bind(owner.user_id())
        .execute(pool)
        .await
        .context("failed to delete news article")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn stats(pool: &PgPool, owner: Owner) -> Result<ArticleStats> {
        let rows = sqlx::query(
            r"
            SELECT label, COUNT(*) AS count
            FROM news_articles
            WHERE owner_id IS NOT DISTINCT FROM $1
            GROUP BY label
            ",
        )
        .bind(owner.user_id())
        .fetch_all(pool)
        .await
        .context("failed to aggregate article labels")?;

        let mut stats = ArticleStats::default();
        for row in rows {
            let label: String = row.try_get("label")?;
            let count: i64 = row.try_get("count")?;
            stats.record(label.parse()?, u64::try_from(count)?);
        }

        let sources: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(DISTINCT source)
            FROM news_articles
            WHERE owner_id IS NOT DISTINCT FROM $1 AND source IS NOT NULL AND source <> ''
            ",
        )
        .bind(owner.user_id())
        .fetch_one(pool)
        .await
        .context("failed to count distinct sources")?;
        stats.sources = u64::try_from(sources)?;

        Ok(stats)
    }

    pub async fn sources(pool: &PgPool, owner: Owner) -> Result<Vec<SourceSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT source COLLATE "C" AS source, COALESCE(url, '') COLLATE "C" AS url
            FROM news_articles
            WHERE owner_id IS NOT DISTINCT FROM $1 AND source IS NOT NULL AND source <> ''
            ORDER BY source, url
            "#,
        )
        .bind(owner.user_id())
        .fetch_all(pool)
        .await
        .context("failed to list article sources")?;

        rows.iter()
            .map(|row| -> Result<SourceSummary> {
                Ok(SourceSummary {
                    name: row.try_get("source")?,
                    url: row.try_get("url")?,
                    verified: false,
                })
            })
            .collect()
    }
}

fn article_from_row(row: &PgRow) -> Result<Article> {
    let label: String = row.try_get("label")?;
    let score: Option<i32> = row.try_get("score")?;
    let owner_id: Option<Uuid> = row.try_get("owner_id")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        source: row.try_get("source")?,
        url: row.try_get("url")?,
        label: label.parse()?,
        score: score.map(u32::try_from).transpose()?,
        confidence: row.try_get("confidence")?,
        owner: Owner::from_user_id(owner_id),
        created_at,
        updated_at,
    })
}
