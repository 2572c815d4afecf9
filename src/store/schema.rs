use anyhow::{Context, Result};
use sqlx::{Executor, PgPool};

/// 起動時に適用するスキーマ。何度実行しても同じ結果になる。
pub(crate) const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS news_articles (
    id UUID PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    source TEXT,
    url TEXT,
    label TEXT NOT NULL CHECK (label IN ('reliable', 'needs_review', 'fake')),
    score INTEGER,
    confidence DOUBLE PRECISION,
    owner_id UUID REFERENCES users(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS news_articles_owner_created_idx
    ON news_articles (owner_id, created_at DESC);
";

/// # Errors
/// Fails when the database rejects the DDL or is unreachable.
pub(crate) async fn migrate(pool: &PgPool) -> Result<()> {
    pool.execute(SCHEMA)
        .await
        .context("failed to apply news-check schema")?;
    Ok(())
}
