//! PgDao - Postgres backed implementation of the DAO traits
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::article::PgArticles;
use super::traits::{ArticleDao, UserDao};
use super::user::PgUsers;
use crate::store::models::{
    Article, ArticleChanges, ArticleStats, NewArticle, NewUser, Owner, SourceSummary, User,
};

#[derive(Debug, Clone)]
pub struct PgDao {
    pool: PgPool,
}

impl PgDao {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// スキーマを適用する。
    ///
    /// # Errors
    /// DDL の実行に失敗した場合はエラーを返す。
    pub async fn migrate(&self) -> Result<()> {
        crate::store::schema::migrate(&self.pool).await
    }
}

#[async_trait]
impl ArticleDao for PgDao {
    async fn insert_article(&self, article: NewArticle) -> Result<Article> {
        PgArticles::insert(&self.pool, article).await
    }

    async fn list_articles(&self, owner: Owner) -> Result<Vec<Article>> {
        PgArticles::list(&self.pool, owner).await
    }

    async fn find_article(&self, owner: Owner, id: Uuid) -> Result<Option<Article>> {
        PgArticles::find(&self.pool, owner, id).await
    }

    async fn update_article(
        &self,
        owner: Owner,
        id: Uuid,
        changes: ArticleChanges,
    ) -> Result<Option<Article>> {
        PgArticles::update(&self.pool, owner, id, changes).await
    }

    async fn delete_article(&self, owner: Owner, id: Uuid) -> Result<bool> {
        PgArticles::delete(&self.pool, owner, id).await
    }

    async fn article_stats(&self, owner: Owner) -> Result<ArticleStats> {
        PgArticles::stats(&self.pool, owner).await
    }

    async fn list_sources(&self, owner: Owner) -> Result<Vec<SourceSummary>> {
        PgArticles::sources(&self.pool, owner).await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database ping failed")?;
        Ok(())
    }
}

#[async_trait]
impl UserDao for PgDao {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>> {
        PgUsers::create(&self.pool, user).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        PgUsers::find_by_email(&self.pool, email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        PgUsers::find_by_id(&self.pool, id).await
    }
}
