//! In-process store used when no database is configured, and by tests.
use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::traits::{ArticleDao, UserDao};
use crate::store::models::{
    Article, ArticleChanges, ArticleStats, NewArticle, NewUser, Owner, SourceSummary, User,
};

#[derive(Debug, Default)]
pub struct MemoryDao {
    articles: RwLock<Vec<Article>>,
    users: RwLock<Vec<User>>,
}

impl MemoryDao {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn has_source(article: &Article) -> Option<&str> {
    article.source.as_deref().filter(|source| !source.is_empty())
}

#[async_trait]
impl ArticleDao for MemoryDao {
    async fn insert_article(&self, article: NewArticle) -> Result<Article> {
        let now = Utc::now();
        let stored = Article {
            id: Uuid::new_v4(),
            title: article.title,
            content: article.content,
            source: article.source,
            url: article.url,
            label: article.label,
            score: article.score,
            confidence: article.confidence,
            owner: article.owner,
            created_at: now,
            updated_at: now,
        };
        self.articles.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list_articles(&self, owner: Owner) -> Result<Vec<Article>> {
        let articles = self.articles.read().await;
        // 挿入順の逆から安定ソートし、同時刻の記事も新しい順に並べる
        let mut owned: Vec<Article> = articles
            .iter()
            .rev()
            .filter(|article| article.owner == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn find_article(&self, owner: Owner, id: Uuid) -> Result<Option<Article>> {
        Ok(self
            .articles
            .read()
            .await
            .iter()
            .find(|article| article.id == id && article.owner == owner)
            .cloned())
    }

    async fn update_article(
        &self,
        owner: Owner,
        id: Uuid,
        changes: ArticleChanges,
    ) -> Result<Option<Article>> {
        let mut articles = self.articles.write().await;
        let Some(article) = articles
            .iter_mut()
            .find(|article| article.id == id && article.owner == owner)
        else {
            return Ok(None);
        };
        changes.apply(article, Utc::now());
        Ok(Some(article.clone()))
    }

    async fn delete_article(&self, owner: Owner, id: Uuid) -> Result<bool> {
        let mut articles = self.articles.write().await;
        let before = articles.len();
        articles.retain(|article| !(article.id == id && article.owner == owner));
        Ok(articles.len() < before)
    }

    async fn article_stats(&self, owner: Owner) -> Result<ArticleStats> {
        let articles = self.articles.read().await;
        let mut stats = ArticleStats::default();
        let mut sources = BTreeSet::new();
        for article in articles.iter().filter(|article| article.owner == owner) {
            stats.record(article.label, 1);
            if let Some(source) = has_source(article) {
                sources.insert(source);
            }
        }
        stats.sources = sources.len() as u64;
        Ok(stats)
    }

    async fn list_sources(&self, owner: Owner) -> Result<Vec<SourceSummary>> {
        let articles = self.articles.read().await;
        let distinct: BTreeSet<SourceSummary> = articles
            .iter()
            .filter(|article| article.owner == owner)
            .filter_map(|article| {
                has_source(article).map(|name| SourceSummary {
                    name: name.to_string(),
                    url: article.url.clone().unwrap_or_default(),
                    verified: false,
                })
            })
            .collect();
        Ok(distinct.into_iter().collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl UserDao for MemoryDao {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        if users.iter().any(|existing| existing.email == user.email) {
            return Ok(None);
        }
        let stored = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.push(stored.clone());
        Ok(Some(stored))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }
}
