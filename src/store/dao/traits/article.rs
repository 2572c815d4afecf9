//! ArticleDao trait - owner scoped article operations

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::store::models::{Article, ArticleChanges, ArticleStats, NewArticle, Owner, SourceSummary};

/// 記事コレクションのデータアクセス層。`owner` が一致しない記事は存在しないものとして扱う。
#[async_trait]
pub trait ArticleDao: Send + Sync {
    /// 記事を保存し、採番済みの記事を返す
    async fn insert_article(&self, article: NewArticle) -> Result<Article>;

    /// 所有者の記事を新しい順に返す
    async fn list_articles(&self, owner: Owner) -> Result<Vec<Article>>;

    async fn find_article(&self, owner: Owner, id: Uuid) -> Result<Option<Article>>;

    /// 部分更新。対象がなければ `None`
    async fn update_article(
        &self,
        owner: Owner,
        id: Uuid,
        changes: ArticleChanges,
    ) -> Result<Option<Article>>;

    /// 削除できた場合は `true`
    async fn delete_article(&self, owner: Owner, id: Uuid) -> Result<bool>;

    async fn article_stats(&self, owner: Owner) -> Result<ArticleStats>;

    /// 出典名と URL の重複なし一覧（名前、URL 順）
    async fn list_sources(&self, owner: Owner) -> Result<Vec<SourceSummary>>;

    /// readiness プローブ用
    async fn ping(&self) -> Result<()>;
}
