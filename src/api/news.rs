use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{error::ApiError, identity::Caller, predict::classify_text};
use crate::{
    app::AppState,
    classification::Label,
    store::models::{Article, ArticleChanges, ArticleStats, NewArticle, SourceSummary},
};

pub(crate) const NOT_FOUND_MESSAGE: &str = "News article not found";
const MISSING_FIELDS_MESSAGE: &str = "Title and content are required";

#[derive(Debug, Deserialize)]
pub(crate) struct CreateArticleRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    label: Option<Label>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// `source` and `url` distinguish an absent key (keep) from `null` (clear).
#[derive(Debug, Deserialize)]
pub(crate) struct UpdateArticleRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, deserialize_with = "present")]
    source: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    url: Option<Option<String>>,
    #[serde(default)]
    label: Option<Label>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeResponse {
    label: Label,
    score: u32,
    confidence: f64,
    saved: bool,
    article: Article,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    message: &'static str,
}

fn required_text(
    title: Option<String>,
    content: Option<String>,
) -> Result<(String, String), ApiError> {
    match (title, content) {
        (Some(title), Some(content)) if !title.trim().is_empty() && !content.trim().is_empty() => {
            Ok((title, content))
        }
        _ => Err(ApiError::validation(MISSING_FIELDS_MESSAGE)),
    }
}

fn not_blank(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    match value {
        Some(text) if text.trim().is_empty() => {
            Err(ApiError::validation(format!("{field} must not be empty")))
        }
        other => Ok(other),
    }
}

/// Ids that do not parse are indistinguishable from unknown ones.
fn article_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(NOT_FOUND_MESSAGE))
}

/// POST /api/news/analyze
/// タイトルと本文を連結して判定し、結果を記事として保存する
pub(crate) async fn analyze(
    State(state): State<AppState>,
    Caller(owner): Caller,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AnalyzeResponse>), ApiError> {
    let Json(request) = payload?;
    let (title, content) = required_text(request.title, request.content)?;

    let result = classify_text(&state, &format!("{title} {content}"))?;
    let article = state
        .articles()
        .insert_article(
            NewArticle::classified(owner, title, content, &result)
                .with_source(request.source, request.url),
        )
        .await?;
    state.telemetry().record_article_created();
    info!(article_id = %article.id, label = %article.label, "article analyzed and saved");

    Ok((
        StatusCode::CREATED,
        Json(AnalyzeResponse {
            label: result.label,
            score: result.score,
            confidence: result.confidence,
            saved: true,
            article,
        }),
    ))
}

/// POST /api/news
/// ラベル指定がなければ分類器で判定する
pub(crate) async fn create(
    State(state): State<AppState>,
    Caller(owner): Caller,
    payload: Result<Json<CreateArticleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let Json(request) = payload?;
    let (title, content) = required_text(request.title, request.content)?;

    let new_article = match request.label {
        Some(label) => NewArticle::labelled(owner, title, content, label),
        None => {
            let result = classify_text(&state, &format!("{title} {content}"))?;
            NewArticle::classified(owner, title, content, &result)
        }
    };
    let article = state
        .articles()
        .insert_article(new_article.with_source(request.source, request.url))
        .await?;
    state.telemetry().record_article_created();
    info!(article_id = %article.id, label = %article.label, "article created");

    Ok((StatusCode::CREATED, Json(article)))
}

/// GET /api/news
pub(crate) async fn list(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<Json<Vec<Article>>, ApiError> {
    Ok(Json(state.articles().list_articles(owner).await?))
}

/// GET /api/news/stats
pub(crate) async fn stats(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<Json<ArticleStats>, ApiError> {
    Ok(Json(state.articles().article_stats(owner).await?))
}

/// GET /api/news/sources
pub(crate) async fn sources(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<Json<Vec<SourceSummary>>, ApiError> {
    Ok(Json(state.articles().list_sources(owner).await?))
}

/// GET /api/news/{id}
pub(crate) async fn get(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
) -> Result<Json<Article>, ApiError> {
    let id = article_id(&id)?;
    state
        .articles()
        .find_article(owner, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(NOT_FOUND_MESSAGE))
}

/// PUT /api/news/{id}
/// 指定されたフィールドのみ更新する。ラベルの再判定は行わず、手動ラベルはスコアと信頼度を消す
pub(crate) async fn update(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
    payload: Result<Json<UpdateArticleRequest>, JsonRejection>,
) -> Result<Json<Article>, ApiError> {
    let id = article_id(&id)?;
    let Json(request) = payload?;
    let changes = ArticleChanges {
        title: not_blank("title", request.title)?,
        content: not_blank("content", request.content)?,
        source: request.source,
        url: request.url,
        label: request.label,
    };

    let article = state
        .articles()
        .update_article(owner, id, changes)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND_MESSAGE))?;
    info!(article_id = %article.id, "article updated");
    Ok(Json(article))
}

/// DELETE /api/news/{id}
pub(crate) async fn delete(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = article_id(&id)?;
    if !state.articles().delete_article(owner, id).await? {
        return Err(ApiError::NotFound(NOT_FOUND_MESSAGE));
    }
    info!(article_id = %id, "article deleted");
    Ok(Json(MessageResponse { message: "Deleted" }))
}
