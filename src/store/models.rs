use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::classification::{ClassificationResult, Label};

/// 記事の所有者。未認証の呼び出しは `Anonymous` として扱い、DB では NULL で表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Anonymous,
    User(Uuid),
}

impl Owner {
    pub const ANONYMOUS_SENTINEL: &'static str = "anonymous";

    #[must_use]
    pub fn user_id(self) -> Option<Uuid> {
        match self {
            Owner::Anonymous => None,
            Owner::User(id) => Some(id),
        }
    }

    #[must_use]
    pub fn from_user_id(id: Option<Uuid>) -> Self {
        id.map_or(Owner::Anonymous, Owner::User)
    }
}

impl Serialize for Owner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Owner::Anonymous => serializer.serialize_str(Self::ANONYMOUS_SENTINEL),
            Owner::User(id) => serializer.collect_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub source: Option<String>,
    pub url: Option<String>,
    pub label: Label,
    pub score: Option<u32>,
    pub confidence: Option<f64>,
    pub owner: Owner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub source: Option<String>,
    pub url: Option<String>,
    pub label: Label,
    pub score: Option<u32>,
    pub confidence: Option<f64>,
    pub owner: Owner,
}

impl NewArticle {
    /// Article carrying an explicitly chosen label and no classifier output.
    pub fn labelled(
        owner: Owner,
        title: impl Into<String>,
        content: impl Into<String>,
        label: Label,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            source: None,
            url: None,
            label,
            score: None,
            confidence: None,
            owner,
        }
    }

    /// Article whose label, score and confidence come from a classification.
    pub fn classified(
        owner: Owner,
        title: impl Into<String>,
        content: impl Into<String>,
        result: &ClassificationResult,
    ) -> Self {
        Self {
            score: Some(result.score),
            confidence: Some(result.confidence),
            ..Self::labelled(owner, title, content, result.label)
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Option<String>, url: Option<String>) -> Self {
        self.source = source;
        self.url = url;
        self
    }
}

/// Partial update; `None` leaves the stored value untouched.
///
/// `source` and `url` are nullable, so `Some(None)` clears them. Setting a
/// label by hand drops the classifier's score and confidence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub source: Option<Option<String>>,
    pub url: Option<Option<String>>,
    pub label: Option<Label>,
}

impl ArticleChanges {
    pub(crate) fn apply(self, article: &mut Article, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            article.title = title;
        }
        if let Some(content) = self.content {
            article.content = content;
        }
        if let Some(source) = self.source {
            article.source = source;
        }
        if let Some(url) = self.url {
            article.url = url;
        }
        if let Some(label) = self.label {
            article.label = label;
            article.score = None;
            article.confidence = None;
        }
        article.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleStats {
    pub total: u64,
    pub reliable: u64,
    pub needs_review: u64,
    pub fake: u64,
    /// Distinct non-empty publisher names.
    pub sources: u64,
}

impl ArticleStats {
    pub(crate) fn record(&mut self, label: Label, count: u64) {
        self.total += count;
        match label {
            Label::Reliable => self.reliable += count,
            Label::NeedsReview => self.needs_review += count,
            Label::Fake => self.fake += count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub url: String,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_owner_serializes_as_sentinel() {
        assert_eq!(
            serde_json::to_value(Owner::Anonymous).expect("serializes"),
            serde_json::json!("anonymous")
        );
        let id = Uuid::new_v4();
        assert_eq!(
            serde_json::to_value(Owner::User(id)).expect("serializes"),
            serde_json::json!(id.to_string())
        );
    }

    #[test]
    fn owner_maps_to_nullable_user_id() {
        let id = Uuid::new_v4();
        assert_eq!(Owner::from_user_id(None), Owner::Anonymous);
        assert_eq!(Owner::from_user_id(Some(id)).user_id(), Some(id));
    }

    #[test]
    fn changes_touch_only_provided_fields() {
        let created = Utc::now();
        let mut article = Article {
            id: Uuid::new_v4(),
            title: "Original".into(),
            content: "Body".into(),
            source: Some("Daily".into()),
            url: None,
            label: Label::Reliable,
            score: Some(0),
            confidence: Some(0.1),
            owner: Owner::Anonymous,
            created_at: created,
            updated_at: created,
        };
        let later = created + chrono::Duration::seconds(5);

        ArticleChanges {
            url: Some(Some("https://daily.example".into())),
            ..ArticleChanges::default()
        }
        .apply(&mut article, later);

        assert_eq!(article.title, "Original");
        assert_eq!(article.label, Label::Reliable);
        assert_eq!(article.score, Some(0));
        assert_eq!(article.url.as_deref(), Some("https://daily.example"));
        assert_eq!(article.source.as_deref(), Some("Daily"));
        assert_eq!(article.updated_at, later);
        assert_eq!(article.created_at, created);
    }

    #[test]
    fn manual_label_drops_classifier_output() {
        let mut article = sample_article();

        ArticleChanges {
            label: Some(Label::Fake),
            ..ArticleChanges::default()
        }
        .apply(&mut article, Utc::now());

        assert_eq!(article.label, Label::Fake);
        assert_eq!(article.score, None);
        assert_eq!(article.confidence, None);
    }

    #[test]
    fn explicit_none_clears_source_and_url() {
        let mut article = sample_article();

        ArticleChanges {
            source: Some(None),
            url: Some(None),
            ..ArticleChanges::default()
        }
        .apply(&mut article, Utc::now());

        assert_eq!(article.source, None);
        assert_eq!(article.url, None);
        assert_eq!(article.score, Some(0));
    }

    fn sample_article() -> Article {
        let now = Utc::now();
        Article {
            id: Uuid::new_v4(),
            title: "Budget".into(),
            content: "Routine vote".into(),
            source: Some("Buzz".into()),
            url: Some("https://buzz.example".into()),
            label: Label::Reliable,
            score: Some(0),
            confidence: Some(0.1),
            owner: Owner::Anonymous,
            created_at: now,
            updated_at: now,
        }
    }
}
