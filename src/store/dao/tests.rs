//! DAO integration tests
//!
//! These tests require a DATABASE_URL environment variable to run.

use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{ArticleDao, PgDao, UserDao};
use crate::classification::Label;
use crate::store::models::{ArticleChanges, NewArticle, NewUser, Owner};

async fn connect() -> anyhow::Result<Option<PgDao>> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;
    let dao = PgDao::new(pool);
    dao.migrate().await?;
    Ok(Some(dao))
}

async fn registered_owner(dao: &PgDao) -> anyhow::Result<Owner> {
    let user = dao
        .create_user(NewUser {
            name: "dao-test".into(),
            email: format!("{}@dao.test", Uuid::new_v4()),
            password_hash: "hash".into(),
        })
        .await?
        .expect("fresh e-mail inserts");
    Ok(Owner::User(user.id))
}

#[tokio::test]
async fn migrate_is_idempotent() -> anyhow::Result<()> {
    let Some(dao) = connect().await? else {
        return Ok(());
    };
    dao.migrate().await?;
    dao.ping().await?;
    Ok(())
}

#[tokio::test]
async fn article_crud_round_trip() -> anyhow::Result<()> {
    let Some(dao) = connect().await? else {
        return Ok(());
    };
    let owner = registered_owner(&dao).await?;

    let created = dao
        .insert_article(
            NewArticle::labelled(owner, "Council vote", "Budget passed", Label::Reliable)
                .with_source(Some("Gazette".into()), None),
        )
        .await?;
    assert_eq!(created.owner, owner);

    let found = dao.find_article(owner, created.id).await?;
    assert_eq!(found.as_ref().map(|a| a.id), Some(created.id));
    assert!(dao.find_article(Owner::Anonymous, created.id).await?.is_none());

    let updated = dao
        .update_article(
            owner,
            created.id,
            ArticleChanges {
                label: Some(Label::Fake),
                url: Some(Some("https://gazette.example".into())),
                ..ArticleChanges::default()
            },
        )
        .await?
        .expect("owner can update");
    assert_eq!(updated.label, Label::Fake);
    assert_eq!(updated.title, "Council vote");
    assert_eq!(updated.url.as_deref(), Some("https://gazette.example"));

    let stats = dao.article_stats(owner).await?;
    assert_eq!(stats.total, 1);
    assert_eq!(stats.fake, 1);
    assert_eq!(stats.sources, 1);

    let sources = dao.list_sources(owner).await?;
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name, "Gazette");
    assert_eq!(sources[0].url, "https://gazette.example");

    assert!(dao.delete_article(owner, created.id).await?);
    assert!(dao.list_articles(owner).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn manual_label_and_cleared_fields_persist() -> anyhow::Result<()> {
    let Some(dao) = connect().await? else {
        return Ok(());
    };
    let owner = registered_owner(&dao).await?;
    let result = crate::classification::Classifier::default().classify("Routine vote")?;
    let created = dao
        .insert_article(
            NewArticle::classified(owner, "Budget", "Routine vote", &result)
                .with_source(Some("Buzz".into()), Some("https://b".into())),
        )
        .await?;
    assert!(created.confidence.is_some());

    let updated = dao
        .update_article(
            owner,
            created.id,
            ArticleChanges {
                source: Some(None),
                url: Some(None),
                label: Some(Label::Fake),
                ..ArticleChanges::default()
            },
        )
        .await?
        .expect("owner can update");

    assert_eq!(updated.label, Label::Fake);
    assert_eq!(updated.score, None);
    assert_eq!(updated.confidence, None);
    assert_eq!(updated.source, None);
    assert_eq!(updated.url, None);
    Ok(())
}

#[tokio::test]
async fn sources_sort_by_byte_order() -> anyhow::Result<()> {
    let Some(dao) = connect().await? else {
        return Ok(());
    };
    let owner = registered_owner(&dao).await?;
    for name in ["beta", "Zeta", "alpha"] {
        dao.insert_article(
            NewArticle::labelled(owner, "t", "c", Label::Reliable)
                .with_source(Some(name.into()), None),
        )
        .await?;
    }

    let names: Vec<String> = dao
        .list_sources(owner)
        .await?
        .into_iter()
        .map(|source| source.name)
        .collect();
    assert_eq!(names, ["Zeta", "alpha", "beta"]);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_returns_none() -> anyhow::Result<()> {
    let Some(dao) = connect().await? else {
        return Ok(());
    };
    let email = format!("{}@dao.test", Uuid::new_v4());
    let new_user = NewUser {
        name: "dup".into(),
        email: email.clone(),
        password_hash: "hash".into(),
    };

    let created = dao.create_user(new_user.clone()).await?.expect("first insert");
    assert!(dao.create_user(new_user).await?.is_none());
    assert_eq!(dao.find_user_by_email(&email).await?.map(|u| u.id), Some(created.id));
    Ok(())
}
