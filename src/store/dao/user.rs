use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::store::models::{NewUser, User};

pub(crate) struct PgUsers;

impl PgUsers {
    /// 既に同じメールアドレスが登録されている場合は `None` を返す。
    pub async fn create(pool: &PgPool, user: NewUser) -> Result<Option<User>> {
        let row = sqlx::query(
            r"
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, name, email, password_hash, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
        .context("failed to insert user")?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user by email")?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch user by id")?;

        row.as_ref().map(user_from_row).transpose()
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}
