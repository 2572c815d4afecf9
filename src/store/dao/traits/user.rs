//! UserDao trait - account lookups

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::store::models::{NewUser, User};

#[async_trait]
pub trait UserDao: Send + Sync {
    /// Returns `None` when the e-mail address is already registered.
    async fn create_user(&self, user: NewUser) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
}
