//! DAO trait definitions
//!
//! Each trait covers one collection; the Postgres and in-memory backends implement both.

mod article;
mod user;

pub use article::ArticleDao;
pub use user::UserDao;
