// モジュールの公開と型の再エクスポート
pub(crate) mod article;
pub mod dao_impl;
pub mod memory;
pub mod traits;
pub(crate) mod user;

pub use dao_impl::PgDao;
pub use memory::MemoryDao;
pub use traits::{ArticleDao, UserDao};

#[cfg(test)]
mod tests;
