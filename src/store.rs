pub mod dao;
pub mod models;
pub(crate) mod schema;
