#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub(crate) mod api;
pub mod app;
pub mod auth;
pub mod classification;
pub mod config;
pub mod healthcheck;
pub mod observability;
pub mod store;

pub use healthcheck::{HealthcheckError, healthcheck, healthcheck_with_port};
