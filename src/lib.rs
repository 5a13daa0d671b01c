//! SwiftExpense Library
//!
//! Re-exports modules for the server binary, the seed tool and integration tests.

pub mod analytics;
pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod currency;
pub mod db;
pub mod domain;
mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod notifications;
pub mod state;

pub use api::build_router;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
