//! GSE Checkout Server
//!
//! REST JSON API behind the GSE fleet portal's checkout and reservation
//! workflow: equipment search, certification gating, code verification and
//! submission.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
