//! Library Management System
//!
//! REST JSON API over members, books, borrowing transactions, fines and
//! notifications. Domain events flow through an in-process mediator; the
//! notification reactor turns them into member notifications.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod mediator;
pub mod models;
pub mod repository;
pub mod services;
pub mod validation;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
