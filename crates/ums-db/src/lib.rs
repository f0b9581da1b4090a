//! User Management Database Layer
//!
//! This crate provides the persistence layer for the user management
//! service, using SQLite via sqlx for roles, users and login sessions.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::Database;

/// Re-export sqlx types for convenience
pub use sqlx::SqlitePool;
