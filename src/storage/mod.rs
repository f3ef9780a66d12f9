//! Storage layer for shop-notify.
//!
//! This module provides SQLite-based persistence for:
//! - Scripts and their step data
//! - Audit log entries attached to shop entities
//! - In-app notifications
//! - The outgoing mail outbox

mod database;
mod migrations;

pub use database::Database;
