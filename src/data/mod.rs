//! Data ingestion and storage
//!
//! Game log CSV ingestion, the in-memory store, SQLite persistence and the
//! feature table file.

pub mod database;
pub mod feature_table;
pub mod game_log;
pub mod store;

pub use database::Database;
pub use store::{GameLogStore, StoreHandle};
