//! Durable storage
//!
//! One SQLite file holds both the message log the stream worker fills and
//! the customer profile summaries.

mod sqlite;

pub use sqlite::SqliteStore;
