//! SQLite backend for the deposit engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
