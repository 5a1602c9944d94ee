//! Helpers for tests that need a real database: throwaway SQLite files and seed data.
pub mod fixtures;
pub mod prepare_env;
