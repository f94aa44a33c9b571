//! Persistence contracts and their SQLite implementation.
//!
//! # Responsibility
//! - Expose collection-style operations (insert/find/update/delete).
//! - Keep SQL and SQLite error codes out of the service layer.
//!
//! # Invariants
//! - Store errors are reported as `StoreError`, never as raw driver errors.

pub mod pokemon_repo;
