//! Domain model for the Pokemon collection.
//!
//! # Responsibility
//! - Define the record shape shared by store and service layers.
//! - Own input validation and name normalization rules.
//!
//! # Invariants
//! - Every record is identified by a store-assigned `PokemonId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod pokemon;
