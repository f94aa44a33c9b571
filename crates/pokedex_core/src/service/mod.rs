//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into request-level operations.
//! - Translate store failures into caller-facing error kinds.

pub mod pokemon_service;
