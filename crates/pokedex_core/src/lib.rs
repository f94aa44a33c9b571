//! Core domain logic for the Pokedex service.
//! Owns validation, name normalization, identifier resolution and store
//! error translation for the Pokemon collection.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, PokedexConfig};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::pokemon::{
    Attributes, NewPokemon, PaginationQuery, Pokemon, PokemonId, PokemonPatch,
    PokemonValidationError, RecordMeta,
};
pub use repo::pokemon_repo::{
    PokemonFilter, PokemonFindQuery, PokemonSortField, PokemonStore, SqlitePokemonStore,
    StoreError, StoreResult,
};
pub use service::pokemon_service::{
    LookupStrategy, PokemonService, PokemonServiceError, ServiceResult, LOOKUP_ORDER,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
