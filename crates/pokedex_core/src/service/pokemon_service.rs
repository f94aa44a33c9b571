//! Pokemon use-case service.
//!
//! # Responsibility
//! - Validate and normalize caller input before persistence.
//! - Resolve ambiguous identifiers through an ordered lookup strategy list.
//! - Map `StoreError` into `PokemonServiceError`.
//!
//! # Invariants
//! - Names reach the store lowercased on both create and update.
//! - Store failure detail is logged, never returned to the caller.
//! - `remove` only accepts an exact store id.

use crate::config::PokedexConfig;
use crate::model::pokemon::{
    NewPokemon, PaginationQuery, Pokemon, PokemonId, PokemonPatch, PokemonValidationError,
};
use crate::repo::pokemon_repo::{
    PokemonFilter, PokemonFindQuery, PokemonSortField, PokemonStore, StoreError,
};
use log::{error, info, warn};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// How an identifier is matched against the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Identifier is an integer pokedex index.
    ByNo,
    /// Identifier is a store id.
    ById,
    /// Identifier is an exact name.
    ByName,
}

/// Evaluation order for `find_one`; the first strategy yielding a record wins.
pub const LOOKUP_ORDER: [LookupStrategy; 3] = [
    LookupStrategy::ByNo,
    LookupStrategy::ById,
    LookupStrategy::ByName,
];

impl LookupStrategy {
    /// Builds the store filter for `term`, or `None` when the term does not
    /// have this strategy's shape.
    pub fn filter_for(self, term: &str) -> Option<PokemonFilter> {
        match self {
            Self::ByNo => term.parse::<i64>().ok().map(PokemonFilter::No),
            Self::ById => Uuid::parse_str(term).ok().map(PokemonFilter::Id),
            Self::ByName => Some(PokemonFilter::Name(term.to_string())),
        }
    }
}

/// Caller-facing error kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum PokemonServiceError {
    /// Input failed validation; nothing was written.
    InvalidInput(PokemonValidationError),
    /// A write collided with an existing `no` or `name`.
    DuplicateKey { field: String, value: Value },
    /// No record matched the identifier.
    NotFound(String),
    /// Store failure; detail is in the server log only.
    InternalFailure,
}

impl PokemonServiceError {
    /// Whether the caller, not the server, is at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::InternalFailure)
    }
}

impl Display for PokemonServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::DuplicateKey { field, value } => {
                write!(f, "pokemon exists in db {}", json!({ field.as_str(): value }))
            }
            Self::NotFound(id) => write!(f, "pokemon with id, name or no `{id}` not found"),
            Self::InternalFailure => write!(f, "pokemon store failure - check server logs"),
        }
    }
}

impl Error for PokemonServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PokemonValidationError> for PokemonServiceError {
    fn from(value: PokemonValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

pub type ServiceResult<T> = Result<T, PokemonServiceError>;

/// Pokemon CRUD service over a `PokemonStore`.
pub struct PokemonService<S: PokemonStore> {
    store: S,
    default_limit: u32,
}

impl<S: PokemonStore> PokemonService<S> {
    /// Creates a service; `config` is read once here.
    pub fn new(store: S, config: &PokedexConfig) -> Self {
        Self {
            store,
            default_limit: config.default_limit,
        }
    }

    /// Page size applied when a list query has no `limit`.
    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Inserts one Pokemon with its name lowercased.
    pub fn create(&self, input: &NewPokemon) -> ServiceResult<Pokemon> {
        input.validate()?;
        let input = input.normalized();

        let created = self
            .store
            .insert(&input)
            .map_err(|err| translate_store_error("pokemon_create", err))?;
        info!(
            "event=pokemon_create module=service status=ok id={} no={}",
            created.id, created.no
        );
        Ok(created)
    }

    /// Lists Pokemon ordered by `no`, without record metadata.
    pub fn find_all(&self, pagination: &PaginationQuery) -> ServiceResult<Vec<Pokemon>> {
        pagination.validate()?;

        let query = PokemonFindQuery {
            filter: None,
            sort: PokemonSortField::No,
            skip: pagination.offset.unwrap_or(0),
            limit: Some(pagination.limit.unwrap_or(self.default_limit)),
            exclude_meta: true,
        };
        self.store
            .find(&query)
            .map_err(|err| translate_store_error("pokemon_list", err))
    }

    /// Resolves `term` by pokedex index, then store id, then name.
    ///
    /// Each strategy runs only when the earlier ones matched nothing.
    pub fn find_one(&self, term: &str) -> ServiceResult<Pokemon> {
        for strategy in LOOKUP_ORDER {
            let Some(filter) = strategy.filter_for(term) else {
                continue;
            };
            let found = self
                .store
                .find_one(&filter)
                .map_err(|err| translate_store_error("pokemon_lookup", err))?;
            if let Some(pokemon) = found {
                return Ok(pokemon);
            }
        }

        Err(PokemonServiceError::NotFound(term.to_string()))
    }

    /// Applies `patch` to the record resolved from `term`.
    ///
    /// Returns the pre-update record merged with the patch, not a re-read.
    pub fn update(&self, term: &str, patch: &PokemonPatch) -> ServiceResult<Pokemon> {
        let mut pokemon = self.find_one(term)?;
        patch.validate()?;
        let patch = patch.normalized();

        let matched = self
            .store
            .update_by_id(pokemon.id, &patch)
            .map_err(|err| translate_store_error("pokemon_update", err))?;
        if matched == 0 {
            warn!(
                "event=pokemon_update module=service status=missing id={}",
                pokemon.id
            );
            return Err(PokemonServiceError::NotFound(term.to_string()));
        }

        pokemon.apply_patch(&patch);
        info!(
            "event=pokemon_update module=service status=ok id={}",
            pokemon.id
        );
        Ok(pokemon)
    }

    /// Deletes by exact store id; numeric index and name are not accepted.
    pub fn remove(&self, id: &str) -> ServiceResult<()> {
        let Ok(id) = PokemonId::parse_str(id) else {
            return Err(PokemonServiceError::NotFound(id.to_string()));
        };

        let deleted = self
            .store
            .delete_by_id(id)
            .map_err(|err| translate_store_error("pokemon_remove", err))?;
        if deleted == 0 {
            return Err(PokemonServiceError::NotFound(id.to_string()));
        }

        info!("event=pokemon_remove module=service status=ok id={id}");
        Ok(())
    }
}

fn translate_store_error(event: &str, err: StoreError) -> PokemonServiceError {
    match err {
        StoreError::ConstraintViolation { field, value } => {
            warn!("event={event} module=service status=conflict field={field} value={value}");
            PokemonServiceError::DuplicateKey { field, value }
        }
        StoreError::Other(detail) => {
            error!("event={event} module=service status=error error={detail}");
            PokemonServiceError::InternalFailure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LookupStrategy, PokemonServiceError, LOOKUP_ORDER};
    use crate::repo::pokemon_repo::PokemonFilter;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn numeric_strategy_rejects_empty_and_non_numeric_terms() {
        for term in ["", "abc", "12abc", " 12", "1.5"] {
            assert_eq!(LookupStrategy::ByNo.filter_for(term), None, "term {term:?}");
        }
        assert_eq!(
            LookupStrategy::ByNo.filter_for("25"),
            Some(PokemonFilter::No(25))
        );
    }

    #[test]
    fn id_strategy_only_accepts_store_ids() {
        let id = Uuid::new_v4();
        assert_eq!(
            LookupStrategy::ById.filter_for(&id.to_string()),
            Some(PokemonFilter::Id(id))
        );
        assert_eq!(LookupStrategy::ById.filter_for("pikachu"), None);
    }

    #[test]
    fn lookup_order_is_no_then_id_then_name() {
        assert_eq!(
            LOOKUP_ORDER,
            [
                LookupStrategy::ByNo,
                LookupStrategy::ById,
                LookupStrategy::ByName
            ]
        );
    }

    #[test]
    fn duplicate_key_message_names_the_conflicting_key() {
        let err = PokemonServiceError::DuplicateKey {
            field: "name".to_string(),
            value: json!("pikachu"),
        };
        assert_eq!(err.to_string(), r#"pokemon exists in db {"name":"pikachu"}"#);
        assert!(err.is_client_error());
    }

    #[test]
    fn internal_failure_message_is_generic() {
        let err = PokemonServiceError::InternalFailure;
        assert!(!err.is_client_error());
        assert!(!err.to_string().contains("sqlite"));
    }
}
