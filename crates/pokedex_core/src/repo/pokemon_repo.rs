//! Pokemon collection contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide document-collection style operations over the `pokemon` table.
//! - Translate uniqueness failures into `StoreError::ConstraintViolation`.
//!
//! # Invariants
//! - `no` and `name` uniqueness is enforced by the schema, not by reads.
//! - Every successful update bumps `version` and `updated_at`.
//! - Rows with unparsable ids or attributes are reported, never masked.

use crate::db::DbError;
use crate::model::pokemon::{
    Attributes, NewPokemon, Pokemon, PokemonId, PokemonPatch, RecordMeta,
};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const POKEMON_SELECT_SQL: &str = "SELECT
    id,
    pokedex_no,
    name,
    attributes,
    version,
    created_at,
    updated_at
FROM pokemon";

static UNIQUE_FAILURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"UNIQUE constraint failed: pokemon\.(\w+)").expect("valid unique failure regex")
});

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-agnostic persistence failure.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A write collided with an existing record on a unique field.
    ConstraintViolation { field: String, value: Value },
    /// Any other failure, with driver detail for logs.
    Other(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConstraintViolation { field, value } => {
                write!(f, "unique constraint violated on `{field}` with value {value}")
            }
            Self::Other(detail) => write!(f, "{detail}"),
        }
    }
}

impl Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Other(value.to_string())
    }
}

/// Equality filter over one identifying field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PokemonFilter {
    No(i64),
    Id(PokemonId),
    Name(String),
}

/// Ascending sort key for `find`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PokemonSortField {
    #[default]
    No,
    Name,
}

/// Query options for `find`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PokemonFindQuery {
    pub filter: Option<PokemonFilter>,
    pub sort: PokemonSortField,
    pub skip: u32,
    pub limit: Option<u32>,
    /// Leaves `Pokemon::meta` as `None` in results.
    pub exclude_meta: bool,
}

/// Collection handle used by the service layer.
pub trait PokemonStore {
    /// Inserts one record and returns it with its assigned id.
    fn insert(&self, pokemon: &NewPokemon) -> StoreResult<Pokemon>;
    /// Returns records matching the query, sorted and paginated.
    fn find(&self, query: &PokemonFindQuery) -> StoreResult<Vec<Pokemon>>;
    /// Returns the first record matching the filter.
    fn find_one(&self, filter: &PokemonFilter) -> StoreResult<Option<Pokemon>>;
    /// Applies a partial update; returns the matched record count.
    fn update_by_id(&self, id: PokemonId, patch: &PokemonPatch) -> StoreResult<u64>;
    /// Deletes by id; returns the deleted record count.
    fn delete_by_id(&self, id: PokemonId) -> StoreResult<u64>;
}

/// SQLite-backed Pokemon collection.
pub struct SqlitePokemonStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePokemonStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PokemonStore for SqlitePokemonStore<'_> {
    fn insert(&self, pokemon: &NewPokemon) -> StoreResult<Pokemon> {
        let id = Uuid::new_v4();
        let attributes = encode_attributes(&pokemon.attributes)?;

        let meta = self
            .conn
            .query_row(
                "INSERT INTO pokemon (id, pokedex_no, name, attributes)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING version, created_at, updated_at;",
                params![id.to_string(), pokemon.no, pokemon.name.as_str(), attributes],
                |row| {
                    Ok(RecordMeta {
                        version: row.get("version")?,
                        created_at: row.get("created_at")?,
                        updated_at: row.get("updated_at")?,
                    })
                },
            )
            .map_err(|err| {
                translate_write_error(err, |field| match field {
                    "id" => Some(Value::from(id.to_string())),
                    "no" => Some(Value::from(pokemon.no)),
                    "name" => Some(Value::from(pokemon.name.as_str())),
                    _ => None,
                })
            })?;

        Ok(Pokemon {
            id,
            no: pokemon.no,
            name: pokemon.name.clone(),
            attributes: pokemon.attributes.clone(),
            meta: Some(meta),
        })
    }

    fn find(&self, query: &PokemonFindQuery) -> StoreResult<Vec<Pokemon>> {
        let mut sql = format!("{POKEMON_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<SqlValue> = Vec::new();

        if let Some(filter) = &query.filter {
            let (column, value) = filter_binding(filter);
            sql.push_str(&format!(" AND {column} = ?"));
            bind_values.push(value);
        }

        sql.push_str(match query.sort {
            PokemonSortField::No => " ORDER BY pokedex_no ASC",
            PokemonSortField::Name => " ORDER BY name ASC",
        });

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(SqlValue::Integer(i64::from(limit)));
            if query.skip > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(SqlValue::Integer(i64::from(query.skip)));
            }
        } else if query.skip > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(SqlValue::Integer(i64::from(query.skip)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            let mut pokemon = parse_pokemon_row(row)?;
            if query.exclude_meta {
                pokemon.meta = None;
            }
            items.push(pokemon);
        }

        Ok(items)
    }

    fn find_one(&self, filter: &PokemonFilter) -> StoreResult<Option<Pokemon>> {
        let (column, value) = filter_binding(filter);
        let mut stmt = self
            .conn
            .prepare(&format!("{POKEMON_SELECT_SQL} WHERE {column} = ?1 LIMIT 1;"))?;

        let mut rows = stmt.query([value])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_pokemon_row(row)?)),
            None => Ok(None),
        }
    }

    fn update_by_id(&self, id: PokemonId, patch: &PokemonPatch) -> StoreResult<u64> {
        let tx = self.conn.unchecked_transaction()?;

        let current: Option<String> = tx
            .query_row(
                "SELECT attributes FROM pokemon WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Ok(0);
        };

        let mut attributes = decode_attributes(&current)?;
        for (key, value) in &patch.attributes {
            attributes.insert(key.clone(), value.clone());
        }
        let attributes = encode_attributes(&attributes)?;

        let changed = tx
            .execute(
                "UPDATE pokemon
                 SET
                    pokedex_no = COALESCE(?2, pokedex_no),
                    name = COALESCE(?3, name),
                    attributes = ?4,
                    version = version + 1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![id.to_string(), patch.no, patch.name.as_deref(), attributes],
            )
            .map_err(|err| {
                translate_write_error(err, |field| match field {
                    "no" => patch.no.map(Value::from),
                    "name" => patch.name.as_deref().map(Value::from),
                    _ => None,
                })
            })?;

        tx.commit()?;
        Ok(changed as u64)
    }

    fn delete_by_id(&self, id: PokemonId) -> StoreResult<u64> {
        let changed = self
            .conn
            .execute("DELETE FROM pokemon WHERE id = ?1;", [id.to_string()])?;
        Ok(changed as u64)
    }
}

fn filter_binding(filter: &PokemonFilter) -> (&'static str, SqlValue) {
    match filter {
        PokemonFilter::No(no) => ("pokedex_no", SqlValue::Integer(*no)),
        PokemonFilter::Id(id) => ("id", SqlValue::Text(id.to_string())),
        PokemonFilter::Name(name) => ("name", SqlValue::Text(name.clone())),
    }
}

/// Maps a failed write to `ConstraintViolation` when SQLite reports a
/// UNIQUE failure on a known column.
fn translate_write_error(
    err: rusqlite::Error,
    value_of: impl Fn(&str) -> Option<Value>,
) -> StoreError {
    let column = match &err {
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            UNIQUE_FAILURE_RE
                .captures(message)
                .and_then(|caps| caps.get(1))
                .map(|column| column.as_str().to_string())
        }
        _ => None,
    };

    let Some(column) = column else {
        return StoreError::from(err);
    };
    let field = match column.as_str() {
        "pokedex_no" => "no",
        other => other,
    };

    StoreError::ConstraintViolation {
        field: field.to_string(),
        value: value_of(field).unwrap_or(Value::Null),
    }
}

fn encode_attributes(attributes: &Attributes) -> StoreResult<String> {
    serde_json::to_string(attributes)
        .map_err(|err| StoreError::Other(format!("failed to encode attributes: {err}")))
}

fn decode_attributes(text: &str) -> StoreResult<Attributes> {
    serde_json::from_str(text).map_err(|err| {
        StoreError::Other(format!(
            "invalid attributes value in pokemon.attributes: {err}"
        ))
    })
}

fn parse_pokemon_row(row: &Row<'_>) -> StoreResult<Pokemon> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::Other(format!("invalid id value `{id_text}` in pokemon.id"))
    })?;

    let attributes_text: String = row.get("attributes")?;

    Ok(Pokemon {
        id,
        no: row.get("pokedex_no")?,
        name: row.get("name")?,
        attributes: decode_attributes(&attributes_text)?,
        meta: Some(RecordMeta {
            version: row.get("version")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        }),
    })
}
