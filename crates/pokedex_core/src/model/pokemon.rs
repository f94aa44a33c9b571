//! Pokemon domain model.
//!
//! # Responsibility
//! - Define the stored record, its creation input and its partial update.
//! - Validate caller input before it reaches persistence.
//!
//! # Invariants
//! - `name` is stored lowercase (see `normalize_name`).
//! - `no` is a positive pokedex index.
//! - `attributes` never shadow the reserved top-level keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Store-assigned identifier of a Pokemon record.
pub type PokemonId = Uuid;

/// Free-form descriptive fields carried alongside `no` and `name`.
pub type Attributes = Map<String, Value>;

/// Top-level keys owned by the record itself.
const RESERVED_KEYS: &[&str] = &["id", "no", "name", "meta"];

/// Internal record metadata maintained by the store.
///
/// Excluded from list projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Starts at 0, incremented by every successful update.
    pub version: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

/// Stored Pokemon record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: PokemonId,
    /// Pokedex index, unique across the collection.
    pub no: i64,
    /// Lowercase name, unique across the collection.
    pub name: String,
    /// Descriptive fields, serialized next to `id`/`no`/`name`.
    #[serde(flatten)]
    pub attributes: Attributes,
    /// `None` when the read projection excluded metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RecordMeta>,
}

impl Pokemon {
    /// Applies a partial update in place.
    ///
    /// Present scalar fields replace the current value; each attribute key in
    /// the patch replaces the key of the same name.
    pub fn apply_patch(&mut self, patch: &PokemonPatch) {
        if let Some(no) = patch.no {
            self.no = no;
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        for (key, value) in &patch.attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
    }
}

/// Creation input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPokemon {
    pub no: i64,
    pub name: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl NewPokemon {
    pub fn new(no: i64, name: impl Into<String>) -> Self {
        Self {
            no,
            name: name.into(),
            attributes: Attributes::new(),
        }
    }

    /// Adds one descriptive attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), PokemonValidationError> {
        validate_no(self.no)?;
        validate_name(&self.name)?;
        validate_attributes(&self.attributes)
    }

    /// Returns a copy with `name` lowercased.
    pub fn normalized(&self) -> Self {
        Self {
            no: self.no,
            name: normalize_name(&self.name),
            attributes: self.attributes.clone(),
        }
    }
}

/// Partial update input. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PokemonPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl PokemonPatch {
    pub fn with_no(mut self, no: i64) -> Self {
        self.no = Some(no);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.no.is_none() && self.name.is_none() && self.attributes.is_empty()
    }

    pub fn validate(&self) -> Result<(), PokemonValidationError> {
        if let Some(no) = self.no {
            validate_no(no)?;
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        validate_attributes(&self.attributes)
    }

    /// Returns a copy with `name` lowercased when present.
    pub fn normalized(&self) -> Self {
        Self {
            no: self.no,
            name: self.name.as_deref().map(normalize_name),
            attributes: self.attributes.clone(),
        }
    }
}

/// Pagination input for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationQuery {
    /// Page size; the configured default applies when absent.
    pub limit: Option<u32>,
    /// Rows to skip; 0 when absent.
    pub offset: Option<u32>,
}

impl PaginationQuery {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    pub fn validate(&self) -> Result<(), PokemonValidationError> {
        match self.limit {
            Some(0) => Err(PokemonValidationError::InvalidLimit(0)),
            _ => Ok(()),
        }
    }
}

/// Input validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PokemonValidationError {
    EmptyName,
    InvalidNo(i64),
    ReservedAttribute(String),
    InvalidLimit(u32),
}

impl Display for PokemonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::InvalidNo(value) => write!(f, "no must be a positive integer, got {value}"),
            Self::ReservedAttribute(key) => {
                write!(f, "attribute `{key}` collides with a reserved field")
            }
            Self::InvalidLimit(value) => write!(f, "limit must be at least 1, got {value}"),
        }
    }
}

impl Error for PokemonValidationError {}

/// Lowercases a Pokemon name for storage and lookup.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

fn validate_no(no: i64) -> Result<(), PokemonValidationError> {
    if no < 1 {
        return Err(PokemonValidationError::InvalidNo(no));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), PokemonValidationError> {
    if name.trim().is_empty() {
        return Err(PokemonValidationError::EmptyName);
    }
    Ok(())
}

fn validate_attributes(attributes: &Attributes) -> Result<(), PokemonValidationError> {
    match attributes
        .keys()
        .find(|key| RESERVED_KEYS.contains(&key.as_str()))
    {
        Some(key) => Err(PokemonValidationError::ReservedAttribute(key.clone())),
        None => Ok(()),
    }
}
