//! Field kinds and their capabilities.
//!
//! Every field kind knows three things: the relational column it maps to, the
//! GraphQL types it reads and writes as, and the filter/order capabilities it
//! offers by default. The list initializer and the schema printers consult
//! this registry instead of special-casing kinds anywhere else.

use crate::error::{Result, StrataError};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::DateTime;
use serde_json::Value;

/// The kind of a field: its storage shape and GraphQL surface.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Checkbox,
    Timestamp,
    /// Stored as an argon2 hash, never readable through GraphQL.
    Password,
    /// A string constrained to a fixed set of options.
    Select { options: Vec<String> },
    /// Reference to another list. `many: false` is a foreign-key column,
    /// `many: true` is represented by a join table.
    Relationship { list: String, many: bool },
}

/// The relational column a scalar field maps to. Relationship fields with
/// `many: true` have no column of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnShape {
    pub column_type: &'static str,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Password => "password",
            FieldKind::Select { .. } => "select",
            FieldKind::Relationship { .. } => "relationship",
        }
    }

    /// Relational column shape, `None` for to-many relationships.
    pub fn column(&self) -> Option<ColumnShape> {
        let column_type = match self {
            FieldKind::Text | FieldKind::Select { .. } => "text",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Checkbox => "boolean",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Password => "text",
            FieldKind::Relationship { many: true, .. } => return None,
            FieldKind::Relationship { many: false, .. } => "text",
        };
        Some(ColumnShape { column_type })
    }

    /// GraphQL output type name. `None` means the field has no readable
    /// output at all (passwords).
    pub fn graphql_output(&self) -> Option<&'static str> {
        match self {
            FieldKind::Text | FieldKind::Select { .. } => Some("String"),
            FieldKind::Integer => Some("Int"),
            FieldKind::Float => Some("Float"),
            FieldKind::Checkbox => Some("Boolean"),
            FieldKind::Timestamp => Some("DateTime"),
            FieldKind::Password => None,
            // Relationship output types are list-specific; the schema
            // builders resolve them through the initialised schema.
            FieldKind::Relationship { .. } => None,
        }
    }

    /// GraphQL scalar input type for create/update, where applicable.
    pub fn graphql_input(&self) -> Option<&'static str> {
        match self {
            FieldKind::Text | FieldKind::Select { .. } | FieldKind::Password => Some("String"),
            FieldKind::Integer => Some("Int"),
            FieldKind::Float => Some("Float"),
            FieldKind::Checkbox => Some("Boolean"),
            FieldKind::Timestamp => Some("DateTime"),
            FieldKind::Relationship { .. } => None,
        }
    }

    /// Shared filter input type name, for kinds that support filtering.
    pub fn filter_input(&self) -> Option<&'static str> {
        match self {
            FieldKind::Text | FieldKind::Select { .. } => Some("StringFilter"),
            FieldKind::Integer => Some("IntFilter"),
            FieldKind::Float => Some("FloatFilter"),
            FieldKind::Checkbox => Some("BooleanFilter"),
            FieldKind::Timestamp => Some("DateTimeFilter"),
            FieldKind::Password | FieldKind::Relationship { .. } => None,
        }
    }

    pub fn default_filterable(&self) -> bool {
        self.filter_input().is_some()
    }

    pub fn default_orderable(&self) -> bool {
        !matches!(
            self,
            FieldKind::Password | FieldKind::Relationship { .. }
        )
    }

    /// Checks an input value against the kind's shape and applies the kind's
    /// input transform. Passwords are hashed here, before anything else sees
    /// the plaintext.
    pub fn transform_input(&self, list: &str, field: &str, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            FieldKind::Text => match value {
                Value::String(_) => Ok(value),
                _ => Err(shape_error(list, field, "a string")),
            },
            FieldKind::Integer => match value {
                Value::Number(ref n) if n.is_i64() => Ok(value),
                _ => Err(shape_error(list, field, "an integer")),
            },
            FieldKind::Float => match value {
                Value::Number(_) => Ok(value),
                _ => Err(shape_error(list, field, "a number")),
            },
            FieldKind::Checkbox => match value {
                Value::Bool(_) => Ok(value),
                _ => Err(shape_error(list, field, "a boolean")),
            },
            FieldKind::Timestamp => match value {
                Value::String(ref s) => {
                    DateTime::parse_from_rfc3339(s)
                        .map_err(|_| shape_error(list, field, "an RFC 3339 timestamp"))?;
                    Ok(value)
                }
                _ => Err(shape_error(list, field, "an RFC 3339 timestamp")),
            },
            FieldKind::Password => match value {
                Value::String(ref s) => Ok(Value::String(hash_password(s)?)),
                _ => Err(shape_error(list, field, "a string")),
            },
            FieldKind::Select { options } => match value {
                Value::String(ref s) if options.iter().any(|o| o == s) => Ok(value),
                Value::String(ref s) => Err(StrataError::validation_field(
                    list,
                    field,
                    format!("'{}' is not one of the configured options", s),
                )),
                _ => Err(shape_error(list, field, "a string")),
            },
            // Relationship inputs are `connect` objects resolved by the
            // pipeline, not plain scalars.
            FieldKind::Relationship { .. } => Ok(value),
        }
    }
}

fn shape_error(list: &str, field: &str, expected: &str) -> StrataError {
    StrataError::validation_field(list, field, format!("expected {}", expected))
}

/// Hashes a plaintext password with argon2 and a fresh random salt.
pub fn hash_password(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| StrataError::Validation(format!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verifies a plaintext password against a stored argon2 hash.
pub fn verify_password(plaintext: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
