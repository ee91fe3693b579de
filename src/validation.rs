//! Input validation for list configuration and field values.

use crate::error::{Result, StrataError};
use regex::Regex;
use serde_json::Value;

/// Maximum allowed length for a list key.
pub const MAX_LIST_KEY_LENGTH: usize = 64;

/// Maximum allowed length for a field name.
pub const MAX_FIELD_NAME_LENGTH: usize = 64;

/// Field names the framework claims for itself. Every item carries an
/// implicit `id`, so user configuration may not redefine it.
pub const RESERVED_FIELD_NAMES: &[&str] = &["id"];

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a list key (must be a capitalized identifier, e.g. `User`).
pub fn validate_list_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StrataError::Config("List key cannot be empty".to_string()));
    }
    if key.len() > MAX_LIST_KEY_LENGTH {
        return Err(StrataError::Config(format!(
            "List key '{}' exceeds maximum length of {} characters",
            key, MAX_LIST_KEY_LENGTH
        )));
    }
    if !is_identifier(key) {
        return Err(StrataError::Config(format!(
            "List key '{}' is not a valid identifier",
            key
        )));
    }
    if !key.chars().next().unwrap_or('a').is_ascii_uppercase() {
        return Err(StrataError::Config(format!(
            "List key '{}' must start with an uppercase letter",
            key
        )));
    }
    Ok(())
}

/// Validates a field name within a list.
pub fn validate_field_name(list: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StrataError::Config(format!(
            "List '{}' has a field with an empty name",
            list
        )));
    }
    if name.len() > MAX_FIELD_NAME_LENGTH {
        return Err(StrataError::Config(format!(
            "Field '{}.{}' exceeds maximum name length of {} characters",
            list, name, MAX_FIELD_NAME_LENGTH
        )));
    }
    if !is_identifier(name) {
        return Err(StrataError::Config(format!(
            "Field '{}.{}' is not a valid identifier",
            list, name
        )));
    }
    if RESERVED_FIELD_NAMES.contains(&name) {
        return Err(StrataError::Config(format!(
            "Field '{}.{}' collides with a reserved field name",
            list, name
        )));
    }
    Ok(())
}

/// Value-level validation rules attached to a field in configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    pub is_required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub matches: Option<Regex>,
}

impl ValidationRules {
    /// Checks a single field value against these rules. `value` is `None`
    /// when the input did not mention the field at all.
    pub fn check(&self, list: &str, field: &str, value: Option<&Value>) -> Result<()> {
        let value = match value {
            None | Some(Value::Null) => {
                if self.is_required {
                    return Err(StrataError::validation_field(list, field, "is required"));
                }
                return Ok(());
            }
            Some(v) => v,
        };

        if let Value::String(s) = value {
            if self.is_required && s.is_empty() {
                return Err(StrataError::validation_field(list, field, "cannot be empty"));
            }
            if let Some(min) = self.min_length
                && s.chars().count() < min
            {
                return Err(StrataError::validation_field(
                    list,
                    field,
                    format!("must be at least {} characters", min),
                ));
            }
            if let Some(max) = self.max_length
                && s.chars().count() > max
            {
                return Err(StrataError::validation_field(
                    list,
                    field,
                    format!("must be at most {} characters", max),
                ));
            }
            if let Some(re) = &self.matches
                && !re.is_match(s)
            {
                return Err(StrataError::validation_field(
                    list,
                    field,
                    format!("must match pattern '{}'", re.as_str()),
                ));
            }
        }

        Ok(())
    }
}
