//! The list initializer: raw configuration in, immutable schema out.
//!
//! Deterministic and side-effect free, so it can run once for schema
//! printing and again for server startup with identical output.

use crate::config::StrataConfig;
use crate::error::{Result, StrataError};
use crate::fields::FieldKind;
use crate::schema::config::ListConfig;
use crate::schema::types::{Field, GqlNames, InitialisedSchema, List};
use crate::validation::{validate_field_name, validate_list_key};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Compiles raw list configuration into an [`InitialisedSchema`].
///
/// Fails with a configuration error when a relationship targets an unknown
/// list, a field name is reserved or malformed, or finalized GraphQL names
/// collide.
pub fn initialise(
    config: &StrataConfig,
    lists: IndexMap<String, ListConfig>,
) -> Result<InitialisedSchema> {
    let keys: HashSet<&str> = lists.keys().map(String::as_str).collect();

    let mut compiled = IndexMap::new();
    let mut seen_gql_names = HashSet::new();

    for (key, list_config) in &lists {
        validate_list_key(key)?;

        let mut fields = IndexMap::new();
        for (name, field_config) in &list_config.fields {
            validate_field_name(key, name)?;

            if let FieldKind::Relationship { list: target, .. } = &field_config.kind
                && !keys.contains(target.as_str())
            {
                return Err(StrataError::Config(format!(
                    "Field '{}.{}' references unknown list '{}'",
                    key, name, target
                )));
            }

            let is_filterable = field_config
                .is_filterable
                .unwrap_or_else(|| field_config.kind.default_filterable())
                && field_config.kind.default_filterable();
            let is_orderable = field_config
                .is_orderable
                .unwrap_or_else(|| field_config.kind.default_orderable())
                && field_config.kind.default_orderable();

            fields.insert(
                name.clone(),
                Field {
                    name: name.clone(),
                    kind: field_config.kind.clone(),
                    access: field_config.access.clone(),
                    validation: field_config.validation.clone(),
                    is_unique: field_config.is_unique,
                    is_indexed: field_config.is_indexed,
                    is_filterable,
                    is_orderable,
                    default_value: field_config.default_value.clone(),
                    ui: field_config.ui.clone(),
                },
            );
        }

        let gql = GqlNames::for_list(key, list_config.graphql.plural.as_deref());
        if gql.singular == gql.plural {
            return Err(StrataError::Config(format!(
                "List '{}': singular and plural GraphQL names are both '{}'; set graphql.plural",
                key, gql.singular
            )));
        }
        for name in [&gql.singular, &gql.plural, &gql.type_name] {
            if !seen_gql_names.insert(name.clone()) {
                return Err(StrataError::Config(format!(
                    "List '{}': GraphQL name '{}' is already taken by another list",
                    key, name
                )));
            }
        }

        let max_take = list_config
            .graphql
            .max_take
            .unwrap_or(config.graphql.max_total_results)
            .min(config.graphql.max_total_results);

        compiled.insert(
            key.clone(),
            Arc::new(List {
                key: key.clone(),
                fields,
                access: list_config.access.clone(),
                hooks: list_config.hooks.clone(),
                gql,
                omit: list_config.graphql.omit,
                max_take,
                atomic_batches: list_config.atomic_batches,
                ui: list_config.ui.clone(),
            }),
        );
    }

    debug!(lists = compiled.len(), "initialised schema");
    Ok(InitialisedSchema {
        lists: compiled,
        max_total_results: config.graphql.max_total_results,
    })
}
