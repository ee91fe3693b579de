use crate::access::{FieldAccess, ListAccess};
use crate::fields::FieldKind;
use crate::resolve::ListHooks;
use crate::schema::config::{FieldUiConfig, ListUiConfig, OmitConfig};
use crate::validation::ValidationRules;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// The compiled, cross-referenced form of all lists. Built once at startup,
/// immutable thereafter, shared read-only by every request.
#[derive(Debug, Clone)]
pub struct InitialisedSchema {
    pub lists: IndexMap<String, Arc<List>>,
    /// Global ceiling on findMany result counts.
    pub max_total_results: usize,
}

impl InitialisedSchema {
    pub fn list(&self, key: &str) -> Option<&Arc<List>> {
        self.lists.get(key)
    }
}

/// A compiled list. Relationship targets have been verified to exist, access
/// rules normalized, GraphQL names finalized.
#[derive(Debug, Clone)]
pub struct List {
    pub key: String,
    pub fields: IndexMap<String, Field>,
    pub access: ListAccess,
    pub hooks: ListHooks,
    pub gql: GqlNames,
    pub omit: OmitConfig,
    /// Effective per-list take ceiling (list override or the global limit).
    pub max_take: usize,
    pub atomic_batches: bool,
    pub ui: ListUiConfig,
}

impl List {
    /// Field names whose values a session may read on `item`, in declaration
    /// order. `id` is always readable.
    pub fn readable_fields<'a>(
        &'a self,
        session: Option<&crate::context::Session>,
        item: &crate::db::Item,
    ) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|(_, f)| f.access.read.allows(session, Some(item)))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// A compiled field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub access: FieldAccess,
    pub validation: ValidationRules,
    pub is_unique: bool,
    pub is_indexed: bool,
    /// Resolved from the explicit option or the kind's default.
    pub is_filterable: bool,
    pub is_orderable: bool,
    pub default_value: Option<Value>,
    pub ui: FieldUiConfig,
}

impl Field {
    /// Relationship target list key, if this is a relationship field.
    pub fn foreign_list(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Relationship { list, .. } => Some(list),
            _ => None,
        }
    }
}

/// Finalized GraphQL names for a list. Computed once by the initializer so
/// both schema faces (SDL artifact and executable schema) agree byte for
/// byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GqlNames {
    /// Object type name, e.g. `User`.
    pub type_name: String,
    /// Singular query field, e.g. `user`.
    pub singular: String,
    /// Plural query field, e.g. `users`.
    pub plural: String,
    /// Count query field, e.g. `userCount`.
    pub count: String,
    pub create_input: String,
    pub update_input: String,
    pub update_args: String,
    pub where_input: String,
    pub unique_where_input: String,
    pub order_by_input: String,
    pub relate_to_one_input: String,
    pub relate_to_many_input: String,
    pub create_one: String,
    pub create_many: String,
    pub update_one: String,
    pub update_many: String,
    pub delete_one: String,
    pub delete_many: String,
}

impl GqlNames {
    pub fn for_list(key: &str, plural_override: Option<&str>) -> Self {
        let plural_key = plural_override
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}s", key));
        let singular = lower_first(key);
        let plural = lower_first(&plural_key);
        Self {
            type_name: key.to_string(),
            count: format!("{}Count", singular),
            create_input: format!("{}CreateInput", key),
            update_input: format!("{}UpdateInput", key),
            update_args: format!("{}UpdateArgs", key),
            where_input: format!("{}WhereInput", key),
            unique_where_input: format!("{}WhereUniqueInput", key),
            order_by_input: format!("{}OrderByInput", key),
            relate_to_one_input: format!("{}RelateToOneInput", key),
            relate_to_many_input: format!("{}RelateToManyInput", key),
            create_one: format!("create{}", key),
            create_many: format!("create{}", plural_key),
            update_one: format!("update{}", key),
            update_many: format!("update{}", plural_key),
            delete_one: format!("delete{}", key),
            delete_many: format!("delete{}", plural_key),
            singular,
            plural,
        }
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gql_names_default_plural() {
        let names = GqlNames::for_list("User", None);
        assert_eq!(names.singular, "user");
        assert_eq!(names.plural, "users");
        assert_eq!(names.count, "userCount");
        assert_eq!(names.create_many, "createUsers");
        assert_eq!(names.where_input, "UserWhereInput");
    }

    #[test]
    fn test_gql_names_plural_override() {
        let names = GqlNames::for_list("Person", Some("People"));
        assert_eq!(names.plural, "people");
        assert_eq!(names.delete_many, "deletePeople");
    }
}
