use crate::access::{FieldAccess, FieldRule, ListAccess};
use crate::fields::FieldKind;
use crate::resolve::ListHooks;
use crate::validation::ValidationRules;
use indexmap::IndexMap;
use serde_json::Value;

/// Declarative configuration for one list. Every recognized option appears
/// here with its default; nothing is carried through the pipeline as an
/// open-ended bag.
#[derive(Debug, Clone, Default)]
pub struct ListConfig {
    pub fields: IndexMap<String, FieldConfig>,
    pub access: ListAccess,
    pub hooks: ListHooks,
    pub graphql: ListGraphqlConfig,
    pub ui: ListUiConfig,
    /// Run batch mutations in a single transaction (all-or-nothing) instead
    /// of reporting per-item results.
    pub atomic_batches: bool,
}

impl ListConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldConfig) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn with_access(mut self, access: ListAccess) -> Self {
        self.access = access;
        self
    }

    pub fn with_hooks(mut self, hooks: ListHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_graphql(mut self, graphql: ListGraphqlConfig) -> Self {
        self.graphql = graphql;
        self
    }

    pub fn with_ui(mut self, ui: ListUiConfig) -> Self {
        self.ui = ui;
        self
    }

    pub fn with_atomic_batches(mut self) -> Self {
        self.atomic_batches = true;
        self
    }
}

/// Per-list GraphQL naming and omission options.
#[derive(Debug, Clone, Default)]
pub struct ListGraphqlConfig {
    /// Plural name override. Defaults to `<key>s`; required when the naive
    /// plural collides with the singular.
    pub plural: Option<String>,
    pub omit: OmitConfig,
    /// Per-list ceiling on `take`, tighter than the global
    /// `max_total_results` when set.
    pub max_take: Option<usize>,
}

impl ListGraphqlConfig {
    pub fn plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = Some(plural.into());
        self
    }

    pub fn omit(mut self, omit: OmitConfig) -> Self {
        self.omit = omit;
        self
    }

    pub fn max_take(mut self, max_take: usize) -> Self {
        self.max_take = Some(max_take);
        self
    }
}

/// Which GraphQL operations a list opts out of. Omission removes the fields
/// from the schema entirely; it is not access control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OmitConfig {
    pub query: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl OmitConfig {
    /// Omits the whole list from the GraphQL schema.
    pub fn all() -> Self {
        Self {
            query: true,
            create: true,
            update: true,
            delete: true,
        }
    }

    pub fn everything_omitted(&self) -> bool {
        self.query && self.create && self.update && self.delete
    }
}

/// Admin UI hints for a list. Opaque to the core; carried through for the
/// (external) admin surface.
#[derive(Debug, Clone, Default)]
pub struct ListUiConfig {
    pub label: Option<String>,
    pub description: Option<String>,
    pub hidden: bool,
}

/// Admin UI hints for a field.
#[derive(Debug, Clone, Default)]
pub struct FieldUiConfig {
    pub label: Option<String>,
    pub description: Option<String>,
}

/// Declarative configuration for one field.
#[derive(Debug, Clone)]
pub struct FieldConfig {
    pub kind: FieldKind,
    pub access: FieldAccess,
    pub validation: ValidationRules,
    pub is_unique: bool,
    pub is_indexed: bool,
    /// `None` defers to the kind's default capability.
    pub is_filterable: Option<bool>,
    pub is_orderable: Option<bool>,
    /// Applied on create when the input does not mention the field.
    pub default_value: Option<Value>,
    pub ui: FieldUiConfig,
}

impl FieldConfig {
    fn of_kind(kind: FieldKind) -> Self {
        Self {
            kind,
            access: FieldAccess::default(),
            validation: ValidationRules::default(),
            is_unique: false,
            is_indexed: false,
            is_filterable: None,
            is_orderable: None,
            default_value: None,
            ui: FieldUiConfig::default(),
        }
    }

    pub fn text() -> Self {
        Self::of_kind(FieldKind::Text)
    }

    pub fn integer() -> Self {
        Self::of_kind(FieldKind::Integer)
    }

    pub fn float() -> Self {
        Self::of_kind(FieldKind::Float)
    }

    pub fn checkbox() -> Self {
        Self::of_kind(FieldKind::Checkbox)
    }

    pub fn timestamp() -> Self {
        Self::of_kind(FieldKind::Timestamp)
    }

    /// Password fields hash on write and are never readable; the read rule
    /// starts at deny so even an explicit query cannot recover the hash.
    pub fn password() -> Self {
        let mut field = Self::of_kind(FieldKind::Password);
        field.access.read = FieldRule::Deny;
        field
    }

    pub fn select(options: Vec<String>) -> Self {
        Self::of_kind(FieldKind::Select { options })
    }

    /// To-one relationship to `list`.
    pub fn relationship(list: impl Into<String>) -> Self {
        Self::of_kind(FieldKind::Relationship {
            list: list.into(),
            many: false,
        })
    }

    /// To-many relationship to `list`.
    pub fn relationship_many(list: impl Into<String>) -> Self {
        Self::of_kind(FieldKind::Relationship {
            list: list.into(),
            many: true,
        })
    }

    pub fn with_access(mut self, access: FieldAccess) -> Self {
        self.access = access;
        self
    }

    pub fn with_validation(mut self, validation: ValidationRules) -> Self {
        self.validation = validation;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.is_indexed = true;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.is_filterable = Some(filterable);
        self
    }

    pub fn orderable(mut self, orderable: bool) -> Self {
        self.is_orderable = Some(orderable);
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_ui(mut self, ui: FieldUiConfig) -> Self {
        self.ui = ui;
        self
    }
}
