//! Access-control rules and their evaluator.
//!
//! Rules are evaluated in a fixed order, short-circuiting on the first
//! denial: operation (coarse allow/deny per CRUD verb), filter (row-set
//! narrowing), item (per matched row), field (per column). Each layer
//! operates on a strictly smaller surface than the previous one, and every
//! denial is shaped to be indistinguishable from absence.

use crate::context::Session;
use crate::db::Item;
use crate::query::Filter;
use std::fmt;
use std::sync::Arc;

/// The CRUD verb an access check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Query,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Query => "query",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Coarse allow/deny gate per CRUD verb, checked before anything else.
#[derive(Clone, Default)]
pub enum OperationRule {
    #[default]
    Allow,
    Deny,
    Predicate(Arc<dyn Fn(Option<&Session>) -> bool + Send + Sync>),
}

impl OperationRule {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&Session>) -> bool + Send + Sync + 'static,
    {
        OperationRule::Predicate(Arc::new(f))
    }

    pub fn allows(&self, session: Option<&Session>) -> bool {
        match self {
            OperationRule::Allow => true,
            OperationRule::Deny => false,
            OperationRule::Predicate(f) => f(session),
        }
    }
}

/// What a filter rule decided for the current session.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterDecision {
    /// Every row is visible.
    Allow,
    /// No row is visible; the result set is simply empty.
    Deny,
    /// Only rows matching the fragment are visible. The fragment is
    /// AND-combined with the caller's `where`.
    Filter(Filter),
}

/// Row-set narrowing predicate for query/update/delete. Non-matching rows do
/// not exist from the requester's viewpoint.
#[derive(Clone, Default)]
pub enum FilterRule {
    #[default]
    Allow,
    Deny,
    Predicate(Arc<dyn Fn(Option<&Session>) -> FilterDecision + Send + Sync>),
}

impl FilterRule {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&Session>) -> FilterDecision + Send + Sync + 'static,
    {
        FilterRule::Predicate(Arc::new(f))
    }

    pub fn decide(&self, session: Option<&Session>) -> FilterDecision {
        match self {
            FilterRule::Allow => FilterDecision::Allow,
            FilterRule::Deny => FilterDecision::Deny,
            FilterRule::Predicate(f) => f(session),
        }
    }
}

/// Per-row allow/deny for update/delete, evaluated after filter access has
/// narrowed the candidate set.
#[derive(Clone, Default)]
pub enum ItemRule {
    #[default]
    Allow,
    Deny,
    Predicate(Arc<dyn Fn(Option<&Session>, &Item) -> bool + Send + Sync>),
}

impl ItemRule {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&Session>, &Item) -> bool + Send + Sync + 'static,
    {
        ItemRule::Predicate(Arc::new(f))
    }

    pub fn allows(&self, session: Option<&Session>, item: &Item) -> bool {
        match self {
            ItemRule::Allow => true,
            ItemRule::Deny => false,
            ItemRule::Predicate(f) => f(session, item),
        }
    }
}

/// Per-column allow/deny. For reads the item is available; for creates it is
/// not (nothing exists yet).
#[derive(Clone, Default)]
pub enum FieldRule {
    #[default]
    Allow,
    Deny,
    Predicate(Arc<dyn Fn(Option<&Session>, Option<&Item>) -> bool + Send + Sync>),
}

impl FieldRule {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&Session>, Option<&Item>) -> bool + Send + Sync + 'static,
    {
        FieldRule::Predicate(Arc::new(f))
    }

    pub fn allows(&self, session: Option<&Session>, item: Option<&Item>) -> bool {
        match self {
            FieldRule::Allow => true,
            FieldRule::Deny => false,
            FieldRule::Predicate(f) => f(session, item),
        }
    }
}

macro_rules! impl_rule_debug {
    ($ty:ident) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $ty::Allow => write!(f, "Allow"),
                    $ty::Deny => write!(f, "Deny"),
                    $ty::Predicate(_) => write!(f, "Predicate(..)"),
                }
            }
        }
    };
}

impl_rule_debug!(OperationRule);
impl_rule_debug!(FilterRule);
impl_rule_debug!(ItemRule);
impl_rule_debug!(FieldRule);

/// Operation-level rules, one per CRUD verb. Unset rules default to allow.
#[derive(Debug, Clone, Default)]
pub struct OperationAccess {
    pub query: OperationRule,
    pub create: OperationRule,
    pub update: OperationRule,
    pub delete: OperationRule,
}

impl OperationAccess {
    pub fn rule(&self, op: Operation) -> &OperationRule {
        match op {
            Operation::Query => &self.query,
            Operation::Create => &self.create,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
        }
    }
}

/// Filter-level rules. Creates have no row set to narrow, so only the three
/// row-touching verbs appear here.
#[derive(Debug, Clone, Default)]
pub struct FilterAccess {
    pub query: FilterRule,
    pub update: FilterRule,
    pub delete: FilterRule,
}

impl FilterAccess {
    pub fn rule(&self, op: Operation) -> Option<&FilterRule> {
        match op {
            Operation::Query => Some(&self.query),
            Operation::Update => Some(&self.update),
            Operation::Delete => Some(&self.delete),
            Operation::Create => None,
        }
    }
}

/// Item-level rules for the mutating verbs that touch existing rows.
#[derive(Debug, Clone, Default)]
pub struct ItemAccess {
    pub update: ItemRule,
    pub delete: ItemRule,
}

impl ItemAccess {
    pub fn rule(&self, op: Operation) -> Option<&ItemRule> {
        match op {
            Operation::Update => Some(&self.update),
            Operation::Delete => Some(&self.delete),
            Operation::Query | Operation::Create => None,
        }
    }
}

/// How an item-access denial on a single-item operation is surfaced. The
/// default keeps denial indistinguishable from true absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemDenialShape {
    #[default]
    NotFound,
    AccessDenied,
}

/// The complete access policy of a list.
#[derive(Debug, Clone, Default)]
pub struct ListAccess {
    pub operation: OperationAccess,
    pub filter: FilterAccess,
    pub item: ItemAccess,
    /// Shape of single-item item-access denials.
    pub item_denial: ItemDenialShape,
    /// When true, a write to a field the session may not write fails the
    /// whole operation instead of being silently dropped.
    pub strict_field_writes: bool,
}

/// The access policy of a single field: read on output, create/update on
/// input. Unset rules default to allow.
#[derive(Debug, Clone, Default)]
pub struct FieldAccess {
    pub read: FieldRule,
    pub create: FieldRule,
    pub update: FieldRule,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(is_admin: bool) -> Session {
        Session {
            item_id: "u1".to_string(),
            list_key: "User".to_string(),
            data: json!({ "isAdmin": is_admin }),
        }
    }

    #[test]
    fn test_defaults_allow() {
        let access = ListAccess::default();
        assert!(access.operation.query.allows(None));
        assert!(access.operation.delete.allows(None));
        assert_eq!(access.filter.query.decide(None), FilterDecision::Allow);
    }

    #[test]
    fn test_operation_predicate() {
        let rule = OperationRule::predicate(|s| {
            s.is_some_and(|s| s.data["isAdmin"] == json!(true))
        });
        assert!(!rule.allows(None));
        assert!(!rule.allows(Some(&session(false))));
        assert!(rule.allows(Some(&session(true))));
    }

    #[test]
    fn test_filter_rule_returns_fragment() {
        let rule = FilterRule::predicate(|s| match s {
            Some(s) => FilterDecision::Filter(Filter::equals("author", s.item_id.clone())),
            None => FilterDecision::Deny,
        });
        assert_eq!(rule.decide(None), FilterDecision::Deny);
        match rule.decide(Some(&session(false))) {
            FilterDecision::Filter(f) => {
                assert!(f.matches(&json!({"author": "u1"}).as_object().unwrap().clone()));
            }
            other => panic!("expected filter fragment, got {:?}", other),
        }
    }

    #[test]
    fn test_item_rule_sees_the_row() {
        let rule = ItemRule::predicate(|s, item| {
            s.is_some_and(|s| item.get("owner") == Some(&json!(s.item_id)))
        });
        let mine = json!({"owner": "u1"}).as_object().unwrap().clone();
        let theirs = json!({"owner": "u2"}).as_object().unwrap().clone();
        assert!(rule.allows(Some(&session(false)), &mine));
        assert!(!rule.allows(Some(&session(false)), &theirs));
    }
}
