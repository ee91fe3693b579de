//! The resolver pipeline.
//!
//! Every CRUD operation flows through the same stages: shape validation and
//! field input transforms, resolve_input and validate_input hooks, the
//! access-control evaluation, persistence through the database collaborator,
//! the after_operation hook, and (on the masked surfaces) field-level read
//! masking. Batch operations run the full pipeline per item and report
//! per-item results unless the list opts into atomic batches.

mod hooks;
mod mutations;
mod queries;

pub use hooks::{HookArgs, HookFuture, ListHooks, OperationHook, ResolveInputHook, ValidateInputHook};
pub(crate) use mutations::{create_many, create_one, delete_many, delete_one, update_many, update_one};
pub(crate) use queries::{count, find_many, find_one, locate_for_mutation};

use crate::context::StrataContext;
use crate::db::Item;
use crate::schema::List;
use serde_json::Value;

/// Applies field-level read masking: fields whose read rule denies are
/// absent from the result, indistinguishable from fields that do not exist.
/// `id` always survives. Sudo contexts skip masking entirely.
pub(crate) fn mask_item(ctx: &StrataContext, list: &List, item: &Item) -> Item {
    if ctx.is_sudo() {
        return item.clone();
    }
    let session = ctx.session();
    let mut masked = Item::new();
    if let Some(id) = item.get("id") {
        masked.insert("id".to_string(), id.clone());
    }
    for (name, field) in &list.fields {
        let Some(value) = item.get(name) else {
            continue;
        };
        if field.access.read.allows(session, Some(item)) {
            masked.insert(name.clone(), value.clone());
        }
    }
    masked
}

/// Like [`mask_item`], but returns denied fields as explicit nulls. The
/// GraphQL layer uses this so a denied field reads as `null` instead of
/// producing a missing-field execution error.
pub(crate) fn mask_item_with_nulls(ctx: &StrataContext, list: &List, item: &Item) -> Item {
    let mut masked = mask_item(ctx, list, item);
    for name in list.fields.keys() {
        masked.entry(name.clone()).or_insert(Value::Null);
    }
    masked
}
