//! Write-side pipeline: create, update, delete and their batch forms.

use super::hooks::HookArgs;
use super::queries::locate_for_mutation;
use crate::access::Operation;
use crate::context::StrataContext;
use crate::db::Item;
use crate::error::{Result, StrataError};
use crate::fields::FieldKind;
use crate::query::UniqueWhere;
use crate::schema::{Field, List};
use serde_json::Value;
use tracing::{error, trace};

fn check_operation(ctx: &StrataContext, list: &List, op: Operation) -> Result<()> {
    if ctx.is_sudo() || list.access.operation.rule(op).allows(ctx.session()) {
        Ok(())
    } else {
        trace!(list = %list.key, op = op.as_str(), "operation access denied");
        Err(StrataError::AccessDenied)
    }
}

/// Resolves raw input into a persistable item: write-access filtering,
/// defaults (create only), relationship connects, kind transforms, and
/// field validation rules.
async fn resolve_input(
    ctx: &StrataContext,
    list: &List,
    op: Operation,
    input: &Value,
    existing: Option<&Item>,
) -> Result<Item> {
    let input = input.as_object().ok_or_else(|| {
        StrataError::Validation(format!("{}: input data must be an object", list.key))
    })?;

    for key in input.keys() {
        if !list.fields.contains_key(key) {
            return Err(StrataError::Validation(format!(
                "{}: unknown field '{}' in input",
                list.key, key
            )));
        }
    }

    let mut resolved = Item::new();
    for (name, field) in &list.fields {
        let mut supplied = input.get(name);

        // A denied write is silently dropped so the caller cannot probe
        // which fields exist; strict mode surfaces the denial instead. A
        // dropped field behaves exactly as if it had never been supplied,
        // so create defaults still apply to it.
        if supplied.is_some() && !ctx.is_sudo() {
            let rule = match op {
                Operation::Create => &field.access.create,
                _ => &field.access.update,
            };
            if !rule.allows(ctx.session(), existing) {
                if list.access.strict_field_writes {
                    return Err(StrataError::AccessDenied);
                }
                trace!(list = %list.key, field = %name, "dropped write to denied field");
                supplied = None;
            }
        }

        let value = match supplied {
            Some(v) => Some(v.clone()),
            None if op == Operation::Create => field.default_value.clone(),
            None => None,
        };

        // Validation sees the post-default, pre-transform value. On update,
        // untouched fields are not re-validated.
        if op == Operation::Create || supplied.is_some() {
            field.validation.check(&list.key, name, value.as_ref())?;
        }

        let Some(value) = value else {
            continue;
        };

        let value = match &field.kind {
            FieldKind::Relationship { .. } => {
                resolve_relationship_input(ctx, list, field, value).await?
            }
            kind => kind.transform_input(&list.key, name, value)?,
        };
        resolved.insert(name.clone(), value);
    }

    Ok(resolved)
}

/// Resolves a relationship input (`{ connect: ... }` or null) to the stored
/// id representation. Connecting requires the target row to be visible to
/// the acting session, so relationships cannot be used to probe hidden rows.
async fn resolve_relationship_input(
    ctx: &StrataContext,
    list: &List,
    field: &Field,
    value: Value,
) -> Result<Value> {
    let FieldKind::Relationship { list: foreign_key, many } = &field.kind else {
        unreachable!("resolve_relationship_input called for non-relationship field");
    };
    if value.is_null() {
        return Ok(Value::Null);
    }

    let obj = value.as_object().ok_or_else(|| {
        StrataError::validation_field(&list.key, &field.name, "expected a relationship input object")
    })?;
    let connect = obj.get("connect").ok_or_else(|| {
        StrataError::validation_field(&list.key, &field.name, "expected a 'connect' key")
    })?;

    let foreign = ctx.list(foreign_key)?;

    if *many {
        let uniques = connect.as_array().ok_or_else(|| {
            StrataError::validation_field(&list.key, &field.name, "'connect' must be a list")
        })?;
        let mut ids = Vec::with_capacity(uniques.len());
        for unique in uniques {
            ids.push(Value::String(connect_one(ctx, &foreign, unique).await?));
        }
        Ok(Value::Array(ids))
    } else {
        Ok(Value::String(connect_one(ctx, &foreign, connect).await?))
    }
}

async fn connect_one(ctx: &StrataContext, foreign: &List, unique: &Value) -> Result<String> {
    let item = super::queries::find_one(ctx, foreign, unique)
        .await?
        .ok_or_else(|| {
            StrataError::NotFound(format!("{} to connect", foreign.key))
        })?;
    item.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StrataError::Persistence(format!("{}: item without id", foreign.key)))
}

/// Uniqueness pre-check for unique fields. Real backends enforce this with
/// constraints as well; checking here gives a field-scoped validation error
/// instead of an opaque persistence failure.
async fn check_uniques(
    ctx: &StrataContext,
    list: &List,
    data: &Item,
    exclude_id: Option<&str>,
) -> Result<()> {
    for (name, field) in &list.fields {
        if !field.is_unique {
            continue;
        }
        let Some(value) = data.get(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let existing = ctx
            .database()
            .find_unique(
                &list.key,
                &UniqueWhere {
                    field: name.clone(),
                    value: value.clone(),
                },
            )
            .await?;
        if let Some(existing) = existing
            && existing.get("id").and_then(Value::as_str) != exclude_id
        {
            return Err(StrataError::validation_field(
                &list.key,
                name,
                "must be unique",
            ));
        }
    }
    Ok(())
}

async fn run_resolve_input_hook(
    ctx: &StrataContext,
    list: &List,
    op: Operation,
    data: Item,
    item: Option<&Item>,
) -> Result<Item> {
    match &list.hooks.resolve_input {
        Some(hook) => {
            let args = HookArgs {
                operation: op,
                list_key: list.key.clone(),
                item: item.cloned(),
                input: Some(data),
            };
            hook(ctx.clone(), args).await
        }
        None => Ok(data),
    }
}

async fn run_unit_hook(
    hook: &Option<super::hooks::OperationHook>,
    ctx: &StrataContext,
    list: &List,
    op: Operation,
    item: Option<&Item>,
    input: Option<&Item>,
) -> Result<()> {
    if let Some(hook) = hook {
        let args = HookArgs {
            operation: op,
            list_key: list.key.clone(),
            item: item.cloned(),
            input: input.cloned(),
        };
        hook(ctx.clone(), args).await?;
    }
    Ok(())
}

async fn run_validate_input_hook(
    ctx: &StrataContext,
    list: &List,
    op: Operation,
    item: Option<&Item>,
    input: &Item,
) -> Result<()> {
    if let Some(hook) = &list.hooks.validate_input {
        let args = HookArgs {
            operation: op,
            list_key: list.key.clone(),
            item: item.cloned(),
            input: Some(input.clone()),
        };
        hook(ctx.clone(), args).await?;
    }
    Ok(())
}

pub(crate) async fn create_one(ctx: &StrataContext, list: &List, data: &Value) -> Result<Item> {
    check_operation(ctx, list, Operation::Create)?;

    let resolved = resolve_input(ctx, list, Operation::Create, data, None).await?;
    let resolved = run_resolve_input_hook(ctx, list, Operation::Create, resolved, None).await?;
    run_validate_input_hook(ctx, list, Operation::Create, None, &resolved).await?;
    check_uniques(ctx, list, &resolved, None).await?;
    run_unit_hook(
        &list.hooks.before_operation,
        ctx,
        list,
        Operation::Create,
        None,
        Some(&resolved),
    )
    .await?;

    let created = ctx.database().create(&list.key, resolved).await?;
    trace!(list = %list.key, id = created.get("id").and_then(|v| v.as_str()), "created item");

    run_unit_hook(
        &list.hooks.after_operation,
        ctx,
        list,
        Operation::Create,
        Some(&created),
        None,
    )
    .await?;
    Ok(created)
}

pub(crate) async fn update_one(
    ctx: &StrataContext,
    list: &List,
    where_unique: &Value,
    data: &Value,
) -> Result<Item> {
    check_operation(ctx, list, Operation::Update)?;

    let existing = locate_for_mutation(ctx, list, Operation::Update, where_unique).await?;
    let id = existing
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StrataError::Persistence(format!("{}: item without id", list.key)))?
        .to_string();

    let resolved = resolve_input(ctx, list, Operation::Update, data, Some(&existing)).await?;
    let resolved =
        run_resolve_input_hook(ctx, list, Operation::Update, resolved, Some(&existing)).await?;
    run_validate_input_hook(ctx, list, Operation::Update, Some(&existing), &resolved).await?;
    check_uniques(ctx, list, &resolved, Some(&id)).await?;
    run_unit_hook(
        &list.hooks.before_operation,
        ctx,
        list,
        Operation::Update,
        Some(&existing),
        Some(&resolved),
    )
    .await?;

    let updated = ctx.database().update(&list.key, &id, resolved).await?;

    run_unit_hook(
        &list.hooks.after_operation,
        ctx,
        list,
        Operation::Update,
        Some(&updated),
        None,
    )
    .await?;
    Ok(updated)
}

pub(crate) async fn delete_one(
    ctx: &StrataContext,
    list: &List,
    where_unique: &Value,
) -> Result<Item> {
    check_operation(ctx, list, Operation::Delete)?;

    let existing = locate_for_mutation(ctx, list, Operation::Delete, where_unique).await?;
    let id = existing
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| StrataError::Persistence(format!("{}: item without id", list.key)))?
        .to_string();

    run_unit_hook(
        &list.hooks.before_operation,
        ctx,
        list,
        Operation::Delete,
        Some(&existing),
        None,
    )
    .await?;

    let deleted = ctx.database().delete(&list.key, &id).await?;

    run_unit_hook(
        &list.hooks.after_operation,
        ctx,
        list,
        Operation::Delete,
        Some(&deleted),
        None,
    )
    .await?;
    Ok(deleted)
}

/// Runs a batch of per-item operations. Plain lists collect per-item
/// results; atomic lists wrap the batch in one transaction and fail as a
/// whole, rolling back on every error path including hook failures.
async fn run_batch<F>(ctx: &StrataContext, list: &List, items: Vec<F>) -> Result<Vec<Result<Item>>>
where
    F: Future<Output = Result<Item>>,
{
    if !list.atomic_batches {
        let mut results = Vec::with_capacity(items.len());
        for fut in items {
            results.push(fut.await);
        }
        return Ok(results);
    }

    ctx.database().begin().await?;
    let mut results = Vec::with_capacity(items.len());
    for fut in items {
        match fut.await {
            Ok(item) => results.push(Ok(item)),
            Err(e) => {
                // the item error is the one the caller needs; a rollback
                // failure on top of it is logged, not returned
                if let Err(rollback) = ctx.database().rollback().await {
                    error!(list = %list.key, error = %rollback, "rollback failed after batch error");
                }
                return Err(e);
            }
        }
    }
    ctx.database().commit().await?;
    Ok(results)
}

pub(crate) async fn create_many(
    ctx: &StrataContext,
    list: &List,
    data: &[Value],
) -> Result<Vec<Result<Item>>> {
    check_operation(ctx, list, Operation::Create)?;
    let futures = data.iter().map(|d| create_one(ctx, list, d)).collect();
    run_batch(ctx, list, futures).await
}

pub(crate) async fn update_many(
    ctx: &StrataContext,
    list: &List,
    updates: &[Value],
) -> Result<Vec<Result<Item>>> {
    check_operation(ctx, list, Operation::Update)?;
    let mut futures = Vec::with_capacity(updates.len());
    for entry in updates {
        futures.push(update_many_entry(ctx, list, entry));
    }
    run_batch(ctx, list, futures).await
}

async fn update_many_entry(ctx: &StrataContext, list: &List, entry: &Value) -> Result<Item> {
    let obj = entry.as_object().ok_or_else(|| {
        StrataError::Validation(format!(
            "{}: updateMany entries must be {{ where, data }} objects",
            list.key
        ))
    })?;
    let where_unique = obj.get("where").ok_or_else(|| {
        StrataError::Validation(format!("{}: updateMany entry missing 'where'", list.key))
    })?;
    let data = obj.get("data").ok_or_else(|| {
        StrataError::Validation(format!("{}: updateMany entry missing 'data'", list.key))
    })?;
    update_one(ctx, list, where_unique, data).await
}

pub(crate) async fn delete_many(
    ctx: &StrataContext,
    list: &List,
    wheres: &[Value],
) -> Result<Vec<Result<Item>>> {
    check_operation(ctx, list, Operation::Delete)?;
    let futures = wheres.iter().map(|w| delete_one(ctx, list, w)).collect();
    run_batch(ctx, list, futures).await
}
