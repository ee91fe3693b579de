//! Read-side pipeline: findOne, findMany, count.

use crate::access::{FilterDecision, ItemDenialShape, Operation};
use crate::context::StrataContext;
use crate::db::Item;
use crate::error::{Result, StrataError};
use crate::query::{self, Filter, QueryArgs};
use crate::schema::List;
use serde_json::Value;
use tracing::trace;

/// Resolves the effective filter for an operation: the access fragment
/// AND-combined with the caller's `where`. `None` in the outer `Option`
/// means the whole row set is invisible (filter-level denial).
fn effective_filter(
    ctx: &StrataContext,
    list: &List,
    op: Operation,
    caller_where: Option<&Value>,
) -> Result<Option<Option<Filter>>> {
    let caller = match caller_where {
        Some(v) => Some(query::parse_where(list, v)?),
        None => None,
    };
    if ctx.is_sudo() {
        return Ok(Some(caller));
    }
    let decision = match list.access.filter.rule(op) {
        Some(rule) => rule.decide(ctx.session()),
        None => FilterDecision::Allow,
    };
    Ok(match decision {
        FilterDecision::Allow => Some(caller),
        FilterDecision::Deny => None,
        FilterDecision::Filter(fragment) => Some(Filter::merge(caller, Some(fragment))),
    })
}

fn check_operation(ctx: &StrataContext, list: &List, op: Operation) -> Result<()> {
    if ctx.is_sudo() {
        return Ok(());
    }
    if list.access.operation.rule(op).allows(ctx.session()) {
        Ok(())
    } else {
        trace!(list = %list.key, op = op.as_str(), "operation access denied");
        Err(StrataError::AccessDenied)
    }
}

pub(crate) async fn find_one(
    ctx: &StrataContext,
    list: &List,
    where_unique: &Value,
) -> Result<Option<Item>> {
    check_operation(ctx, list, Operation::Query)?;
    let unique = query::parse_unique_where(list, where_unique)?;

    let Some(filter) = effective_filter(ctx, list, Operation::Query, None)? else {
        return Ok(None);
    };

    let item = ctx.database().find_unique(&list.key, &unique).await?;
    Ok(item.filter(|item| filter.as_ref().is_none_or(|f| f.matches(item))))
}

pub(crate) async fn find_many(
    ctx: &StrataContext,
    list: &List,
    where_input: Option<&Value>,
    order_by: Option<&Value>,
    take: Option<usize>,
    skip: usize,
) -> Result<Vec<Item>> {
    check_operation(ctx, list, Operation::Query)?;

    // The take ceiling is enforced before the database is ever consulted.
    if let Some(requested) = take
        && requested > list.max_take
    {
        return Err(StrataError::LimitExceeded {
            max: list.max_take,
            requested,
        });
    }

    let order_by = match order_by {
        Some(v) => query::parse_order_by(list, v)?,
        None => Vec::new(),
    };

    let Some(filter) = effective_filter(ctx, list, Operation::Query, where_input)? else {
        return Ok(Vec::new());
    };

    // Without an explicit take, fetch one row past the ceiling so an
    // over-limit result set is detected instead of silently truncated.
    let probe = take.unwrap_or(list.max_take + 1);
    let args = QueryArgs {
        filter,
        order_by,
        take: Some(probe),
        skip,
    };
    let items = ctx.database().find_many(&list.key, &args).await?;
    if take.is_none() && items.len() > list.max_take {
        return Err(StrataError::LimitExceeded {
            max: list.max_take,
            requested: items.len(),
        });
    }
    Ok(items)
}

pub(crate) async fn count(
    ctx: &StrataContext,
    list: &List,
    where_input: Option<&Value>,
) -> Result<usize> {
    check_operation(ctx, list, Operation::Query)?;
    let Some(filter) = effective_filter(ctx, list, Operation::Query, where_input)? else {
        return Ok(0);
    };
    ctx.database().count(&list.key, filter.as_ref()).await
}

/// Locates the target row of a single-item update/delete, applying filter
/// and item access. A row that is invisible or item-denied surfaces per the
/// list's configured denial shape (not-found by default, so denial and
/// absence are indistinguishable).
pub(crate) async fn locate_for_mutation(
    ctx: &StrataContext,
    list: &List,
    op: Operation,
    where_unique: &Value,
) -> Result<Item> {
    let unique = query::parse_unique_where(list, where_unique)?;
    let not_found =
        || StrataError::NotFound(format!("{} matching {}", list.key, summarize(&unique.field)));

    let Some(filter) = effective_filter(ctx, list, op, None)? else {
        return Err(not_found());
    };

    let item = ctx
        .database()
        .find_unique(&list.key, &unique)
        .await?
        .filter(|item| filter.as_ref().is_none_or(|f| f.matches(item)))
        .ok_or_else(not_found)?;

    if !ctx.is_sudo()
        && let Some(rule) = list.access.item.rule(op)
        && !rule.allows(ctx.session(), &item)
    {
        return Err(match list.access.item_denial {
            ItemDenialShape::NotFound => not_found(),
            ItemDenialShape::AccessDenied => StrataError::AccessDenied,
        });
    }

    Ok(item)
}

fn summarize(field: &str) -> String {
    format!("unique field '{}'", field)
}
