//! Builds the executable schema with `async_graphql::dynamic`.
//!
//! Shapes here mirror the SDL printer exactly. Root resolvers hand off to
//! the resolver pipeline; item values travel between resolvers as plain
//! GraphQL objects produced by the read mask, so a field the session may not
//! read resolves to `null`.

use crate::context::StrataContext;
use crate::db::Item;
use crate::error::{Result, StrataError};
use crate::fields::FieldKind;
use crate::resolve;
use crate::schema::{InitialisedSchema, List};
use async_graphql::Value;
use async_graphql::dynamic::{
    Enum, Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Scalar,
    Schema, TypeRef,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) fn build_executable_schema(schema: &Arc<InitialisedSchema>) -> Result<Schema> {
    let visible: Vec<&Arc<List>> = schema
        .lists
        .values()
        .filter(|l| !l.omit.everything_omitted())
        .collect();

    let has_query = visible.iter().any(|l| !l.omit.query);
    let has_mutation = visible
        .iter()
        .any(|l| !l.omit.create || !l.omit.update || !l.omit.delete);
    if !has_query {
        return Err(StrataError::Config(
            "GraphQL schema has no query fields; at least one list must expose 'query'".to_string(),
        ));
    }

    let mut builder = Schema::build("Query", has_mutation.then_some("Mutation"), None)
        .register(Scalar::new("DateTime"))
        .register(Enum::new("OrderDirection").item("asc").item("desc"));
    for input in shared_filter_inputs() {
        builder = builder.register(input);
    }

    for list in &visible {
        builder = builder.register(build_object(schema, list));
        builder = builder.register(build_where_input(list));
        builder = builder.register(build_unique_where_input(list));
        builder = builder.register(build_order_by_input(list));
        if !list.omit.create {
            builder = builder.register(build_data_input(schema, list, &list.gql.create_input));
        }
        if !list.omit.update {
            builder = builder.register(build_data_input(schema, list, &list.gql.update_input));
            builder = builder.register(
                InputObject::new(&list.gql.update_args)
                    .field(InputValue::new(
                        "where",
                        TypeRef::named_nn(&list.gql.unique_where_input),
                    ))
                    .field(InputValue::new(
                        "data",
                        TypeRef::named_nn(&list.gql.update_input),
                    )),
            );
        }
    }

    for (target, many) in referenced_relate_inputs(schema) {
        let unique = format!("{}WhereUniqueInput", target);
        builder = if many {
            builder.register(
                InputObject::new(format!("{}RelateToManyInput", target))
                    .field(InputValue::new("connect", TypeRef::named_nn_list(unique))),
            )
        } else {
            builder.register(
                InputObject::new(format!("{}RelateToOneInput", target))
                    .field(InputValue::new("connect", TypeRef::named(unique))),
            )
        };
    }

    let mut query = Object::new("Query");
    for list in &visible {
        if list.omit.query {
            continue;
        }
        query = query
            .field(find_one_field(list))
            .field(find_many_field(list))
            .field(count_field(list));
    }
    builder = builder.register(query);

    if has_mutation {
        let mut mutation = Object::new("Mutation");
        for list in &visible {
            if !list.omit.create {
                mutation = mutation.field(create_one_field(list)).field(create_many_field(list));
            }
            if !list.omit.update {
                mutation = mutation.field(update_one_field(list)).field(update_many_field(list));
            }
            if !list.omit.delete {
                mutation = mutation.field(delete_one_field(list)).field(delete_many_field(list));
            }
        }
        builder = builder.register(mutation);
    }

    builder
        .finish()
        .map_err(|e| StrataError::Graphql(e.to_string()))
}

/// True when the foreign end of a relationship is visible in GraphQL at all.
fn foreign_visible(schema: &InitialisedSchema, field: &crate::schema::Field) -> bool {
    field
        .foreign_list()
        .and_then(|key| schema.list(key))
        .is_some_and(|l| !l.omit.everything_omitted())
}

fn referenced_relate_inputs(schema: &InitialisedSchema) -> Vec<(String, bool)> {
    let mut seen = Vec::new();
    for list in schema.lists.values() {
        if list.omit.everything_omitted() || (list.omit.create && list.omit.update) {
            continue;
        }
        for field in list.fields.values() {
            if let FieldKind::Relationship { list: target, many } = &field.kind
                && foreign_visible(schema, field)
            {
                let entry = (target.clone(), *many);
                if !seen.contains(&entry) {
                    seen.push(entry);
                }
            }
        }
    }
    seen
}

fn shared_filter_inputs() -> Vec<InputObject> {
    fn filter(name: &str, scalar: &str, ordered: bool) -> InputObject {
        let mut input = InputObject::new(name)
            .field(InputValue::new("equals", TypeRef::named(scalar)))
            .field(InputValue::new("in", TypeRef::named_nn_list(scalar)));
        if ordered {
            for op in ["gt", "gte", "lt", "lte"] {
                input = input.field(InputValue::new(op, TypeRef::named(scalar)));
            }
        }
        if name == "StringFilter" {
            for op in ["contains", "startsWith", "endsWith"] {
                input = input.field(InputValue::new(op, TypeRef::named(scalar)));
            }
        }
        input
            .field(InputValue::new("not", TypeRef::named(scalar)))
            .field(InputValue::new("notIn", TypeRef::named_nn_list(scalar)))
    }

    vec![
        InputObject::new("BooleanFilter")
            .field(InputValue::new("equals", TypeRef::named(TypeRef::BOOLEAN)))
            .field(InputValue::new("not", TypeRef::named(TypeRef::BOOLEAN))),
        filter("DateTimeFilter", "DateTime", true),
        filter("FloatFilter", TypeRef::FLOAT, true),
        filter("IDFilter", TypeRef::ID, false),
        filter("IntFilter", TypeRef::INT, true),
        filter("StringFilter", TypeRef::STRING, true),
    ]
}

fn gql_err(e: StrataError) -> async_graphql::Error {
    async_graphql::Error::new(e.to_string())
}

fn lookup(ctx: &StrataContext, key: &str) -> async_graphql::Result<Arc<List>> {
    ctx.schema()
        .list(key)
        .cloned()
        .ok_or_else(|| async_graphql::Error::new(format!("Unknown list '{}'", key)))
}

/// Renders an item as a GraphQL object value with the read mask applied.
fn item_to_field_value(
    ctx: &StrataContext,
    list: &List,
    item: &Item,
) -> async_graphql::Result<FieldValue<'static>> {
    let masked = resolve::mask_item_with_nulls(ctx, list, item);
    let value = Value::from_json(serde_json::Value::Object(masked))
        .map_err(|e| async_graphql::Error::new(e.to_string()))?;
    Ok(FieldValue::value(value))
}

/// A failed batch slot, carried through the engine in place of an item.
///
/// `async_graphql::dynamic` renders a list element as `null` only when every
/// selected field of the element errors, so the item object's resolvers turn
/// this marker into a field error carrying the original failure.
struct BatchItemError(StrataError);

/// Reads a named key from the parent object value. Reports the carried
/// failure when the parent is a failed batch slot.
fn parent_field(ctx: &ResolverContext<'_>, name: &str) -> async_graphql::Result<Option<Value>> {
    if let Some(failed) = ctx.parent_value.downcast_ref::<BatchItemError>() {
        return Err(async_graphql::Error::new(failed.0.to_string()));
    }
    Ok(match ctx.parent_value.as_value() {
        Some(Value::Object(map)) => map.get(name).cloned(),
        _ => None,
    })
}

/// A named argument as JSON; explicit nulls read as absent.
fn arg_json(
    ctx: &ResolverContext<'_>,
    name: &str,
) -> async_graphql::Result<Option<serde_json::Value>> {
    match ctx.args.get(name) {
        Some(accessor) => {
            let value: serde_json::Value = accessor.deserialize()?;
            Ok(if value.is_null() { None } else { Some(value) })
        }
        None => Ok(None),
    }
}

fn required_arg_json(
    ctx: &ResolverContext<'_>,
    name: &str,
) -> async_graphql::Result<serde_json::Value> {
    Ok(ctx.args.try_get(name)?.deserialize()?)
}

fn strata_ctx(ctx: &ResolverContext<'_>) -> async_graphql::Result<StrataContext> {
    Ok(ctx.ctx.data::<StrataContext>()?.clone())
}

fn build_object(schema: &InitialisedSchema, list: &Arc<List>) -> Object {
    let mut object = Object::new(&list.gql.type_name).field(Field::new(
        "id",
        TypeRef::named_nn(TypeRef::ID),
        |ctx| FieldFuture::new(async move { Ok(parent_field(&ctx, "id")?.map(FieldValue::value)) }),
    ));

    for field in list.fields.values() {
        match &field.kind {
            FieldKind::Relationship { list: target, many } => {
                if !foreign_visible(schema, field) {
                    continue;
                }
                object = object.field(if *many {
                    to_many_field(field.name.clone(), target.clone())
                } else {
                    to_one_field(field.name.clone(), target.clone())
                });
            }
            kind => {
                if let Some(scalar) = kind.graphql_output() {
                    let name = field.name.clone();
                    object = object.field(Field::new(
                        &field.name,
                        TypeRef::named(scalar),
                        move |ctx| {
                            let name = name.clone();
                            FieldFuture::new(async move {
                                Ok(parent_field(&ctx, &name)?.map(FieldValue::value))
                            })
                        },
                    ));
                }
            }
        }
    }
    object
}

/// To-one relationship: the stored value is the foreign id; traversal runs a
/// findOne on the foreign list under the same context, so foreign access
/// rules apply.
fn to_one_field(name: String, target: String) -> Field {
    Field::new(name.clone(), TypeRef::named(target.clone()), move |ctx| {
        let name = name.clone();
        let target = target.clone();
        FieldFuture::new(async move {
            let strata = strata_ctx(&ctx)?;
            let Some(Value::String(id)) = parent_field(&ctx, &name)? else {
                return Ok(None);
            };
            let foreign = lookup(&strata, &target)?;
            match resolve::find_one(&strata, &foreign, &json!({ "id": id }))
                .await
                .map_err(gql_err)?
            {
                Some(item) => Ok(Some(item_to_field_value(&strata, &foreign, &item)?)),
                None => Ok(None),
            }
        })
    })
}

/// To-many relationship: the stored value is a list of foreign ids, resolved
/// in stored order. Ids the session may not see are absent, not errors.
fn to_many_field(name: String, target: String) -> Field {
    Field::new(name.clone(), TypeRef::named_nn_list(target.clone()), move |ctx| {
        let name = name.clone();
        let target = target.clone();
        FieldFuture::new(async move {
            let strata = strata_ctx(&ctx)?;
            let ids: Vec<String> = match parent_field(&ctx, &name)? {
                Some(Value::List(values)) => values
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
                _ => return Ok(None),
            };
            if ids.is_empty() {
                return Ok(Some(FieldValue::list(Vec::<FieldValue>::new())));
            }
            let foreign = lookup(&strata, &target)?;
            let where_json = json!({ "id": { "in": ids } });
            let items = resolve::find_many(&strata, &foreign, Some(&where_json), None, None, 0)
                .await
                .map_err(gql_err)?;

            let mut by_id: HashMap<String, Item> = items
                .into_iter()
                .filter_map(|item| {
                    item.get("id")
                        .and_then(|v| v.as_str())
                        .map(|id| (id.to_string(), item.clone()))
                })
                .collect();
            let values = ids
                .iter()
                .filter_map(|id| by_id.remove(id))
                .map(|item| item_to_field_value(&strata, &foreign, &item))
                .collect::<async_graphql::Result<Vec<_>>>()?;
            Ok(Some(FieldValue::list(values)))
        })
    })
}

fn build_where_input(list: &List) -> InputObject {
    let name = &list.gql.where_input;
    let mut input = InputObject::new(name)
        .field(InputValue::new("AND", TypeRef::named_nn_list(name)))
        .field(InputValue::new("OR", TypeRef::named_nn_list(name)))
        .field(InputValue::new("NOT", TypeRef::named(name)))
        .field(InputValue::new("id", TypeRef::named("IDFilter")));
    for field in list.fields.values() {
        if !field.is_filterable {
            continue;
        }
        if let Some(filter) = field.kind.filter_input() {
            input = input.field(InputValue::new(&field.name, TypeRef::named(filter)));
        }
    }
    input
}

fn build_unique_where_input(list: &List) -> InputObject {
    let mut input = InputObject::new(&list.gql.unique_where_input)
        .field(InputValue::new("id", TypeRef::named(TypeRef::ID)));
    for field in list.fields.values() {
        if !field.is_unique {
            continue;
        }
        if let Some(scalar) = field.kind.graphql_output() {
            input = input.field(InputValue::new(&field.name, TypeRef::named(scalar)));
        }
    }
    input
}

fn build_order_by_input(list: &List) -> InputObject {
    let mut input = InputObject::new(&list.gql.order_by_input)
        .field(InputValue::new("id", TypeRef::named("OrderDirection")));
    for field in list.fields.values() {
        if field.is_orderable && field.kind.graphql_output().is_some() {
            input = input.field(InputValue::new(&field.name, TypeRef::named("OrderDirection")));
        }
    }
    input
}

fn build_data_input(schema: &InitialisedSchema, list: &List, name: &str) -> InputObject {
    let mut input = InputObject::new(name);
    for field in list.fields.values() {
        match &field.kind {
            FieldKind::Relationship { list: target, many } => {
                if !foreign_visible(schema, field) {
                    continue;
                }
                let suffix = if *many { "RelateToManyInput" } else { "RelateToOneInput" };
                input = input.field(InputValue::new(
                    &field.name,
                    TypeRef::named(format!("{}{}", target, suffix)),
                ));
            }
            kind => {
                if let Some(scalar) = kind.graphql_input() {
                    input = input.field(InputValue::new(&field.name, TypeRef::named(scalar)));
                }
            }
        }
    }
    input
}

fn find_one_field(list: &Arc<List>) -> Field {
    let key = list.key.clone();
    Field::new(
        &list.gql.singular,
        TypeRef::named(&list.gql.type_name),
        move |ctx| {
            let key = key.clone();
            FieldFuture::new(async move {
                let strata = strata_ctx(&ctx)?;
                let list = lookup(&strata, &key)?;
                let where_unique = required_arg_json(&ctx, "where")?;
                match resolve::find_one(&strata, &list, &where_unique)
                    .await
                    .map_err(gql_err)?
                {
                    Some(item) => Ok(Some(item_to_field_value(&strata, &list, &item)?)),
                    None => Ok(None),
                }
            })
        },
    )
    .argument(InputValue::new(
        "where",
        TypeRef::named_nn(&list.gql.unique_where_input),
    ))
}

fn find_many_field(list: &Arc<List>) -> Field {
    let key = list.key.clone();
    Field::new(
        &list.gql.plural,
        TypeRef::named_nn_list(&list.gql.type_name),
        move |ctx| {
            let key = key.clone();
            FieldFuture::new(async move {
                let strata = strata_ctx(&ctx)?;
                let list = lookup(&strata, &key)?;
                let where_input = arg_json(&ctx, "where")?;
                let order_by = arg_json(&ctx, "orderBy")?;
                let take = arg_json(&ctx, "take")?
                    .and_then(|v| v.as_u64())
                    .map(|n| n as usize);
                let skip = arg_json(&ctx, "skip")?.and_then(|v| v.as_u64()).unwrap_or(0) as usize;

                let items = resolve::find_many(
                    &strata,
                    &list,
                    where_input.as_ref(),
                    order_by.as_ref(),
                    take,
                    skip,
                )
                .await
                .map_err(gql_err)?;
                let values = items
                    .iter()
                    .map(|item| item_to_field_value(&strata, &list, item))
                    .collect::<async_graphql::Result<Vec<_>>>()?;
                Ok(Some(FieldValue::list(values)))
            })
        },
    )
    .argument(InputValue::new("where", TypeRef::named(&list.gql.where_input)))
    .argument(InputValue::new(
        "orderBy",
        TypeRef::named_nn_list(&list.gql.order_by_input),
    ))
    .argument(InputValue::new("take", TypeRef::named(TypeRef::INT)))
    .argument(InputValue::new("skip", TypeRef::named(TypeRef::INT)))
}

fn count_field(list: &Arc<List>) -> Field {
    let key = list.key.clone();
    Field::new(&list.gql.count, TypeRef::named_nn(TypeRef::INT), move |ctx| {
        let key = key.clone();
        FieldFuture::new(async move {
            let strata = strata_ctx(&ctx)?;
            let list = lookup(&strata, &key)?;
            let where_input = arg_json(&ctx, "where")?;
            let n = resolve::count(&strata, &list, where_input.as_ref())
                .await
                .map_err(gql_err)?;
            Ok(Some(FieldValue::value(Value::from(n as i64))))
        })
    })
    .argument(InputValue::new("where", TypeRef::named(&list.gql.where_input)))
}

fn create_one_field(list: &Arc<List>) -> Field {
    let key = list.key.clone();
    Field::new(
        &list.gql.create_one,
        TypeRef::named(&list.gql.type_name),
        move |ctx| {
            let key = key.clone();
            FieldFuture::new(async move {
                let strata = strata_ctx(&ctx)?;
                let list = lookup(&strata, &key)?;
                let data = required_arg_json(&ctx, "data")?;
                let item = resolve::create_one(&strata, &list, &data)
                    .await
                    .map_err(gql_err)?;
                Ok(Some(item_to_field_value(&strata, &list, &item)?))
            })
        },
    )
    .argument(InputValue::new(
        "data",
        TypeRef::named_nn(&list.gql.create_input),
    ))
}

/// Batch results keep positional correspondence with the input: a failed
/// entry renders as `null` in the returned list, with the failure reported
/// in the response errors.
fn batch_values(
    ctx: &StrataContext,
    list: &List,
    results: Vec<Result<Item>>,
) -> async_graphql::Result<FieldValue<'static>> {
    let mut values = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(item) => values.push(item_to_field_value(ctx, list, &item)?),
            Err(e) => values.push(FieldValue::owned_any(BatchItemError(e))),
        }
    }
    Ok(FieldValue::list(values))
}

fn create_many_field(list: &Arc<List>) -> Field {
    let key = list.key.clone();
    Field::new(
        &list.gql.create_many,
        TypeRef::named_list(&list.gql.type_name),
        move |ctx| {
            let key = key.clone();
            FieldFuture::new(async move {
                let strata = strata_ctx(&ctx)?;
                let list = lookup(&strata, &key)?;
                let data: Vec<serde_json::Value> = ctx.args.try_get("data")?.deserialize()?;
                let results = resolve::create_many(&strata, &list, &data)
                    .await
                    .map_err(gql_err)?;
                Ok(Some(batch_values(&strata, &list, results)?))
            })
        },
    )
    .argument(InputValue::new(
        "data",
        TypeRef::named_nn_list_nn(&list.gql.create_input),
    ))
}

fn update_one_field(list: &Arc<List>) -> Field {
    let key = list.key.clone();
    Field::new(
        &list.gql.update_one,
        TypeRef::named(&list.gql.type_name),
        move |ctx| {
            let key = key.clone();
            FieldFuture::new(async move {
                let strata = strata_ctx(&ctx)?;
                let list = lookup(&strata, &key)?;
                let where_unique = required_arg_json(&ctx, "where")?;
                let data = required_arg_json(&ctx, "data")?;
                let item = resolve::update_one(&strata, &list, &where_unique, &data)
                    .await
                    .map_err(gql_err)?;
                Ok(Some(item_to_field_value(&strata, &list, &item)?))
            })
        },
    )
    .argument(InputValue::new(
        "where",
        TypeRef::named_nn(&list.gql.unique_where_input),
    ))
    .argument(InputValue::new(
        "data",
        TypeRef::named_nn(&list.gql.update_input),
    ))
}

fn update_many_field(list: &Arc<List>) -> Field {
    let key = list.key.clone();
    Field::new(
        &list.gql.update_many,
        TypeRef::named_list(&list.gql.type_name),
        move |ctx| {
            let key = key.clone();
            FieldFuture::new(async move {
                let strata = strata_ctx(&ctx)?;
                let list = lookup(&strata, &key)?;
                let updates: Vec<serde_json::Value> = ctx.args.try_get("data")?.deserialize()?;
                let results = resolve::update_many(&strata, &list, &updates)
                    .await
                    .map_err(gql_err)?;
                Ok(Some(batch_values(&strata, &list, results)?))
            })
        },
    )
    .argument(InputValue::new(
        "data",
        TypeRef::named_nn_list_nn(&list.gql.update_args),
    ))
}

fn delete_one_field(list: &Arc<List>) -> Field {
    let key = list.key.clone();
    Field::new(
        &list.gql.delete_one,
        TypeRef::named(&list.gql.type_name),
        move |ctx| {
            let key = key.clone();
            FieldFuture::new(async move {
                let strata = strata_ctx(&ctx)?;
                let list = lookup(&strata, &key)?;
                let where_unique = required_arg_json(&ctx, "where")?;
                let item = resolve::delete_one(&strata, &list, &where_unique)
                    .await
                    .map_err(gql_err)?;
                Ok(Some(item_to_field_value(&strata, &list, &item)?))
            })
        },
    )
    .argument(InputValue::new(
        "where",
        TypeRef::named_nn(&list.gql.unique_where_input),
    ))
}

fn delete_many_field(list: &Arc<List>) -> Field {
    let key = list.key.clone();
    Field::new(
        &list.gql.delete_many,
        TypeRef::named_list(&list.gql.type_name),
        move |ctx| {
            let key = key.clone();
            FieldFuture::new(async move {
                let strata = strata_ctx(&ctx)?;
                let list = lookup(&strata, &key)?;
                let wheres: Vec<serde_json::Value> = ctx.args.try_get("where")?.deserialize()?;
                let results = resolve::delete_many(&strata, &list, &wheres)
                    .await
                    .map_err(gql_err)?;
                Ok(Some(batch_values(&strata, &list, results)?))
            })
        },
    )
    .argument(InputValue::new(
        "where",
        TypeRef::named_nn_list_nn(&list.gql.unique_where_input),
    ))
}
