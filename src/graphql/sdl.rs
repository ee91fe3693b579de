//! The SDL printer: a pure, deterministic rendering of the initialised
//! schema. This is the text that lands in the committed GraphQL artifact, so
//! the same schema must always produce byte-identical output.

use crate::fields::FieldKind;
use crate::schema::{Field, InitialisedSchema, List};
use std::fmt::Write;

fn scalar_output(kind: &FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::Text | FieldKind::Select { .. } => Some("String"),
        FieldKind::Integer => Some("Int"),
        FieldKind::Float => Some("Float"),
        FieldKind::Checkbox => Some("Boolean"),
        FieldKind::Timestamp => Some("DateTime"),
        FieldKind::Password | FieldKind::Relationship { .. } => None,
    }
}

fn filter_input(kind: &FieldKind) -> Option<&'static str> {
    kind.filter_input()
}

/// True when the foreign end of a relationship is visible in GraphQL at all.
fn foreign_visible(schema: &InitialisedSchema, field: &Field) -> bool {
    field
        .foreign_list()
        .and_then(|key| schema.list(key))
        .is_some_and(|l| !l.omit.everything_omitted())
}

/// Relate-input types referenced anywhere in the schema, as
/// `(target type name, many)` pairs in first-reference order.
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

pub fn print_sdl(schema: &InitialisedSchema) -> String {
    let mut out = String::new();

    out.push_str("scalar DateTime\n\n");
    out.push_str("enum OrderDirection {\n  asc\n  desc\n}\n\n");
    print_shared_filters(&mut out);

    for list in schema.lists.values() {
        if list.omit.everything_omitted() {
            continue;
        }
        print_object_type(&mut out, schema, list);
        print_where_input(&mut out, list);
        print_unique_where_input(&mut out, list);
        print_order_by_input(&mut out, list);
        if !list.omit.create {
            print_data_input(&mut out, schema, list, &list.gql.create_input);
        }
        if !list.omit.update {
            print_data_input(&mut out, schema, list, &list.gql.update_input);
            let _ = write!(
                out,
                "input {} {{\n  where: {}!\n  data: {}!\n}}\n\n",
                list.gql.update_args, list.gql.unique_where_input, list.gql.update_input
            );
        }
    }

    for (target, many) in referenced_relate_inputs(schema) {
        let unique = format!("{}WhereUniqueInput", target);
        if many {
            let _ = write!(
                out,
                "input {}RelateToManyInput {{\n  connect: [{}!]\n}}\n\n",
                target, unique
            );
        } else {
            let _ = write!(
                out,
                "input {}RelateToOneInput {{\n  connect: {}\n}}\n\n",
                target, unique
            );
        }
    }

    print_query_type(&mut out, schema);
    print_mutation_type(&mut out, schema);

    // single trailing newline
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

fn print_shared_filters(out: &mut String) {
    let scalar_filters: &[(&str, &str, bool)] = &[
        ("BooleanFilter", "Boolean", false),
        ("DateTimeFilter", "DateTime", true),
        ("FloatFilter", "Float", true),
        ("IDFilter", "ID", false),
        ("IntFilter", "Int", true),
        ("StringFilter", "String", true),
    ];
    for (name, scalar, ordered) in scalar_filters {
        let _ = write!(out, "input {} {{\n", name);
        let _ = write!(out, "  equals: {}\n", scalar);
        if *name != "BooleanFilter" {
            let _ = write!(out, "  in: [{}!]\n", scalar);
        }
        if *ordered {
            let _ = write!(out, "  gt: {}\n", scalar);
            let _ = write!(out, "  gte: {}\n", scalar);
            let _ = write!(out, "  lt: {}\n", scalar);
            let _ = write!(out, "  lte: {}\n", scalar);
        }
        if *name == "StringFilter" {
            out.push_str("  contains: String\n");
            out.push_str("  startsWith: String\n");
            out.push_str("  endsWith: String\n");
        }
        let _ = write!(out, "  not: {}\n", scalar);
        if *name != "BooleanFilter" {
            let _ = write!(out, "  notIn: [{}!]\n", scalar);
        }
        out.push_str("}\n\n");
    }
}

fn print_object_type(out: &mut String, schema: &InitialisedSchema, list: &List) {
    let _ = write!(out, "type {} {{\n", list.gql.type_name);
    out.push_str("  id: ID!\n");
    for field in list.fields.values() {
        match &field.kind {
            FieldKind::Relationship { list: target, many } => {
                if !foreign_visible(schema, field) {
                    continue;
                }
                if *many {
                    let _ = write!(out, "  {}: [{}!]\n", field.name, target);
                } else {
                    let _ = write!(out, "  {}: {}\n", field.name, target);
                }
            }
            kind => {
                if let Some(scalar) = scalar_output(kind) {
                    let _ = write!(out, "  {}: {}\n", field.name, scalar);
                }
            }
        }
    }
    out.push_str("}\n\n");
}

fn print_where_input(out: &mut String, list: &List) {
    let _ = write!(out, "input {} {{\n", list.gql.where_input);
    let _ = write!(out, "  AND: [{}!]\n", list.gql.where_input);
    let _ = write!(out, "  OR: [{}!]\n", list.gql.where_input);
    let _ = write!(out, "  NOT: {}\n", list.gql.where_input);
    out.push_str("  id: IDFilter\n");
    for field in list.fields.values() {
        if !field.is_filterable {
            continue;
        }
        if let Some(filter) = filter_input(&field.kind) {
            let _ = write!(out, "  {}: {}\n", field.name, filter);
        }
    }
    out.push_str("}\n\n");
}

fn print_unique_where_input(out: &mut String, list: &List) {
    let _ = write!(out, "input {} {{\n", list.gql.unique_where_input);
    out.push_str("  id: ID\n");
    for field in list.fields.values() {
        if !field.is_unique {
            continue;
        }
        if let Some(scalar) = scalar_output(&field.kind) {
            let _ = write!(out, "  {}: {}\n", field.name, scalar);
        }
    }
    out.push_str("}\n\n");
}

fn print_order_by_input(out: &mut String, list: &List) {
    let _ = write!(out, "input {} {{\n", list.gql.order_by_input);
    out.push_str("  id: OrderDirection\n");
    for field in list.fields.values() {
        if field.is_orderable && scalar_output(&field.kind).is_some() {
            let _ = write!(out, "  {}: OrderDirection\n", field.name);
        }
    }
    out.push_str("}\n\n");
}

fn print_data_input(out: &mut String, schema: &InitialisedSchema, list: &List, name: &str) {
    let _ = write!(out, "input {} {{\n", name);
    for field in list.fields.values() {
        match &field.kind {
            FieldKind::Relationship { list: target, many } => {
                if !foreign_visible(schema, field) {
                    continue;
                }
                let suffix = if *many { "RelateToManyInput" } else { "RelateToOneInput" };
                let _ = write!(out, "  {}: {}{}\n", field.name, target, suffix);
            }
            kind => {
                if let Some(scalar) = kind.graphql_input() {
                    let _ = write!(out, "  {}: {}\n", field.name, scalar);
                }
            }
        }
    }
    out.push_str("}\n\n");
}

fn print_query_type(out: &mut String, schema: &InitialisedSchema) {
    let mut body = String::new();
    for list in schema.lists.values() {
        if list.omit.everything_omitted() || list.omit.query {
            continue;
        }
        let g = &list.gql;
        let _ = write!(
            body,
            "  {}(where: {}!): {}\n",
            g.singular, g.unique_where_input, g.type_name
        );
        let _ = write!(
            body,
            "  {}(where: {}, orderBy: [{}!], take: Int, skip: Int): [{}!]\n",
            g.plural, g.where_input, g.order_by_input, g.type_name
        );
        let _ = write!(body, "  {}(where: {}): Int!\n", g.count, g.where_input);
    }
    if !body.is_empty() {
        let _ = write!(out, "type Query {{\n{}}}\n\n", body);
    }
}

fn print_mutation_type(out: &mut String, schema: &InitialisedSchema) {
    let mut body = String::new();
    for list in schema.lists.values() {
        if list.omit.everything_omitted() {
            continue;
        }
        let g = &list.gql;
        if !list.omit.create {
            let _ = write!(body, "  {}(data: {}!): {}\n", g.create_one, g.create_input, g.type_name);
            let _ = write!(
                body,
                "  {}(data: [{}!]!): [{}]\n",
                g.create_many, g.create_input, g.type_name
            );
        }
        if !list.omit.update {
            let _ = write!(
                body,
                "  {}(where: {}!, data: {}!): {}\n",
                g.update_one, g.unique_where_input, g.update_input, g.type_name
            );
            let _ = write!(
                body,
                "  {}(data: [{}!]!): [{}]\n",
                g.update_many, g.update_args, g.type_name
            );
        }
        if !list.omit.delete {
            let _ = write!(
                body,
                "  {}(where: {}!): {}\n",
                g.delete_one, g.unique_where_input, g.type_name
            );
            let _ = write!(
                body,
                "  {}(where: [{}!]!): [{}]\n",
                g.delete_many, g.unique_where_input, g.type_name
            );
        }
    }
    if !body.is_empty() {
        let _ = write!(out, "type Mutation {{\n{}}}\n\n", body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;
    use crate::schema::{FieldConfig, ListConfig, ListGraphqlConfig, OmitConfig, initialise};
    use indexmap::IndexMap;

    fn sample_schema() -> InitialisedSchema {
        let mut lists = IndexMap::new();
        lists.insert(
            "User".to_string(),
            ListConfig::new()
                .field("name", FieldConfig::text())
                .field("email", FieldConfig::text().unique())
                .field("password", FieldConfig::password()),
        );
        lists.insert(
            "Post".to_string(),
            ListConfig::new()
                .field("title", FieldConfig::text())
                .field("author", FieldConfig::relationship("User")),
        );
        initialise(&StrataConfig::default(), lists).unwrap()
    }

    #[test]
    fn test_sdl_contains_crud_surface() {
        let sdl = print_sdl(&sample_schema());
        assert!(sdl.contains("type User {"));
        assert!(sdl.contains("input UserCreateInput {"));
        assert!(sdl.contains("input UserWhereUniqueInput {"));
        assert!(sdl.contains("user(where: UserWhereUniqueInput!): User"));
        assert!(sdl.contains("userCount(where: UserWhereInput): Int!"));
        assert!(sdl.contains("createUsers(data: [UserCreateInput!]!): [User]"));
        assert!(sdl.contains("deleteUser(where: UserWhereUniqueInput!): User"));
        assert!(sdl.contains("author: UserRelateToOneInput"));
    }

    #[test]
    fn test_password_never_appears_in_output_type() {
        let sdl = print_sdl(&sample_schema());
        let object = sdl
            .split("type User {")
            .nth(1)
            .unwrap()
            .split('}')
            .next()
            .unwrap();
        assert!(!object.contains("password"));
        // it is still writable
        assert!(sdl.contains("input UserCreateInput"));
        let create = sdl
            .split("input UserCreateInput {")
            .nth(1)
            .unwrap()
            .split('}')
            .next()
            .unwrap();
        assert!(create.contains("password: String"));
    }

    #[test]
    fn test_unique_field_in_unique_where() {
        let sdl = print_sdl(&sample_schema());
        let unique = sdl
            .split("input UserWhereUniqueInput {")
            .nth(1)
            .unwrap()
            .split('}')
            .next()
            .unwrap();
        assert!(unique.contains("email: String"));
        assert!(!unique.contains("name"));
    }

    #[test]
    fn test_omit_removes_operations() {
        let mut lists = IndexMap::new();
        lists.insert(
            "User".to_string(),
            ListConfig::new().field("name", FieldConfig::text()).with_graphql(
                ListGraphqlConfig::default().omit(OmitConfig {
                    create: true,
                    delete: true,
                    ..Default::default()
                }),
            ),
        );
        let sdl = print_sdl(&initialise(&StrataConfig::default(), lists).unwrap());
        assert!(sdl.contains("users(where:"));
        assert!(sdl.contains("updateUser(where:"));
        assert!(!sdl.contains("createUser("));
        assert!(!sdl.contains("deleteUser("));
        assert!(!sdl.contains("UserCreateInput"));
    }

    #[test]
    fn test_print_is_deterministic() {
        let a = print_sdl(&sample_schema());
        let b = print_sdl(&sample_schema());
        assert_eq!(a, b);
    }
}
