//! The relational schema printer: a pure, deterministic rendering of the
//! initialised schema as a textual relational model. Like the SDL printer,
//! this text is committed as an artifact, so the same schema must always
//! produce byte-identical output.
//!
//! Every list gets a table, including GraphQL-omitted ones: omission is an
//! API concern, not a storage concern. To-one relationships become foreign
//! key columns; to-many relationships become join tables, printed after all
//! list tables and ordered by name.

use crate::fields::FieldKind;
use crate::schema::{InitialisedSchema, List};
use serde_json::Value;
use std::fmt::Write;

pub fn print_relational(schema: &InitialisedSchema) -> String {
    let mut out = String::new();

    for list in schema.lists.values() {
        print_table(&mut out, list);
    }

    let mut joins = Vec::new();
    for list in schema.lists.values() {
        for field in list.fields.values() {
            if let FieldKind::Relationship { list: target, many: true } = &field.kind {
                joins.push(join_table(list, &field.name, target));
            }
        }
    }
    joins.sort();
    for join in joins {
        out.push_str(&join);
    }

    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

fn print_table(out: &mut String, list: &List) {
    let _ = write!(out, "table {} {{\n", list.key);
    out.push_str("  id text @id\n");
    for field in list.fields.values() {
        match &field.kind {
            FieldKind::Relationship { many: true, .. } => continue,
            FieldKind::Relationship { list: target, many: false } => {
                let _ = write!(out, "  {} text @references({}.id)", field.name, target);
            }
            kind => {
                // scalar kinds always have a column
                let column = kind.column().map(|c| c.column_type).unwrap_or("text");
                let _ = write!(out, "  {} {}", field.name, column);
            }
        }
        if field.is_unique {
            out.push_str(" @unique");
        }
        if field.is_indexed {
            out.push_str(" @index");
        }
        if let Some(default) = &field.default_value {
            let _ = write!(out, " @default({})", render_default(default));
        }
        out.push('\n');
    }
    out.push_str("}\n\n");
}

fn join_table(list: &List, field: &str, target: &str) -> String {
    let mut out = String::new();
    let _ = write!(out, "table {}_{} {{\n", list.key, field);
    let _ = write!(out, "  {}_id text @references({}.id)\n", lower(&list.key), list.key);
    let _ = write!(out, "  {}_id text @references({}.id)\n", lower(target), target);
    let _ = write!(out, "  @unique({}_id, {}_id)\n", lower(&list.key), lower(target));
    out.push_str("}\n\n");
    out
}

fn render_default(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}

fn lower(s: &str) -> String {
    s.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;
    use crate::schema::{FieldConfig, ListConfig, ListGraphqlConfig, OmitConfig, initialise};
    use indexmap::IndexMap;

    fn sample() -> InitialisedSchema {
        let mut lists = IndexMap::new();
        lists.insert(
            "User".to_string(),
            ListConfig::new()
                .field("name", FieldConfig::text())
                .field("email", FieldConfig::text().unique())
                .field("isAdmin", FieldConfig::checkbox().with_default(false)),
        );
        lists.insert(
            "Post".to_string(),
            ListConfig::new()
                .field("title", FieldConfig::text().indexed())
                .field("views", FieldConfig::integer())
                .field("author", FieldConfig::relationship("User"))
                .field("tags", FieldConfig::relationship_many("Tag")),
        );
        lists.insert(
            "Tag".to_string(),
            ListConfig::new().field("label", FieldConfig::text()),
        );
        initialise(&StrataConfig::default(), lists).unwrap()
    }

    #[test]
    fn test_tables_and_columns() {
        let text = print_relational(&sample());
        assert!(text.contains("table User {"));
        assert!(text.contains("  id text @id"));
        assert!(text.contains("  email text @unique"));
        assert!(text.contains("  title text @index"));
        assert!(text.contains("  views integer"));
        assert!(text.contains("  isAdmin boolean @default(false)"));
    }

    #[test]
    fn test_foreign_key_and_join_table() {
        let text = print_relational(&sample());
        assert!(text.contains("  author text @references(User.id)"));
        assert!(text.contains("table Post_tags {"));
        assert!(text.contains("  post_id text @references(Post.id)"));
        assert!(text.contains("  tag_id text @references(Tag.id)"));
    }

    #[test]
    fn test_omitted_lists_still_get_tables() {
        let mut lists = IndexMap::new();
        lists.insert(
            "User".to_string(),
            ListConfig::new().field("name", FieldConfig::text()),
        );
        lists.insert(
            "Audit".to_string(),
            ListConfig::new()
                .field("entry", FieldConfig::text())
                .with_graphql(ListGraphqlConfig::default().omit(OmitConfig::all())),
        );
        let text = print_relational(&initialise(&StrataConfig::default(), lists).unwrap());
        assert!(text.contains("table Audit {"));
    }

    #[test]
    fn test_print_is_deterministic() {
        assert_eq!(print_relational(&sample()), print_relational(&sample()));
    }
}
