//! Generated Rust type definitions for the declared lists: one serde struct
//! per list mirroring its stored shape. Written alongside the schema
//! artifacts as a convenience for typed consumers; regenerated on every
//! `generate` and not validated, since it is derived output either way.

use crate::fields::FieldKind;
use crate::schema::InitialisedSchema;
use std::fmt::Write;

pub fn print_types(schema: &InitialisedSchema) -> String {
    let mut out = String::new();
    out.push_str("#![allow(dead_code)]\n\n");
    out.push_str("use serde::{Deserialize, Serialize};\n\n");

    for list in schema.lists.values() {
        let _ = write!(out, "#[derive(Debug, Clone, Serialize, Deserialize)]\n");
        let _ = write!(out, "pub struct {} {{\n", list.key);
        out.push_str("    pub id: String,\n");
        for field in list.fields.values() {
            let rust_name = snake_case(&field.name);
            if rust_name != field.name {
                let _ = write!(out, "    #[serde(rename = \"{}\")]\n", field.name);
            }
            let _ = write!(out, "    pub {}: {},\n", rust_name, rust_type(&field.kind));
        }
        out.push_str("}\n\n");
    }

    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

fn rust_type(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Text | FieldKind::Select { .. } | FieldKind::Password => "Option<String>",
        FieldKind::Integer => "Option<i64>",
        FieldKind::Float => "Option<f64>",
        FieldKind::Checkbox => "Option<bool>",
        // stored as an RFC 3339 string
        FieldKind::Timestamp => "Option<String>",
        FieldKind::Relationship { many: false, .. } => "Option<String>",
        FieldKind::Relationship { many: true, .. } => "Vec<String>",
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_uppercase() {
            out.push('_');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrataConfig;
    use crate::schema::{FieldConfig, ListConfig, initialise};
    use indexmap::IndexMap;

    #[test]
    fn test_struct_per_list() {
        let mut lists = IndexMap::new();
        lists.insert(
            "User".to_string(),
            ListConfig::new()
                .field("name", FieldConfig::text())
                .field("isAdmin", FieldConfig::checkbox())
                .field("posts", FieldConfig::relationship_many("Post")),
        );
        lists.insert(
            "Post".to_string(),
            ListConfig::new().field("title", FieldConfig::text()),
        );
        let text = print_types(&initialise(&StrataConfig::default(), lists).unwrap());
        assert!(text.contains("pub struct User {"));
        assert!(text.contains("pub id: String,"));
        assert!(text.contains("#[serde(rename = \"isAdmin\")]"));
        assert!(text.contains("pub is_admin: Option<bool>,"));
        assert!(text.contains("pub posts: Vec<String>,"));
    }
}
