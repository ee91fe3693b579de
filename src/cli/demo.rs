//! The built-in demo system the CLI operates on: a small blog-shaped schema
//! exercising relationships, access rules, hooks, and field validation. Users
//! can read everyone's name but only their own email (admins see all), posts
//! are only visible to anonymous readers once published, and publishing
//! stamps the publish date automatically.

use crate::access::{
    FieldAccess, FieldRule, FilterAccess, FilterDecision, FilterRule, ItemAccess, ItemRule,
    ListAccess, OperationAccess, OperationRule,
};
use crate::config::StrataConfig;
use crate::context::{Session, System};
use crate::db::MemoryDatabase;
use crate::error::Result;
use crate::fields::hash_password;
use crate::query::Filter;
use crate::resolve::ListHooks;
use crate::schema::{FieldConfig, ListConfig};
use crate::validation::ValidationRules;
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Value, json};
use std::sync::Arc;

fn is_admin(session: Option<&Session>) -> bool {
    session.is_some_and(|s| s.data["isAdmin"] == json!(true))
}

fn user_list() -> ListConfig {
    ListConfig::new()
        .field(
            "name",
            FieldConfig::text().with_validation(ValidationRules {
                is_required: true,
                ..Default::default()
            }),
        )
        .field(
            "email",
            FieldConfig::text()
                .unique()
                // visible to the account owner and to admins only
                .with_access(FieldAccess {
                    read: FieldRule::predicate(|session, item| {
                        is_admin(session)
                            || session.zip(item).is_some_and(|(s, item)| {
                                item.get("id") == Some(&Value::String(s.item_id.clone()))
                            })
                    }),
                    ..Default::default()
                }),
        )
        .field(
            "password",
            FieldConfig::password().with_validation(ValidationRules {
                min_length: Some(8),
                ..Default::default()
            }),
        )
        .field(
            "isAdmin",
            FieldConfig::checkbox().with_default(false).with_access(FieldAccess {
                create: FieldRule::predicate(|session, _| is_admin(session)),
                update: FieldRule::predicate(|session, _| is_admin(session)),
                ..Default::default()
            }),
        )
        .with_access(ListAccess {
            operation: OperationAccess {
                delete: OperationRule::predicate(|session| is_admin(session)),
                ..Default::default()
            },
            item: ItemAccess {
                // a user may update themselves; admins may update anyone
                update: ItemRule::predicate(|session, item| {
                    is_admin(session)
                        || session.is_some_and(|s| {
                            item.get("id") == Some(&Value::String(s.item_id.clone()))
                        })
                }),
                ..Default::default()
            },
            ..Default::default()
        })
}

fn post_list() -> ListConfig {
    ListConfig::new()
        .field(
            "title",
            FieldConfig::text().indexed().with_validation(ValidationRules {
                is_required: true,
                max_length: Some(200),
                ..Default::default()
            }),
        )
        .field(
            "status",
            FieldConfig::select(vec!["draft".to_string(), "published".to_string()])
                .with_default("draft"),
        )
        .field("publishDate", FieldConfig::timestamp())
        .field("author", FieldConfig::relationship("User"))
        .field("tags", FieldConfig::relationship_many("Tag"))
        .with_access(ListAccess {
            filter: FilterAccess {
                // anonymous readers only see published posts
                query: FilterRule::predicate(|session| {
                    if session.is_some() {
                        FilterDecision::Allow
                    } else {
                        FilterDecision::Filter(Filter::equals("status", "published"))
                    }
                }),
                ..Default::default()
            },
            ..Default::default()
        })
        .with_hooks(ListHooks::new().on_resolve_input(|_ctx, args| {
            Box::pin(async move {
                let mut input = args.input.unwrap_or_default();
                let publishing =
                    input.get("status").and_then(Value::as_str) == Some("published");
                if publishing && !input.contains_key("publishDate") {
                    input.insert("publishDate".to_string(), json!(Utc::now().to_rfc3339()));
                }
                Ok(input)
            })
        }))
}

fn tag_list() -> ListConfig {
    ListConfig::new().field("label", FieldConfig::text().unique())
}

/// Builds the demo system over a seeded in-memory database.
pub fn demo_system(config: StrataConfig) -> Result<System> {
    let db = Arc::new(MemoryDatabase::new());
    seed(&db)?;

    let mut lists = IndexMap::new();
    lists.insert("User".to_string(), user_list());
    lists.insert("Post".to_string(), post_list());
    lists.insert("Tag".to_string(), tag_list());
    System::new(config, lists, db)
}

fn seed(db: &MemoryDatabase) -> Result<()> {
    let alice = db.seed(
        "User",
        json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": hash_password("correct-horse")?,
            "isAdmin": true,
        })
        .as_object()
        .unwrap()
        .clone(),
    );
    let bob = db.seed(
        "User",
        json!({
            "name": "Bob",
            "email": "bob@example.com",
            "password": hash_password("battery-staple")?,
            "isAdmin": false,
        })
        .as_object()
        .unwrap()
        .clone(),
    );

    let intro = db.seed(
        "Tag",
        json!({ "label": "intro" }).as_object().unwrap().clone(),
    );

    db.seed(
        "Post",
        json!({
            "title": "Hello world",
            "status": "published",
            "publishDate": "2024-01-15T10:30:00Z",
            "author": alice,
            "tags": [intro],
        })
        .as_object()
        .unwrap()
        .clone(),
    );
    db.seed(
        "Post",
        json!({
            "title": "Unfinished thoughts",
            "status": "draft",
            "author": bob,
            "tags": [],
        })
        .as_object()
        .unwrap()
        .clone(),
    );
    Ok(())
}

/// Resolves `--as <email>` to a session over the seeded users.
pub async fn session_for_email(system: &System, email: &str) -> Result<Option<Session>> {
    let sudo = system.context().sudo();
    let user = sudo
        .db()
        .find_one("User", json!({ "email": email }))
        .await?;
    Ok(user.map(|user| {
        let id = user.get("id").and_then(Value::as_str).unwrap_or_default();
        Session::new(id, "User").with_data(json!({
            "isAdmin": user.get("isAdmin").cloned().unwrap_or(json!(false)),
            "name": user.get("name").cloned().unwrap_or(Value::Null),
        }))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_system_builds_and_is_seeded() {
        let system = demo_system(StrataConfig::default()).unwrap();
        let ctx = system.context().sudo();
        assert_eq!(ctx.db().count("User", None).await.unwrap(), 2);
        assert_eq!(ctx.db().count("Post", None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_anonymous_reader_sees_published_only() {
        let system = demo_system(StrataConfig::default()).unwrap();
        let ctx = system.context();
        let posts = ctx
            .db()
            .find_many("Post", Default::default())
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["title"], json!("Hello world"));
    }

    #[tokio::test]
    async fn test_session_lookup() {
        let system = demo_system(StrataConfig::default()).unwrap();
        let session = session_for_email(&system, "alice@example.com")
            .await
            .unwrap()
            .expect("alice is seeded");
        assert_eq!(session.list_key, "User");
        assert_eq!(session.data["isAdmin"], json!(true));
        assert!(
            session_for_email(&system, "nobody@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }
}
