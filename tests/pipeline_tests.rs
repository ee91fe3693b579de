//! Resolver pipeline behavior: limits, defaults, validation, hooks, batch
//! semantics, relationships, and password handling.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Value, json};
use std::sync::Arc;
use strata::access::{FilterAccess, FilterDecision, FilterRule, ListAccess};
use strata::config::StrataConfig;
use strata::context::{FindManyArgs, Session, System};
use strata::db::{DatabaseClient, Item, MemoryDatabase};
use strata::error::{Result, StrataError};
use strata::fields::verify_password;
use strata::query::{Filter, QueryArgs, UniqueWhere};
use strata::resolve::ListHooks;
use strata::schema::{FieldConfig, ListConfig, ListGraphqlConfig};
use strata::validation::ValidationRules;

fn build(lists: IndexMap<String, ListConfig>) -> (System, Arc<MemoryDatabase>) {
    let db = Arc::new(MemoryDatabase::new());
    let system = System::new(StrataConfig::default(), lists, db.clone()).unwrap();
    (system, db)
}

fn post_list() -> ListConfig {
    ListConfig::new()
        .field(
            "title",
            FieldConfig::text().with_validation(ValidationRules {
                is_required: true,
                ..Default::default()
            }),
        )
        .field("views", FieldConfig::integer())
}

#[tokio::test]
async fn test_take_over_limit_fails_before_any_data() {
    let mut lists = IndexMap::new();
    lists.insert(
        "Post".to_string(),
        post_list().with_graphql(ListGraphqlConfig::default().max_take(100)),
    );
    let (system, _db) = build(lists);

    let err = system
        .context()
        .db()
        .find_many(
            "Post",
            FindManyArgs {
                take: Some(500),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    match err {
        StrataError::LimitExceeded { max, requested } => {
            assert_eq!(max, 100);
            assert_eq!(requested, 500);
        }
        other => panic!("expected LimitExceeded, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unbounded_query_over_limit_fails() {
    let mut lists = IndexMap::new();
    lists.insert(
        "Post".to_string(),
        post_list().with_graphql(ListGraphqlConfig::default().max_take(2)),
    );
    let (system, db) = build(lists);
    for n in 0..3 {
        db.seed(
            "Post",
            json!({ "title": format!("post {}", n) })
                .as_object()
                .unwrap()
                .clone(),
        );
    }

    let err = system
        .context()
        .db()
        .find_many("Post", FindManyArgs::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StrataError::LimitExceeded { max: 2, .. }));

    // an explicit in-bounds take still works
    let two = system
        .context()
        .db()
        .find_many(
            "Post",
            FindManyArgs {
                take: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(two.len(), 2);
}

#[tokio::test]
async fn test_create_applies_defaults_and_validation() {
    let mut lists = IndexMap::new();
    lists.insert(
        "Post".to_string(),
        ListConfig::new()
            .field(
                "title",
                FieldConfig::text().with_validation(ValidationRules {
                    is_required: true,
                    ..Default::default()
                }),
            )
            .field(
                "status",
                FieldConfig::select(vec!["draft".to_string(), "published".to_string()])
                    .with_default("draft"),
            ),
    );
    let (system, _db) = build(lists);
    let ctx = system.context();

    let created = ctx
        .db()
        .create_one("Post", json!({ "title": "hello" }))
        .await
        .unwrap();
    assert_eq!(created["status"], json!("draft"));

    let missing = ctx.db().create_one("Post", json!({})).await.unwrap_err();
    assert!(matches!(missing, StrataError::Validation(_)));
    assert!(missing.to_string().contains("Post.title"));

    let bad_option = ctx
        .db()
        .create_one("Post", json!({ "title": "x", "status": "junk" }))
        .await
        .unwrap_err();
    assert!(matches!(bad_option, StrataError::Validation(_)));
}

#[tokio::test]
async fn test_update_revalidates_only_supplied_fields() {
    let mut lists = IndexMap::new();
    lists.insert(
        "Post".to_string(),
        ListConfig::new()
            .field(
                "title",
                FieldConfig::text().with_validation(ValidationRules {
                    min_length: Some(3),
                    ..Default::default()
                }),
            )
            .field("views", FieldConfig::integer()),
    );
    let (system, db) = build(lists);
    let id = db.seed(
        "Post",
        json!({ "title": "ok" }).as_object().unwrap().clone(),
    );

    // the pre-existing too-short title is not re-checked when untouched
    let ctx = system.context();
    assert!(
        ctx.db()
            .update_one("Post", json!({ "id": id.clone() }), json!({ "views": 5 }))
            .await
            .is_ok()
    );
    let err = ctx
        .db()
        .update_one("Post", json!({ "id": id }), json!({ "title": "x" }))
        .await
        .unwrap_err();
    assert!(matches!(err, StrataError::Validation(_)));
}

#[tokio::test]
async fn test_unique_fields_are_enforced() {
    let mut lists = IndexMap::new();
    lists.insert(
        "User".to_string(),
        ListConfig::new().field("email", FieldConfig::text().unique()),
    );
    let (system, _db) = build(lists);
    let ctx = system.context();

    let first = ctx
        .db()
        .create_one("User", json!({ "email": "ada@example.com" }))
        .await
        .unwrap();

    let dup = ctx
        .db()
        .create_one("User", json!({ "email": "ada@example.com" }))
        .await
        .unwrap_err();
    assert!(dup.to_string().contains("must be unique"));

    // updating an item to its own current value is not a collision
    let id = first["id"].as_str().unwrap().to_string();
    assert!(
        ctx.db()
            .update_one(
                "User",
                json!({ "id": id }),
                json!({ "email": "ada@example.com" })
            )
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_hook_stages_run_in_order() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    let hooks = {
        let o1 = order.clone();
        let o2 = order.clone();
        let o3 = order.clone();
        let o4 = order.clone();
        ListHooks::new()
            .on_resolve_input(move |_ctx, args| {
                let order = o1.clone();
                Box::pin(async move {
                    order.lock().unwrap().push("resolve_input");
                    let mut input = args.input.unwrap_or_default();
                    if let Some(Value::String(title)) = input.get("title").cloned() {
                        input.insert("title".to_string(), json!(title.trim()));
                    }
                    Ok(input)
                })
            })
            .on_validate_input(move |_ctx, args| {
                let order = o2.clone();
                Box::pin(async move {
                    order.lock().unwrap().push("validate_input");
                    let banned = args
                        .input
                        .as_ref()
                        .and_then(|i| i.get("title"))
                        .and_then(Value::as_str)
                        .is_some_and(|t| t.contains("spam"));
                    if banned {
                        Err(StrataError::validation_field("Post", "title", "contains spam"))
                    } else {
                        Ok(())
                    }
                })
            })
            .on_before_operation(move |_ctx, _args| {
                let order = o3.clone();
                Box::pin(async move {
                    order.lock().unwrap().push("before_operation");
                    Ok(())
                })
            })
            .on_after_operation(move |_ctx, args| {
                let order = o4.clone();
                Box::pin(async move {
                    order.lock().unwrap().push("after_operation");
                    assert!(args.item.is_some_and(|i| i.contains_key("id")));
                    Ok(())
                })
            })
    };

    let mut lists = IndexMap::new();
    lists.insert(
        "Post".to_string(),
        ListConfig::new()
            .field("title", FieldConfig::text())
            .with_hooks(hooks),
    );
    let (system, _db) = build(lists);
    let ctx = system.context();

    let created = ctx
        .db()
        .create_one("Post", json!({ "title": "  padded  " }))
        .await
        .unwrap();
    assert_eq!(created["title"], json!("padded"));
    assert_eq!(
        *order.lock().unwrap(),
        vec![
            "resolve_input",
            "validate_input",
            "before_operation",
            "after_operation"
        ]
    );

    let rejected = ctx
        .db()
        .create_one("Post", json!({ "title": "buy spam now" }))
        .await
        .unwrap_err();
    assert!(rejected.to_string().contains("contains spam"));
    assert_eq!(ctx.db().count("Post", None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_batch_reports_per_item_results() {
    let mut lists = IndexMap::new();
    lists.insert(
        "User".to_string(),
        ListConfig::new().field("email", FieldConfig::text().unique()),
    );
    let (system, _db) = build(lists);
    let ctx = system.context();

    let results = ctx
        .db()
        .create_many(
            "User",
            vec![
                json!({ "email": "a@example.com" }),
                json!({ "email": "a@example.com" }),
                json!({ "email": "b@example.com" }),
            ],
        )
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
    assert_eq!(ctx.db().count("User", None).await.unwrap(), 2);
}

#[tokio::test]
async fn test_atomic_batch_rolls_back_on_failure() {
    let mut lists = IndexMap::new();
    lists.insert(
        "User".to_string(),
        ListConfig::new()
            .field("email", FieldConfig::text().unique())
            .with_atomic_batches(),
    );
    let (system, _db) = build(lists);
    let ctx = system.context();

    let err = ctx
        .db()
        .create_many(
            "User",
            vec![
                json!({ "email": "a@example.com" }),
                json!({ "email": "a@example.com" }),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StrataError::Validation(_)));
    // nothing survives a failed atomic batch
    assert_eq!(ctx.db().count("User", None).await.unwrap(), 0);

    let ok = ctx
        .db()
        .create_many(
            "User",
            vec![
                json!({ "email": "a@example.com" }),
                json!({ "email": "b@example.com" }),
            ],
        )
        .await
        .unwrap();
    assert!(ok.iter().all(Result::is_ok));
    assert_eq!(ctx.db().count("User", None).await.unwrap(), 2);
}

/// Delegates to an in-memory store but refuses to roll back, like a backend
/// whose connection died mid-transaction.
struct BrokenRollbackDatabase(MemoryDatabase);

#[async_trait]
impl DatabaseClient for BrokenRollbackDatabase {
    async fn find_many(&self, list: &str, args: &QueryArgs) -> Result<Vec<Item>> {
        self.0.find_many(list, args).await
    }

    async fn find_unique(&self, list: &str, unique: &UniqueWhere) -> Result<Option<Item>> {
        self.0.find_unique(list, unique).await
    }

    async fn count(&self, list: &str, filter: Option<&Filter>) -> Result<usize> {
        self.0.count(list, filter).await
    }

    async fn create(&self, list: &str, data: Item) -> Result<Item> {
        self.0.create(list, data).await
    }

    async fn update(&self, list: &str, id: &str, data: Item) -> Result<Item> {
        self.0.update(list, id, data).await
    }

    async fn delete(&self, list: &str, id: &str) -> Result<Item> {
        self.0.delete(list, id).await
    }

    async fn begin(&self) -> Result<()> {
        self.0.begin().await
    }

    async fn commit(&self) -> Result<()> {
        self.0.commit().await
    }

    async fn rollback(&self) -> Result<()> {
        Err(StrataError::Persistence("connection lost".to_string()))
    }
}

#[tokio::test]
async fn test_atomic_batch_keeps_item_error_when_rollback_fails() {
    let mut lists = IndexMap::new();
    lists.insert(
        "User".to_string(),
        ListConfig::new()
            .field("email", FieldConfig::text().unique())
            .with_atomic_batches(),
    );
    let db = Arc::new(BrokenRollbackDatabase(MemoryDatabase::new()));
    let system = System::new(StrataConfig::default(), lists, db).unwrap();
    let ctx = system.context();

    let err = ctx
        .db()
        .create_many(
            "User",
            vec![
                json!({ "email": "a@example.com" }),
                json!({ "email": "a@example.com" }),
            ],
        )
        .await
        .unwrap_err();
    // the caller sees what broke the batch, not the rollback failure
    assert!(matches!(err, StrataError::Validation(_)));
}

#[tokio::test]
async fn test_delete_many_partial_success_with_denied_item() {
    let mut lists = IndexMap::new();
    lists.insert(
        "Post".to_string(),
        ListConfig::new()
            .field("author", FieldConfig::text())
            .with_access(ListAccess {
                filter: FilterAccess {
                    delete: FilterRule::predicate(|session| match session {
                        Some(s) => {
                            FilterDecision::Filter(Filter::equals("author", s.item_id.clone()))
                        }
                        None => FilterDecision::Deny,
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
    );
    let (system, db) = build(lists);
    let mine = db.seed("Post", json!({ "author": "u1" }).as_object().unwrap().clone());
    let theirs = db.seed("Post", json!({ "author": "u2" }).as_object().unwrap().clone());

    let ctx = system
        .context()
        .with_session(Session::new("u1", "User"));
    let results = ctx
        .db()
        .delete_many("Post", vec![json!({ "id": mine }), json!({ "id": theirs })])
        .await
        .unwrap();

    assert!(results[0].is_ok());
    match &results[1] {
        Err(StrataError::NotFound(_)) => {}
        other => panic!("expected not-found-shaped denial, got {:?}", other),
    }
    // the denied row survived
    assert_eq!(ctx.sudo().db().count("Post", None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_password_is_hashed_and_never_read_back() {
    let mut lists = IndexMap::new();
    lists.insert(
        "User".to_string(),
        ListConfig::new()
            .field("name", FieldConfig::text())
            .field("password", FieldConfig::password()),
    );
    let (system, _db) = build(lists);
    let ctx = system.context();

    let created = ctx
        .db()
        .create_one("User", json!({ "name": "Ada", "password": "hunter22" }))
        .await
        .unwrap();
    let stored = created["password"].as_str().unwrap();
    assert_ne!(stored, "hunter22");
    assert!(verify_password("hunter22", stored));

    // the masked surface never returns the hash
    let id = created["id"].as_str().unwrap().to_string();
    let masked = ctx
        .query()
        .find_one("User", json!({ "id": id }))
        .await
        .unwrap()
        .unwrap();
    assert!(!masked.contains_key("password"));
    assert!(masked.contains_key("name"));
}

#[tokio::test]
async fn test_relationship_connect_stores_visible_target_id() {
    let mut lists = IndexMap::new();
    lists.insert(
        "User".to_string(),
        ListConfig::new().field("email", FieldConfig::text().unique()),
    );
    lists.insert(
        "Post".to_string(),
        ListConfig::new()
            .field("title", FieldConfig::text())
            .field("author", FieldConfig::relationship("User"))
            .field("reviewers", FieldConfig::relationship_many("User")),
    );
    let (system, db) = build(lists);
    let ada = db.seed(
        "User",
        json!({ "email": "ada@example.com" }).as_object().unwrap().clone(),
    );
    let grace = db.seed(
        "User",
        json!({ "email": "grace@example.com" }).as_object().unwrap().clone(),
    );

    let ctx = system.context();
    let post = ctx
        .db()
        .create_one(
            "Post",
            json!({
                "title": "connected",
                "author": { "connect": { "email": "ada@example.com" } },
                "reviewers": { "connect": [{ "id": ada }, { "id": grace }] },
            }),
        )
        .await
        .unwrap();
    assert_eq!(post["author"], json!(ada));
    assert_eq!(post["reviewers"], json!([ada, grace]));

    let missing = ctx
        .db()
        .create_one(
            "Post",
            json!({
                "title": "dangling",
                "author": { "connect": { "email": "nobody@example.com" } },
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(missing, StrataError::NotFound(_)));
}

#[tokio::test]
async fn test_connect_respects_foreign_list_visibility() {
    let mut lists = IndexMap::new();
    lists.insert(
        "User".to_string(),
        ListConfig::new()
            .field("handle", FieldConfig::text().unique())
            .with_access(ListAccess {
                filter: FilterAccess {
                    query: FilterRule::predicate(|session| {
                        if session.is_some() {
                            FilterDecision::Allow
                        } else {
                            FilterDecision::Deny
                        }
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
    );
    lists.insert(
        "Post".to_string(),
        ListConfig::new()
            .field("title", FieldConfig::text())
            .field("author", FieldConfig::relationship("User")),
    );
    let (system, db) = build(lists);
    db.seed(
        "User",
        json!({ "handle": "ada" }).as_object().unwrap().clone(),
    );

    // anonymous writers cannot connect to rows they cannot see
    let err = system
        .context()
        .db()
        .create_one(
            "Post",
            json!({ "title": "x", "author": { "connect": { "handle": "ada" } } }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StrataError::NotFound(_)));
}

#[tokio::test]
async fn test_order_by_and_pagination() {
    let mut lists = IndexMap::new();
    lists.insert("Post".to_string(), post_list());
    let (system, db) = build(lists);
    for (title, views) in [("a", 3), ("b", 1), ("c", 2)] {
        db.seed(
            "Post",
            json!({ "title": title, "views": views })
                .as_object()
                .unwrap()
                .clone(),
        );
    }

    let ctx = system.context();
    let ordered = ctx
        .db()
        .find_many(
            "Post",
            FindManyArgs {
                order_by: Some(json!([{ "views": "desc" }])),
                take: Some(2),
                skip: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let titles: Vec<_> = ordered.iter().map(|p| p["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["c", "b"]);

    let bad_field = ctx
        .db()
        .find_many(
            "Post",
            FindManyArgs {
                order_by: Some(json!([{ "nope": "asc" }])),
                ..Default::default()
            },
        )
        .await;
    assert!(bad_field.is_err());
}
