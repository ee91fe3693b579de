//! End-to-end GraphQL execution over the demo system: queries, mutations,
//! relationship traversal, and per-session masking.

use serde_json::{Value, json};
use strata::cli::{demo_system, session_for_email};
use strata::config::StrataConfig;
use strata::context::{StrataContext, System};
use strata::graphql::print_sdl;

fn system() -> System {
    demo_system(StrataConfig::default()).unwrap()
}

async fn as_user(system: &System, email: &str) -> StrataContext {
    let session = session_for_email(system, email).await.unwrap().unwrap();
    system.context().with_session(session)
}

#[tokio::test]
async fn test_nested_query_traverses_relationships() {
    let system = system();
    let ctx = as_user(&system, "alice@example.com").await;

    let data = ctx
        .graphql()
        .run(
            "{ posts { title status author { name } tags { label } } }",
            None,
        )
        .await
        .unwrap();

    let posts = data["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    let hello = posts
        .iter()
        .find(|p| p["title"] == json!("Hello world"))
        .unwrap();
    assert_eq!(hello["status"], json!("published"));
    assert_eq!(hello["author"]["name"], json!("Alice"));
    assert_eq!(hello["tags"][0]["label"], json!("intro"));
}

#[tokio::test]
async fn test_anonymous_sees_published_posts_only() {
    let system = system();
    let data = system
        .context()
        .graphql()
        .run("{ posts { title } postCount }", None)
        .await
        .unwrap();

    let titles: Vec<&str> = data["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Hello world"]);
    assert_eq!(data["postCount"], json!(1));
}

#[tokio::test]
async fn test_denied_field_reads_as_null() {
    let system = system();
    let ctx = as_user(&system, "bob@example.com").await;

    let data = ctx
        .graphql()
        .run("{ users { name email } }", None)
        .await
        .unwrap();

    let users = data["users"].as_array().unwrap();
    let bob = users.iter().find(|u| u["name"] == json!("Bob")).unwrap();
    let alice = users.iter().find(|u| u["name"] == json!("Alice")).unwrap();
    assert_eq!(bob["email"], json!("bob@example.com"));
    assert_eq!(alice["email"], Value::Null);
}

#[tokio::test]
async fn test_admin_reads_every_email() {
    let system = system();
    let ctx = as_user(&system, "alice@example.com").await;

    let data = ctx.graphql().run("{ users { email } }", None).await.unwrap();
    let emails: Vec<&Value> = data["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| &u["email"])
        .collect();
    assert!(emails.iter().all(|e| e.is_string()));
}

#[tokio::test]
async fn test_where_and_order_by_arguments() {
    let system = system();
    let ctx = as_user(&system, "alice@example.com").await;

    let data = ctx
        .graphql()
        .run(
            "{ posts(where: { status: { equals: \"draft\" } }, orderBy: [{ title: asc }]) { title } }",
            None,
        )
        .await
        .unwrap();
    let titles: Vec<&str> = data["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Unfinished thoughts"]);
}

#[tokio::test]
async fn test_create_mutation_with_variables() {
    let system = system();
    let ctx = as_user(&system, "alice@example.com").await;

    let data = ctx
        .graphql()
        .run(
            "mutation CreateTag($data: TagCreateInput!) { createTag(data: $data) { id label } }",
            Some(json!({ "data": { "label": "rust" } })),
        )
        .await
        .unwrap();
    assert_eq!(data["createTag"]["label"], json!("rust"));
    assert!(data["createTag"]["id"].is_string());

    assert_eq!(ctx.db().count("Tag", None).await.unwrap(), 2);
}

#[tokio::test]
async fn test_publish_through_graphql_stamps_publish_date() {
    let system = system();
    let ctx = as_user(&system, "bob@example.com").await;

    let data = ctx
        .graphql()
        .run(
            "mutation { createPost(data: { title: \"Fresh\", status: \"published\" }) { title status publishDate } }",
            None,
        )
        .await
        .unwrap();
    assert_eq!(data["createPost"]["status"], json!("published"));
    assert!(data["createPost"]["publishDate"].is_string());
}

#[tokio::test]
async fn test_access_denied_surfaces_as_graphql_error() {
    let system = system();

    // deleting users is admin-only; the anonymous request fails with an
    // error instead of data
    let response = system
        .context()
        .graphql()
        .raw(
            "mutation { deleteUser(where: { email: \"bob@example.com\" }) { id } }",
            None,
        )
        .await;
    assert!(!response.errors.is_empty());
    assert!(response.errors[0].message.contains("Access denied"));
}

#[tokio::test]
async fn test_validation_error_carries_field_detail() {
    let system = system();
    let ctx = as_user(&system, "bob@example.com").await;

    let response = ctx
        .graphql()
        .raw("mutation { createPost(data: { status: \"draft\" }) { id } }", None)
        .await;
    assert!(!response.errors.is_empty());
    assert!(response.errors[0].message.contains("Post.title"));
}

#[tokio::test]
async fn test_batch_mutation_nulls_failed_entries() {
    let system = system();
    let ctx = as_user(&system, "alice@example.com").await;

    // "intro" already exists, so the second entry fails its uniqueness
    // check: the slot renders as null and the failure lands in errors,
    // while the first entry still succeeds
    let response = ctx
        .graphql()
        .raw(
            "mutation { createTags(data: [{ label: \"one\" }, { label: \"intro\" }]) { label } }",
            None,
        )
        .await;
    let data = response.data.into_json().unwrap();
    let entries = data["createTags"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["label"], json!("one"));
    assert_eq!(entries[1], Value::Null);
    assert!(
        response
            .errors
            .iter()
            .any(|e| e.message.contains("Tag.label"))
    );

    // partial success persisted the first entry only
    assert_eq!(ctx.db().count("Tag", None).await.unwrap(), 2);
}

#[tokio::test]
async fn test_sdl_matches_the_printed_artifact_body() {
    let system = system();
    let sdl = system.context().graphql().sdl();
    assert_eq!(sdl, print_sdl(system.schema()));
    assert!(sdl.contains("type Query"));
    assert!(sdl.contains("createPost"));
}
