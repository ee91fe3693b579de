//! Per-request execution contexts.
//!
//! A [`System`] is built once from configuration; a [`StrataContext`] is a
//! cheap, immutable per-request handle derived from it. Deriving a variant
//! (`sudo`, `with_session`) is pure construction over shared `Arc` internals;
//! a context is never mutated and never shared across concurrent requests.

use crate::assets::{FileStorage, ImageStorage, MemoryFileStorage, MemoryImageStorage};
use crate::config::StrataConfig;
use crate::db::{DatabaseClient, Item};
use crate::error::{Result, StrataError};
use crate::graphql;
use crate::resolve;
use crate::schema::{InitialisedSchema, List, ListConfig, initialise};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Opaque authentication payload. The core only passes it into access
/// predicates; it never interprets the contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub item_id: String,
    pub list_key: String,
    pub data: Value,
}

impl Session {
    pub fn new(item_id: impl Into<String>, list_key: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            list_key: list_key.into(),
            data: Value::Null,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

pub(crate) struct SystemInner {
    pub(crate) config: StrataConfig,
    pub(crate) schema: Arc<InitialisedSchema>,
    pub(crate) db: Arc<dyn DatabaseClient>,
    pub(crate) files: Arc<dyn FileStorage>,
    pub(crate) images: Arc<dyn ImageStorage>,
    pub(crate) graphql: async_graphql::dynamic::Schema,
}

/// The compiled system: initialised schema, collaborators, and the built
/// executable GraphQL schema. Immutable once constructed.
#[derive(Clone)]
pub struct System {
    inner: Arc<SystemInner>,
}

impl System {
    /// Initialises the schema and builds the executable GraphQL schema.
    /// Fails on invalid configuration; a process must not serve requests
    /// from a half-built system.
    pub fn new(
        config: StrataConfig,
        lists: IndexMap<String, ListConfig>,
        db: Arc<dyn DatabaseClient>,
    ) -> Result<Self> {
        Self::with_storage(
            config,
            lists,
            db,
            Arc::new(MemoryFileStorage::new()),
            Arc::new(MemoryImageStorage::new()),
        )
    }

    pub fn with_storage(
        config: StrataConfig,
        lists: IndexMap<String, ListConfig>,
        db: Arc<dyn DatabaseClient>,
        files: Arc<dyn FileStorage>,
        images: Arc<dyn ImageStorage>,
    ) -> Result<Self> {
        let schema = Arc::new(initialise(&config, lists)?);
        let graphql = graphql::build_executable_schema(&schema)?;
        Ok(Self {
            inner: Arc::new(SystemInner {
                config,
                schema,
                db,
                files,
                images,
                graphql,
            }),
        })
    }

    pub fn schema(&self) -> &InitialisedSchema {
        &self.inner.schema
    }

    pub fn config(&self) -> &StrataConfig {
        &self.inner.config
    }

    /// A fresh anonymous context.
    pub fn context(&self) -> StrataContext {
        StrataContext {
            system: self.inner.clone(),
            session: None,
            sudo: false,
        }
    }
}

/// Per-request handle: session, database API, GraphQL execution API, and
/// derived variants.
#[derive(Clone)]
pub struct StrataContext {
    system: Arc<SystemInner>,
    session: Option<Arc<Session>>,
    sudo: bool,
}

impl StrataContext {
    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    pub fn is_sudo(&self) -> bool {
        self.sudo
    }

    /// A variant with every access rule forced to allow. For
    /// system-internal operations that must not inherit the acting user's
    /// restrictions.
    pub fn sudo(&self) -> Self {
        Self {
            system: self.system.clone(),
            session: self.session.clone(),
            sudo: true,
        }
    }

    /// Drops sudo, keeping the session.
    pub fn exit_sudo(&self) -> Self {
        Self {
            system: self.system.clone(),
            session: self.session.clone(),
            sudo: false,
        }
    }

    /// A variant with a replaced session and otherwise identical wiring.
    pub fn with_session(&self, session: Session) -> Self {
        Self {
            system: self.system.clone(),
            session: Some(Arc::new(session)),
            sudo: self.sudo,
        }
    }

    pub fn schema(&self) -> &InitialisedSchema {
        &self.system.schema
    }

    pub(crate) fn list(&self, key: &str) -> Result<Arc<List>> {
        self.system
            .schema
            .list(key)
            .cloned()
            .ok_or_else(|| StrataError::Validation(format!("Unknown list '{}'", key)))
    }

    pub(crate) fn database(&self) -> &dyn DatabaseClient {
        self.system.db.as_ref()
    }

    pub fn files(&self) -> &dyn FileStorage {
        self.system.files.as_ref()
    }

    pub fn images(&self) -> &dyn ImageStorage {
        self.system.images.as_ref()
    }

    /// The unmasked item API: access control and hooks apply, but results
    /// keep every readable-or-not field. For trusted server-side code.
    pub fn db(&self) -> DbApi<'_> {
        DbApi { ctx: self }
    }

    /// The masked item API: like [`StrataContext::db`], with field-level
    /// read masking applied to every result.
    pub fn query(&self) -> QueryApi<'_> {
        QueryApi { ctx: self }
    }

    /// The GraphQL execution API.
    pub fn graphql(&self) -> GraphqlApi<'_> {
        GraphqlApi { ctx: self }
    }
}

/// Arguments for a findMany call on the item APIs.
#[derive(Debug, Clone, Default)]
pub struct FindManyArgs {
    pub r#where: Option<Value>,
    pub order_by: Option<Value>,
    pub take: Option<usize>,
    pub skip: usize,
}

pub struct DbApi<'a> {
    ctx: &'a StrataContext,
}

impl DbApi<'_> {
    pub async fn find_one(&self, list: &str, where_unique: Value) -> Result<Option<Item>> {
        let list = self.ctx.list(list)?;
        resolve::find_one(self.ctx, &list, &where_unique).await
    }

    pub async fn find_many(&self, list: &str, args: FindManyArgs) -> Result<Vec<Item>> {
        let list = self.ctx.list(list)?;
        resolve::find_many(
            self.ctx,
            &list,
            args.r#where.as_ref(),
            args.order_by.as_ref(),
            args.take,
            args.skip,
        )
        .await
    }

    pub async fn count(&self, list: &str, r#where: Option<Value>) -> Result<usize> {
        let list = self.ctx.list(list)?;
        resolve::count(self.ctx, &list, r#where.as_ref()).await
    }

    pub async fn create_one(&self, list: &str, data: Value) -> Result<Item> {
        let list = self.ctx.list(list)?;
        resolve::create_one(self.ctx, &list, &data).await
    }

    pub async fn create_many(&self, list: &str, data: Vec<Value>) -> Result<Vec<Result<Item>>> {
        let list = self.ctx.list(list)?;
        resolve::create_many(self.ctx, &list, &data).await
    }

    pub async fn update_one(&self, list: &str, where_unique: Value, data: Value) -> Result<Item> {
        let list = self.ctx.list(list)?;
        resolve::update_one(self.ctx, &list, &where_unique, &data).await
    }

    pub async fn update_many(&self, list: &str, updates: Vec<Value>) -> Result<Vec<Result<Item>>> {
        let list = self.ctx.list(list)?;
        resolve::update_many(self.ctx, &list, &updates).await
    }

    pub async fn delete_one(&self, list: &str, where_unique: Value) -> Result<Item> {
        let list = self.ctx.list(list)?;
        resolve::delete_one(self.ctx, &list, &where_unique).await
    }

    pub async fn delete_many(&self, list: &str, wheres: Vec<Value>) -> Result<Vec<Result<Item>>> {
        let list = self.ctx.list(list)?;
        resolve::delete_many(self.ctx, &list, &wheres).await
    }
}

pub struct QueryApi<'a> {
    ctx: &'a StrataContext,
}

impl QueryApi<'_> {
    pub async fn find_one(&self, list: &str, where_unique: Value) -> Result<Option<Item>> {
        let compiled = self.ctx.list(list)?;
        let item = resolve::find_one(self.ctx, &compiled, &where_unique).await?;
        Ok(item.map(|i| resolve::mask_item(self.ctx, &compiled, &i)))
    }

    pub async fn find_many(&self, list: &str, args: FindManyArgs) -> Result<Vec<Item>> {
        let compiled = self.ctx.list(list)?;
        let items = resolve::find_many(
            self.ctx,
            &compiled,
            args.r#where.as_ref(),
            args.order_by.as_ref(),
            args.take,
            args.skip,
        )
        .await?;
        Ok(items
            .iter()
            .map(|i| resolve::mask_item(self.ctx, &compiled, i))
            .collect())
    }

    pub async fn count(&self, list: &str, r#where: Option<Value>) -> Result<usize> {
        self.ctx.db().count(list, r#where).await
    }

    pub async fn create_one(&self, list: &str, data: Value) -> Result<Item> {
        let compiled = self.ctx.list(list)?;
        let item = resolve::create_one(self.ctx, &compiled, &data).await?;
        Ok(resolve::mask_item(self.ctx, &compiled, &item))
    }

    pub async fn update_one(&self, list: &str, where_unique: Value, data: Value) -> Result<Item> {
        let compiled = self.ctx.list(list)?;
        let item = resolve::update_one(self.ctx, &compiled, &where_unique, &data).await?;
        Ok(resolve::mask_item(self.ctx, &compiled, &item))
    }

    pub async fn delete_one(&self, list: &str, where_unique: Value) -> Result<Item> {
        let compiled = self.ctx.list(list)?;
        let item = resolve::delete_one(self.ctx, &compiled, &where_unique).await?;
        Ok(resolve::mask_item(self.ctx, &compiled, &item))
    }
}

pub struct GraphqlApi<'a> {
    ctx: &'a StrataContext,
}

impl GraphqlApi<'_> {
    /// The schema SDL, identical to the committed artifact body.
    pub fn sdl(&self) -> String {
        graphql::print_sdl(&self.ctx.system.schema)
    }

    /// Executes a query and returns its data, failing on any error.
    pub async fn run(&self, query: &str, variables: Option<Value>) -> Result<Value> {
        let response = self.raw(query, variables).await;
        if let Some(error) = response.errors.first() {
            return Err(StrataError::Graphql(error.message.clone()));
        }
        response
            .data
            .into_json()
            .map_err(|e| StrataError::Graphql(e.to_string()))
    }

    /// Executes a query and returns the full response, errors included.
    pub async fn raw(&self, query: &str, variables: Option<Value>) -> async_graphql::Response {
        let mut request = async_graphql::Request::new(query).data(self.ctx.clone());
        if let Some(vars) = variables {
            request = request.variables(async_graphql::Variables::from_json(vars));
        }
        self.ctx.system.graphql.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;
    use crate::schema::{FieldConfig, ListConfig};
    use serde_json::json;

    fn test_system() -> System {
        let mut lists = IndexMap::new();
        lists.insert(
            "User".to_string(),
            ListConfig::new().field("name", FieldConfig::text()),
        );
        System::new(
            StrataConfig::default(),
            lists,
            Arc::new(MemoryDatabase::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_context_derivation_is_pure() {
        let system = test_system();
        let base = system.context();
        let session = Session::new("u1", "User").with_data(json!({"isAdmin": true}));

        let with_session = base.with_session(session.clone());
        let elevated = with_session.sudo();
        let demoted = elevated.exit_sudo();

        assert!(base.session().is_none());
        assert!(!base.is_sudo());
        assert_eq!(with_session.session(), Some(&session));
        assert!(elevated.is_sudo());
        assert_eq!(elevated.session(), Some(&session));
        assert!(!demoted.is_sudo());
        assert_eq!(demoted.session(), Some(&session));
    }

    #[test]
    fn test_unknown_list_is_an_error() {
        let system = test_system();
        let ctx = system.context();
        assert!(ctx.list("Nope").is_err());
        assert!(ctx.list("User").is_ok());
    }
}
