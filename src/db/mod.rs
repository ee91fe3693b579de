//! The database collaborator interface.
//!
//! The core never issues SQL itself: every persistence call goes through
//! [`DatabaseClient`], a narrow async trait a real backend implements by
//! translating filter trees into its own query language. The crate ships
//! [`MemoryDatabase`], a faithful in-process client used by tests and the
//! demo binary.

mod memory;

pub use memory::MemoryDatabase;

use crate::error::Result;
use crate::query::{Filter, QueryArgs, UniqueWhere};
use async_trait::async_trait;

/// A stored item: a JSON object keyed by field name, always carrying `id`.
pub type Item = serde_json::Map<String, serde_json::Value>;

/// Per-list CRUD primitives plus an explicit transaction scope.
///
/// Implementations must support nested relation reads (to-one foreign keys
/// and to-many id arrays stored on the owning side) and must scope
/// `begin`/`commit`/`rollback` to the connection the client represents.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    async fn find_many(&self, list: &str, args: &QueryArgs) -> Result<Vec<Item>>;

    async fn find_unique(&self, list: &str, unique: &UniqueWhere) -> Result<Option<Item>>;

    async fn count(&self, list: &str, filter: Option<&Filter>) -> Result<usize>;

    async fn create(&self, list: &str, data: Item) -> Result<Item>;

    async fn update(&self, list: &str, id: &str, data: Item) -> Result<Item>;

    async fn delete(&self, list: &str, id: &str) -> Result<Item>;

    /// Opens a transaction scope. Every subsequent call is part of the scope
    /// until `commit` or `rollback`.
    async fn begin(&self) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;
}
