use super::{DatabaseClient, Item};
use crate::error::{Result, StrataError};
use crate::query::{Direction, Filter, QueryArgs, UniqueWhere, compare_values};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

type Tables = HashMap<String, IndexMap<String, Item>>;

#[derive(Default)]
struct MemoryState {
    tables: Tables,
    /// Copy of `tables` taken at `begin`, restored on `rollback`.
    snapshot: Option<Tables>,
}

/// In-process database client. Rows live in insertion-ordered maps so reads
/// without an explicit orderBy are repeatable.
///
/// The transaction scope is the whole store, not a connection: `begin`
/// rejects a second concurrent transaction instead of isolating it. Suits
/// tests and the demo binary; a real backend scopes transactions per
/// connection as [`DatabaseClient`] requires.
#[derive(Default)]
pub struct MemoryDatabase {
    state: Mutex<MemoryState>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an item directly, bypassing the resolver pipeline. For
    /// seeding tests and demos only.
    pub fn seed(&self, list: &str, mut item: Item) -> String {
        let id = match item.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                item.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };
        let mut state = self.state.lock().unwrap();
        state.tables.entry(list.to_string()).or_default().insert(id.clone(), item);
        id
    }
}

fn order_items(items: &mut [Item], order_by: &[crate::query::OrderBy]) {
    items.sort_by(|a, b| {
        for entry in order_by {
            let va = a.get(&entry.field).unwrap_or(&Value::Null);
            let vb = b.get(&entry.field).unwrap_or(&Value::Null);
            let ord = compare_values(va, vb).unwrap_or(Ordering::Equal);
            let ord = match entry.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl DatabaseClient for MemoryDatabase {
    async fn find_many(&self, list: &str, args: &QueryArgs) -> Result<Vec<Item>> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<Item> = state
            .tables
            .get(list)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default();

        if let Some(filter) = &args.filter {
            items.retain(|item| filter.matches(item));
        }
        order_items(&mut items, &args.order_by);

        let items = items
            .into_iter()
            .skip(args.skip)
            .take(args.take.unwrap_or(usize::MAX))
            .collect();
        Ok(items)
    }

    async fn find_unique(&self, list: &str, unique: &UniqueWhere) -> Result<Option<Item>> {
        let state = self.state.lock().unwrap();
        let Some(table) = state.tables.get(list) else {
            return Ok(None);
        };
        if unique.field == "id" {
            let id = unique.value.as_str().unwrap_or_default();
            return Ok(table.get(id).cloned());
        }
        Ok(table
            .values()
            .find(|item| item.get(&unique.field) == Some(&unique.value))
            .cloned())
    }

    async fn count(&self, list: &str, filter: Option<&Filter>) -> Result<usize> {
        let state = self.state.lock().unwrap();
        let Some(table) = state.tables.get(list) else {
            return Ok(0);
        };
        Ok(match filter {
            Some(f) => table.values().filter(|item| f.matches(item)).count(),
            None => table.len(),
        })
    }

    async fn create(&self, list: &str, mut data: Item) -> Result<Item> {
        let mut state = self.state.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        data.insert("id".to_string(), Value::String(id.clone()));
        let table = state.tables.entry(list.to_string()).or_default();
        table.insert(id, data.clone());
        Ok(data)
    }

    async fn update(&self, list: &str, id: &str, data: Item) -> Result<Item> {
        let mut state = self.state.lock().unwrap();
        let item = state
            .tables
            .get_mut(list)
            .and_then(|t| t.get_mut(id))
            .ok_or_else(|| StrataError::Persistence(format!("{}: row '{}' vanished", list, id)))?;
        for (key, value) in data {
            if key == "id" {
                continue;
            }
            item.insert(key, value);
        }
        Ok(item.clone())
    }

    async fn delete(&self, list: &str, id: &str) -> Result<Item> {
        let mut state = self.state.lock().unwrap();
        state
            .tables
            .get_mut(list)
            .and_then(|t| t.shift_remove(id))
            .ok_or_else(|| StrataError::Persistence(format!("{}: row '{}' vanished", list, id)))
    }

    async fn begin(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.snapshot.is_some() {
            return Err(StrataError::Persistence(
                "transaction already in progress".to_string(),
            ));
        }
        state.snapshot = Some(state.tables.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.snapshot.take().is_none() {
            return Err(StrataError::Persistence("no transaction to commit".to_string()));
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let snapshot = state
            .snapshot
            .take()
            .ok_or_else(|| StrataError::Persistence("no transaction to roll back".to_string()))?;
        state.tables = snapshot;
        Ok(())
    }
}
