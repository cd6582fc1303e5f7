//! Test doubles shared by unit tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::db::{DataStore, Filter, Query, Record, Table};
use crate::errors::AppError;
use crate::models::{MetricPoint, Product, TaxonomyItem, UserRecord};

/// In-memory [`DataStore`] with switchable failures.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Record>>>,
    metrics: Mutex<HashMap<String, Vec<MetricPoint>>>,
    failing: Mutex<HashSet<String>>,
    deletes: Mutex<Vec<Query>>,
    rpc_calls: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed<T: Serialize>(&self, table: Table, rows: &[T]) {
        let mut tables = self.tables.lock();
        let entry = tables.entry(table).or_default();
        for row in rows {
            match serde_json::to_value(row) {
                Ok(Value::Object(record)) => entry.push(record),
                other => panic!("seed row is not an object: {:?}", other),
            }
        }
    }

    pub fn set_metrics(&self, procedure: &str, series: Vec<MetricPoint>) {
        self.metrics.lock().insert(procedure.to_string(), series);
    }

    /// Make every later call of `op` fail. `op` is a method name, or an rpc
    /// procedure name.
    pub fn fail(&self, op: &str) {
        self.failing.lock().insert(op.to_string());
    }

    pub fn recover(&self, op: &str) {
        self.failing.lock().remove(op);
    }

    pub fn rows(&self, table: Table) -> Vec<Record> {
        self.tables.lock().get(&table).cloned().unwrap_or_default()
    }

    /// Ids targeted by delete calls, in call order.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deletes
            .lock()
            .iter()
            .flat_map(|query| query.filters.iter())
            .filter_map(|filter| match filter {
                Filter::Eq { column, value } if column == "id" => {
                    value.as_str().map(str::to_string)
                }
                _ => None,
            })
            .collect()
    }

    pub fn rpc_calls(&self) -> usize {
        self.rpc_calls.lock().len()
    }

    fn check(&self, op: &str) -> Result<(), AppError> {
        if self.failing.lock().contains(op) {
            return Err(AppError::Store(format!("{} unavailable", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn fetch(&self, table: Table, query: &Query) -> Result<Vec<Record>, AppError> {
        self.check("fetch")?;
        let mut rows: Vec<Record> = self
            .rows(table)
            .into_iter()
            .filter(|record| query.matches(record))
            .collect();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let key = |r: &Record| r.get(&order.column).map(|v| v.to_string());
                let ord = key(a).cmp(&key(b));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        Ok(rows)
    }

    async fn update(&self, table: Table, query: &Query, patch: &Record) -> Result<u64, AppError> {
        self.check("update")?;
        let mut tables = self.tables.lock();
        let mut affected = 0;
        for record in tables.entry(table).or_default().iter_mut() {
            if query.matches(record) {
                for (column, value) in patch {
                    record.insert(column.clone(), value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<u64, AppError> {
        self.deletes.lock().push(query.clone());
        self.check("delete")?;
        let mut tables = self.tables.lock();
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|record| !query.matches(record));
        Ok((before - rows.len()) as u64)
    }

    async fn upsert(&self, table: Table, row: &Record, conflict_key: &str) -> Result<(), AppError> {
        self.check("upsert")?;
        let mut tables = self.tables.lock();
        let rows = tables.entry(table).or_default();
        let key = row.get(conflict_key).cloned().unwrap_or(Value::Null);
        match rows.iter_mut().find(|r| r.get(conflict_key) == Some(&key)) {
            Some(existing) => existing.extend(row.clone()),
            None => rows.push(row.clone()),
        }
        Ok(())
    }

    async fn rpc(&self, procedure: &str) -> Result<Vec<MetricPoint>, AppError> {
        self.rpc_calls.lock().push(procedure.to_string());
        self.check("rpc")?;
        self.check(procedure)?;
        Ok(self
            .metrics
            .lock()
            .get(procedure)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn product(id: &str, approved: bool) -> Product {
    Product {
        id: id.to_string(),
        created_at: "2024-01-01T00:00:00Z".to_string(),
        full_name: format!("Product {}", id),
        email: format!("{}@example.com", id),
        twitter_handle: String::new(),
        product_website: format!("https://{}.example.com", id),
        codename: id.to_string(),
        punchline: String::new(),
        description: String::new(),
        logo_src: String::new(),
        user_id: "u1".to_string(),
        categories: None,
        tags: None,
        labels: None,
        approved,
        archived: None,
    }
}

pub fn taxonomy_item(id: &str, name: &str) -> TaxonomyItem {
    TaxonomyItem {
        id: id.to_string(),
        name: name.to_string(),
        icon: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

pub fn user(id: &str, full_name: &str) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        full_name: full_name.to_string(),
        avatar_url: None,
        billing_address: None,
        payment_method: None,
        created_at: Some("2024-01-01T00:00:00Z".to_string()),
    }
}
