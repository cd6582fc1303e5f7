//! Generic data store interface and its SQLite backend.
//!
//! The dashboard only ever talks to [`DataStore`]: rows keyed by table name,
//! filtered by [`Query`] predicates, plus named aggregation procedures.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::{Column, ColumnKind, Filter, Query, Record, Table};
use crate::errors::AppError;
use crate::models::MetricPoint;

/// Query/update/delete/upsert/RPC operations against the relational store.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetch rows matching `query`.
    async fn fetch(&self, table: Table, query: &Query) -> Result<Vec<Record>, AppError>;

    /// Apply a partial field set to the rows matching `query`; returns rows affected.
    async fn update(&self, table: Table, query: &Query, patch: &Record) -> Result<u64, AppError>;

    /// Delete the rows matching `query`; returns rows affected.
    async fn delete(&self, table: Table, query: &Query) -> Result<u64, AppError>;

    /// Insert `row`, or overwrite the supplied columns when `conflict_key` collides.
    async fn upsert(&self, table: Table, row: &Record, conflict_key: &str) -> Result<(), AppError>;

    /// Run a named aggregation procedure returning a monthly series.
    async fn rpc(&self, procedure: &str) -> Result<Vec<MetricPoint>, AppError>;
}

/// Fetch rows and decode them into typed entities.
pub async fn fetch_typed<T: DeserializeOwned>(
    store: &dyn DataStore,
    table: Table,
    query: &Query,
) -> Result<Vec<T>, AppError> {
    store
        .fetch(table, query)
        .await?
        .into_iter()
        .map(|record| serde_json::from_value(Value::Object(record)).map_err(AppError::from))
        .collect()
}

/// Table whose rows a metric procedure counts.
fn metric_table(procedure: &str) -> Option<Table> {
    match procedure {
        "get_user_metrics" => Some(Table::Users),
        "get_product_metrics" => Some(Table::Products),
        "get_category_metrics" => Some(Table::Categories),
        "get_label_metrics" => Some(Table::Labels),
        "get_tag_metrics" => Some(Table::Tags),
        _ => None,
    }
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn fetch(&self, table: Table, query: &Query) -> Result<Vec<Record>, AppError> {
        let columns: Vec<&str> = table.columns().iter().map(|c| c.name).collect();
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            table.name()
        ));
        push_where(&mut builder, table, query)?;

        if let Some(order) = &query.order {
            let column = table.column(&order.column)?;
            builder
                .push(" ORDER BY ")
                .push(column.name)
                .push(if order.ascending { " ASC" } else { " DESC" });
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(|row| decode_row(table, row)).collect()
    }

    async fn update(&self, table: Table, query: &Query, patch: &Record) -> Result<u64, AppError> {
        require_filters(table, query, "update")?;
        if patch.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", table.name()));
        for (i, (name, value)) in patch.iter().enumerate() {
            let column = table.column(name)?;
            if i > 0 {
                builder.push(", ");
            }
            builder.push(column.name).push(" = ");
            push_value(&mut builder, column, value)?;
        }
        push_where(&mut builder, table, query)?;

        let result = builder.build().execute(&self.pool).await?;
        tracing::debug!(
            "Updated {} row(s) in {}",
            result.rows_affected(),
            table.name()
        );
        Ok(result.rows_affected())
    }

    async fn delete(&self, table: Table, query: &Query) -> Result<u64, AppError> {
        require_filters(table, query, "delete")?;

        let mut builder = QueryBuilder::<Sqlite>::new(format!("DELETE FROM {}", table.name()));
        push_where(&mut builder, table, query)?;

        let result = builder.build().execute(&self.pool).await?;
        tracing::debug!(
            "Deleted {} row(s) from {}",
            result.rows_affected(),
            table.name()
        );
        Ok(result.rows_affected())
    }

    async fn upsert(&self, table: Table, row: &Record, conflict_key: &str) -> Result<(), AppError> {
        let conflict = table.column(conflict_key)?;
        if !row.contains_key(conflict.name) {
            return Err(AppError::BadRequest(format!(
                "Upsert into {} is missing conflict key {}",
                table.name(),
                conflict.name
            )));
        }

        // Generated columns are only written on insert.
        let mut row = row.clone();
        let mut generated = Vec::new();
        if table.has_column("id") && !row.contains_key("id") {
            row.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
            generated.push("id");
        }
        if table.has_column("created_at") && !row.contains_key("created_at") {
            row.insert("created_at".into(), Value::String(Utc::now().to_rfc3339()));
            generated.push("created_at");
        }

        let columns = row
            .keys()
            .map(|name| table.column(name))
            .collect::<Result<Vec<Column>, AppError>>()?;

        let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            table.name(),
            names.join(", ")
        ));
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, *column, &row[column.name])?;
        }
        builder.push(") ON CONFLICT(").push(conflict.name).push(") ");

        let overwrite: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| *name != conflict.name && !generated.contains(name))
            .collect();
        if overwrite.is_empty() {
            builder.push("DO NOTHING");
        } else {
            let assignments: Vec<String> = overwrite
                .iter()
                .map(|name| format!("{name} = excluded.{name}"))
                .collect();
            builder.push("DO UPDATE SET ").push(assignments.join(", "));
        }

        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn rpc(&self, procedure: &str) -> Result<Vec<MetricPoint>, AppError> {
        let table = metric_table(procedure)
            .ok_or_else(|| AppError::NotFound(format!("Procedure {} not found", procedure)))?;

        let sql = format!(
            "SELECT substr(created_at, 1, 7) AS month, COUNT(*) AS total FROM {} GROUP BY month ORDER BY month",
            table.name()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| MetricPoint {
                month: row.get("month"),
                total: row.get("total"),
            })
            .collect())
    }
}

/// Unfiltered writes would touch every row; never issue them.
fn require_filters(table: Table, query: &Query, op: &str) -> Result<(), AppError> {
    if query.filters.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Refusing unfiltered {} on {}",
            op,
            table.name()
        )));
    }
    Ok(())
}

fn push_where(
    builder: &mut QueryBuilder<'_, Sqlite>,
    table: Table,
    query: &Query,
) -> Result<(), AppError> {
    for (i, filter) in query.filters.iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            Filter::Eq { column, value } => {
                let column = table.column(column)?;
                if value.is_null() {
                    builder.push(column.name).push(" IS NULL");
                } else {
                    builder.push(column.name).push(" = ");
                    push_value(builder, column, value)?;
                }
            }
            Filter::In { column, values } => {
                let column = table.column(column)?;
                if values.is_empty() {
                    builder.push("0 = 1");
                    continue;
                }
                builder.push(column.name).push(" IN (");
                for (j, value) in values.iter().enumerate() {
                    if j > 0 {
                        builder.push(", ");
                    }
                    push_value(builder, column, value)?;
                }
                builder.push(")");
            }
        }
    }
    Ok(())
}

/// Bind a JSON value using the column's storage representation.
fn push_value(
    builder: &mut QueryBuilder<'_, Sqlite>,
    column: Column,
    value: &Value,
) -> Result<(), AppError> {
    let mismatch = || {
        AppError::Store(format!(
            "Column {} cannot store {}",
            column.name,
            value
        ))
    };

    match (column.kind, value) {
        (_, Value::Null) => {
            builder.push_bind(None::<String>);
        }
        (ColumnKind::Text, Value::String(s)) => {
            builder.push_bind(s.clone());
        }
        (ColumnKind::Integer, Value::Number(n)) => {
            builder.push_bind(n.as_i64().ok_or_else(mismatch)?);
        }
        (ColumnKind::Bool, Value::Bool(b)) => {
            builder.push_bind(i64::from(*b));
        }
        (ColumnKind::Json, v) => {
            builder.push_bind(v.to_string());
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}

fn decode_row(table: Table, row: &SqliteRow) -> Result<Record, AppError> {
    let mut record = Record::new();
    for column in table.columns() {
        let value = match column.kind {
            ColumnKind::Text => row
                .try_get::<Option<String>, _>(column.name)?
                .map(Value::String),
            ColumnKind::Integer => row
                .try_get::<Option<i64>, _>(column.name)?
                .map(Value::from),
            ColumnKind::Bool => row
                .try_get::<Option<i64>, _>(column.name)?
                .map(|v| Value::Bool(v != 0)),
            ColumnKind::Json => row
                .try_get::<Option<String>, _>(column.name)?
                .map(|s| serde_json::from_str(&s).unwrap_or(Value::String(s))),
        };
        record.insert(column.name.to_string(), value.unwrap_or(Value::Null));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::Product;
    use serde_json::json;
    use tempfile::TempDir;

    async fn store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .expect("Failed to init DB");
        (SqliteStore::new(pool), temp_dir)
    }

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    async fn seed_product(store: &SqliteStore, id: &str, created_at: &str, approved: bool) {
        store
            .upsert(
                Table::Products,
                &record(json!({
                    "id": id,
                    "created_at": created_at,
                    "full_name": format!("Product {}", id),
                    "categories": ["ai", "dev"],
                    "approved": approved,
                })),
                "id",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fetch_decodes_typed_rows_in_order() {
        let (store, _dir) = store().await;
        seed_product(&store, "p1", "2024-01-05T00:00:00Z", false).await;
        seed_product(&store, "p2", "2024-02-05T00:00:00Z", true).await;

        let products: Vec<Product> = fetch_typed(
            &store,
            Table::Products,
            &Query::new().order("created_at", false),
        )
        .await
        .unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].id, "p2");
        assert!(products[0].approved);
        assert_eq!(
            products[1].categories,
            Some(vec!["ai".to_string(), "dev".to_string()])
        );
        assert_eq!(products[1].archived, None);
    }

    #[tokio::test]
    async fn test_comma_joined_taxonomy_column_still_decodes() {
        let (store, _dir) = store().await;
        store
            .upsert(
                Table::Products,
                &record(json!({
                    "id": "p1",
                    "created_at": "2024-01-05T00:00:00Z",
                    "full_name": "Legacy",
                    "categories": "ai, dev",
                    "tags": "",
                    "approved": false,
                })),
                "id",
            )
            .await
            .unwrap();

        let products: Vec<Product> = fetch_typed(&store, Table::Products, &Query::by_id("p1"))
            .await
            .unwrap();

        assert_eq!(
            products[0].categories,
            Some(vec!["ai".to_string(), "dev".to_string()])
        );
        assert_eq!(products[0].tags, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_update_and_bulk_update() {
        let (store, _dir) = store().await;
        seed_product(&store, "p1", "2024-01-05T00:00:00Z", false).await;
        seed_product(&store, "p2", "2024-01-06T00:00:00Z", false).await;
        seed_product(&store, "p3", "2024-01-07T00:00:00Z", false).await;

        let patch = record(json!({ "approved": true }));
        let affected = store
            .update(Table::Products, &Query::by_id("p1"), &patch)
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let affected = store
            .update(
                Table::Products,
                &Query::new().is_in("id", ["p2", "p3", "missing"]),
                &patch,
            )
            .await
            .unwrap();
        assert_eq!(affected, 2);

        let pending = store
            .fetch(Table::Products, &Query::new().eq("approved", false))
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_unfiltered_writes_are_refused() {
        let (store, _dir) = store().await;
        let err = store
            .delete(Table::Products, &Query::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = store
            .update(Table::Users, &Query::new(), &record(json!({ "full_name": "x" })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_reports_rows_affected() {
        let (store, _dir) = store().await;
        seed_product(&store, "p1", "2024-01-05T00:00:00Z", false).await;

        assert_eq!(
            store.delete(Table::Products, &Query::by_id("p1")).await.unwrap(),
            1
        );
        assert_eq!(
            store.delete(Table::Products, &Query::by_id("p1")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_upsert_on_name_keeps_existing_id() {
        let (store, _dir) = store().await;
        store
            .upsert(Table::Tags, &record(json!({ "name": "rust" })), "name")
            .await
            .unwrap();
        store
            .upsert(Table::Tags, &record(json!({ "name": "rust" })), "name")
            .await
            .unwrap();

        let tags = store.fetch(Table::Tags, &Query::new()).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0]["name"], json!("rust"));
        assert!(tags[0]["id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn test_unknown_column_in_patch_is_rejected() {
        let (store, _dir) = store().await;
        let err = store
            .update(
                Table::Products,
                &Query::by_id("p1"),
                &record(json!({ "approved; DROP TABLE products": true })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }

    #[tokio::test]
    async fn test_metric_rpc_counts_per_month() {
        let (store, _dir) = store().await;
        seed_product(&store, "p1", "2024-01-05T00:00:00Z", false).await;
        seed_product(&store, "p2", "2024-01-25T00:00:00Z", false).await;
        seed_product(&store, "p3", "2024-03-01T00:00:00Z", true).await;

        let series = store.rpc("get_product_metrics").await.unwrap();
        assert_eq!(
            series,
            vec![
                MetricPoint {
                    month: "2024-01".to_string(),
                    total: 2
                },
                MetricPoint {
                    month: "2024-03".to_string(),
                    total: 1
                },
            ]
        );

        assert!(store.rpc("get_tag_metrics").await.unwrap().is_empty());
        assert!(matches!(
            store.rpc("drop_everything").await,
            Err(AppError::NotFound(_))
        ));
    }
}
