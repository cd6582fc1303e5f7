//! Table schemas and query predicates for the generic store interface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppError;

/// A row as exchanged with the store: column name to JSON value.
pub type Record = Map<String, Value>;

/// How a column is stored and decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    /// Stored as 0/1
    Bool,
    /// Stored as JSON text
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

const PRODUCT_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Text),
    col("created_at", ColumnKind::Text),
    col("full_name", ColumnKind::Text),
    col("email", ColumnKind::Text),
    col("twitter_handle", ColumnKind::Text),
    col("product_website", ColumnKind::Text),
    col("codename", ColumnKind::Text),
    col("punchline", ColumnKind::Text),
    col("description", ColumnKind::Text),
    col("logo_src", ColumnKind::Text),
    col("user_id", ColumnKind::Text),
    col("categories", ColumnKind::Json),
    col("tags", ColumnKind::Json),
    col("labels", ColumnKind::Json),
    col("approved", ColumnKind::Bool),
    col("archived", ColumnKind::Bool),
];

const CATEGORY_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Text),
    col("name", ColumnKind::Text),
    col("icon", ColumnKind::Text),
    col("created_at", ColumnKind::Text),
];

const LABEL_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Text),
    col("name", ColumnKind::Text),
    col("created_at", ColumnKind::Text),
];

const USER_COLUMNS: &[Column] = &[
    col("id", ColumnKind::Text),
    col("full_name", ColumnKind::Text),
    col("avatar_url", ColumnKind::Text),
    col("billing_address", ColumnKind::Json),
    col("payment_method", ColumnKind::Json),
    col("created_at", ColumnKind::Text),
];

const SESSION_COLUMNS: &[Column] = &[
    col("token", ColumnKind::Text),
    col("user_id", ColumnKind::Text),
    col("claims_admin", ColumnKind::Bool),
    col("expires_at", ColumnKind::Text),
];

/// Tables reachable through the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Products,
    Categories,
    Labels,
    Tags,
    Users,
    Sessions,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Products => "products",
            Table::Categories => "categories",
            Table::Labels => "labels",
            Table::Tags => "tags",
            Table::Users => "users",
            Table::Sessions => "sessions",
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        match self {
            Table::Products => PRODUCT_COLUMNS,
            Table::Categories => CATEGORY_COLUMNS,
            // labels and tags share a layout
            Table::Labels | Table::Tags => LABEL_COLUMNS,
            Table::Users => USER_COLUMNS,
            Table::Sessions => SESSION_COLUMNS,
        }
    }

    /// Look up a column, rejecting names outside the schema.
    pub fn column(&self, name: &str) -> Result<Column, AppError> {
        self.columns()
            .iter()
            .find(|c| c.name == name)
            .copied()
            .ok_or_else(|| {
                AppError::Store(format!("Unknown column {} on {}", name, self.name()))
            })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns().iter().any(|c| c.name == name)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
}

impl Filter {
    /// Evaluate the predicate against a decoded record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::Eq { column, value } => record.get(column) == Some(value),
            Filter::In { column, values } => record
                .get(column)
                .map(|v| values.contains(v))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Conjunction of filters plus an optional ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the row with the given identifier.
    pub fn by_id(id: &str) -> Self {
        Self::new().eq("id", id)
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn is_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }
}
