//! Aggregate metric series shown on the overview page.

use serde::{Deserialize, Serialize};

/// Number of rows created in a given month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub month: String,
    pub total: i64,
}

/// All overview series. A series whose procedure failed is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    pub users: Vec<MetricPoint>,
    pub products: Vec<MetricPoint>,
    pub categories: Vec<MetricPoint>,
    pub labels: Vec<MetricPoint>,
    pub tags: Vec<MetricPoint>,
}
