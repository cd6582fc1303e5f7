//! Product model matching the `products` table.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::AppError;
use crate::optimistic::Entity;

/// A product submitted to the directory and awaiting (or past) moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub created_at: String,
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub twitter_handle: String,
    #[serde(default)]
    pub product_website: String,
    #[serde(default)]
    pub codename: String,
    #[serde(default)]
    pub punchline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo_src: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, deserialize_with = "name_list")]
    pub categories: Option<Vec<String>>,
    #[serde(default, deserialize_with = "name_list")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "name_list")]
    pub labels: Option<Vec<String>>,
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl Product {
    /// Whether the product was created within one calendar month before `now`.
    ///
    /// Rows whose timestamp does not parse are never considered new.
    pub fn is_new(&self, now: DateTime<Utc>) -> bool {
        let Ok(created) = DateTime::parse_from_rfc3339(&self.created_at) else {
            return false;
        };
        let cutoff = now.checked_sub_months(Months::new(1)).unwrap_or(now);
        created.with_timezone(&Utc) >= cutoff
    }
}

impl Entity for Product {
    fn id(&self) -> &str {
        &self.id
    }

    fn approve(&mut self) {
        self.approved = true;
    }
}

/// Taxonomy names stored either as a list or as one comma-joined string.
/// Entries are trimmed and blanks dropped.
fn name_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Names {
        List(Vec<String>),
        Joined(String),
    }

    let names = match Option::<Names>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Names::List(list)) => list,
        Some(Names::Joined(joined)) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(Some(
        names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
    ))
}

/// Tabs of the product moderation page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductTab {
    #[default]
    All,
    Approved,
    Pending,
    New,
}

impl ProductTab {
    pub fn includes(&self, product: &Product, now: DateTime<Utc>) -> bool {
        match self {
            ProductTab::All => true,
            ProductTab::Approved => product.approved,
            ProductTab::Pending => !product.approved,
            ProductTab::New => product.is_new(now),
        }
    }
}

impl std::str::FromStr for ProductTab {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ProductTab::All),
            "approved" => Ok(ProductTab::Approved),
            "pending" => Ok(ProductTab::Pending),
            "new" => Ok(ProductTab::New),
            other => Err(AppError::BadRequest(format!("Unknown product tab: {}", other))),
        }
    }
}

/// Request body for approving or revoking a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalRequest {
    pub approved: bool,
}
