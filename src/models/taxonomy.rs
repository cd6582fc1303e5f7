//! Taxonomy items: categories, labels and tags.

use serde::{Deserialize, Serialize};

use crate::db::Table;
use crate::errors::{AppError, ValidationError};
use crate::optimistic::Entity;

/// A category, label or tag shown in the directory's filter sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub created_at: String,
}

impl Entity for TaxonomyItem {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Which taxonomy table an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Category,
    Label,
    Tag,
}

impl TaxonomyKind {
    pub fn table(&self) -> Table {
        match self {
            TaxonomyKind::Category => Table::Categories,
            TaxonomyKind::Label => Table::Labels,
            TaxonomyKind::Tag => Table::Tags,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::Category => "category",
            TaxonomyKind::Label => "label",
            TaxonomyKind::Tag => "tag",
        }
    }

    /// Only categories carry an icon.
    pub fn has_icon(&self) -> bool {
        matches!(self, TaxonomyKind::Category)
    }
}

impl std::str::FromStr for TaxonomyKind {
    type Err = AppError;

    /// Accepts the singular kind or its table name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" | "categories" => Ok(TaxonomyKind::Category),
            "label" | "labels" => Ok(TaxonomyKind::Label),
            "tag" | "tags" => Ok(TaxonomyKind::Tag),
            other => Err(AppError::BadRequest(format!("Unknown filter kind: {}", other))),
        }
    }
}

/// Request body for renaming a taxonomy item.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxonomyEditRequest {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl TaxonomyEditRequest {
    /// Apply the edit to `item`, returning the edited copy.
    pub fn apply_to(
        &self,
        kind: TaxonomyKind,
        item: &TaxonomyItem,
    ) -> Result<TaxonomyItem, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("name", "Name is required"));
        }

        let mut edited = item.clone();
        edited.name = name.to_string();
        if kind.has_icon() {
            edited.icon = self.icon.clone().filter(|icon| !icon.trim().is_empty());
        }
        Ok(edited)
    }
}
